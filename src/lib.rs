#![allow(non_snake_case)]

pub mod cli;
pub mod config;
pub mod events;
pub mod handlers;
pub mod models;
pub mod service;
