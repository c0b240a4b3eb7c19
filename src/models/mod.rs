pub mod event;
pub mod intent;
pub mod interval;
pub mod plan;
