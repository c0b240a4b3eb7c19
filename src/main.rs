#![allow(non_snake_case)]

use std::env;

use schedulerBot::cli;
use schedulerBot::config::{AppConfig, SchedulerConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match env::var("CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(&path).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    };

    let get_prop = |key: &str| -> Option<String> {
        config.get(key).or_else(|| env::var(key).ok())
    };

    // A bad timezone or malformed setting is the one fatal condition;
    // everything past startup is returned as a value.
    let scheduler_config =
        SchedulerConfig::resolve(get_prop).expect("Invalid scheduler configuration");

    cli::cli(scheduler_config).await;
}
