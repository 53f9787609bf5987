#![cfg(not(tarpaulin_include))]

use clap::Parser;
use container_dashboard::app;
use container_dashboard::config::{Config, ConfigArgs};

/// Serve the container shipment dashboard.
#[derive(Parser)]
#[command(name = "dashboard", version, about)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from(Cli::parse().config);
    log::info!(
        "Serving {} with {} allowed id(s)",
        config.data_path.display(),
        config.allowed_ids.len()
    );
    app::run(config).await
}
