#![cfg(not(tarpaulin_include))]

use clap::Parser;
use dashboard::{app, config::Config, loader};
use env_logger::Env;

/// Main entry point for the dashboard web application
///
/// Loads the dataset once, then serves the grid and the export endpoint.
/// A dataset that cannot be loaded stops the process before anything is served.
///
/// # Configuration
/// * Command line flags or `DASHBOARD_*` environment variables, see `--help`
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(config.default_log_filter()))
        .init();

    let dataset = match loader::load_dataset(&config.source).await {
        Ok(dataset) => dataset,
        Err(e) => {
            log::error!("cannot start without a dataset: {}", e);
            return Err(e.into());
        }
    };

    app::run(&config, dataset).await
}
