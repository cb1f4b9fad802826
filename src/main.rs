use tracing::{error, info};

use riptide::{config, server};

#[tokio::main]
async fn main() {
    // Setup logging
    tracing_subscriber::fmt::init();

    info!("Starting Riptide feed aggregator");

    let config = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Running in {} mode with {} channel(s)",
        if config.is_dev { "DEV" } else { "PROD" },
        config.channels.len()
    );

    if let Err(e) = server::start(config).await {
        error!("Failed to start server: {}", e);
        std::process::exit(1);
    }
}
