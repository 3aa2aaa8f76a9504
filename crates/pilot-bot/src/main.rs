//! Perp-pilot trading agent - entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Autonomous perpetual-futures trading agent
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via PILOT_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    pilot_telemetry::init_logging()?;

    info!("Starting perp-pilot v{}", env!("CARGO_PKG_VERSION"));

    // Config path: CLI arg > PILOT_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("PILOT_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = pilot_bot::BotConfig::from_file_or_default(&config_path)?;
    info!(symbol = %config.symbol, exchange = %config.exchange.base_url, "Configuration loaded");

    let app = pilot_bot::Application::new(config)?;
    app.run().await?;

    Ok(())
}
