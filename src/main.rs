use airwatch::config::AirWatchConfig;
use airwatch::{logging, web};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// AirWatch - nearest-station air quality API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE", env = "AIRWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on, overriding the configuration
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        AirWatchConfig::load_from_path(args.config).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    logging::init(&config.logging)?;
    info!("AirWatch v{}", airwatch::VERSION);

    web::run(config).await
}
