//! fileshell daemon
//!
//! Listens for fileshell clients and serves each in its own session.

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use daemon::config::Config;
use daemon::{ServerSettings, Supervisor};

/// fileshell daemon - remote listing, checksums and file transfer.
#[derive(Parser, Debug)]
#[command(name = "fileshell-daemon")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TCP port to listen on
    pub port: u16,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(config_path) => Config::load(config_path)?,
        None => Config::load_default()?,
    };

    // Apply environment variable overrides
    config.apply_env_overrides();

    // Validate configuration
    config.validate()?;

    // Initialize tracing; the guard must outlive the runtime to flush file logs
    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.daemon.log_level.to_lowercase()
    };
    let _log_guard = match &config.daemon.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "fileshell-daemon.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    };

    tracing::info!("fileshell daemon starting...");
    if let Some(config_path) = &cli.config {
        tracing::info!("Using config file: {:?}", config_path);
    }

    let address: IpAddr = config
        .network
        .bind_address
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.network.bind_address))?;
    let start_dir = std::env::current_dir().context("Failed to read working directory")?;

    let settings = ServerSettings::new(&config, start_dir);
    let supervisor = Supervisor::bind(address, cli.port, settings).await?;
    supervisor.run().await?;

    Ok(())
}
