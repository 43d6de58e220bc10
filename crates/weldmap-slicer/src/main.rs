//! Weldmap Slicer - Main entry point
//!
//! Serves `POST /slice`, which cuts a reference model with locator planes
//! and renders each section to a PNG under `/slices`.

mod api;
mod config;
mod render;
mod server;
mod state;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "weldmap-slicer")]
#[command(about = "Cross-section service for the Weldmap editor")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "weldmap-slicer.toml")]
    config: PathBuf,

    /// Bind address for web server
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(&args.log_level))
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Weldmap slicer v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config::load_config(&args.config)?;

    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    info!(
        data_dir = %config.slicing.data_dir,
        output_dir = %config.slicing.output_dir,
        radius = config.slicing.radius,
        "Configuration loaded"
    );

    let bind = config.server.bind.clone();
    let tls = config.server.tls.clone();
    let state = state::AppState::new(config);
    server::run(state, &bind, tls.as_ref()).await
}
