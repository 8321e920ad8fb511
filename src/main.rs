//! Crop Yield Simulator - HTTP service
//!
//! # Usage
//!
//! ```bash
//! # Banded scoring with rules from ./buckets/farm-data/crop_rules.json
//! BUCKET_NAME=farm-data cargo run --release
//!
//! # Stored climate snapshot + remote model
//! BUCKET_NAME=farm-data PREDICTION_URL=http://ml:8000 cargo run --release -- --mode remote
//! ```
//!
//! # Environment Variables
//!
//! - `BUCKET_NAME`: bucket holding the rules and climate objects (required)
//! - `RULES_BLOB_NAME`: rules object (default: `crop_rules.json`)
//! - `SCORING_MODE`: `banded`, `climate` or `remote` (default: `banded`)
//! - `PREDICTION_URL`: prediction service root (required in remote mode)
//! - `YIELD_SIM_CONFIG`: path to a TOML config file
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use crop_yield_sim::api::create_app;
use crop_yield_sim::bootstrap;
use crop_yield_sim::config::{ScoringMode, ServiceConfig};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "crop-yield-sim")]
#[command(about = "Crop yield simulation service")]
#[command(version)]
struct CliArgs {
    /// Override the server address (default: "0.0.0.0:8080")
    #[arg(short, long)]
    addr: Option<String>,

    /// Path to a TOML config file (overrides YIELD_SIM_CONFIG)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Scoring mode: banded, climate or remote
    #[arg(long)]
    mode: Option<ScoringMode>,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();

    let args = CliArgs::parse();
    init_tracing(args.log_json);

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment from .env");
    }

    let mut config = ServiceConfig::load(args.config.as_deref()).context("Failed to load config")?;
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }
    if let Some(mode) = args.mode {
        config.scoring.mode = mode;
    }
    config.validate().context("Invalid configuration")?;

    info!(
        mode = %config.scoring.mode,
        bucket = %config.storage.bucket,
        rules = %config.storage.rules_blob,
        "Starting crop yield simulator"
    );

    let blobs = bootstrap::build_blob_store(&config).context("Failed to build blob store")?;
    let recorder = bootstrap::build_recorder(&config).context("Failed to open experiment store")?;
    let simulator = bootstrap::build_simulator(&config, blobs.as_ref(), recorder)
        .await
        .context("Failed to load startup artifacts")?;

    let app = create_app(simulator);
    let listener = tokio::net::TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.addr))?;
    info!("✓ HTTP server listening on {}", config.server.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Graceful shutdown complete");
    Ok(())
}
