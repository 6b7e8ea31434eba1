//! HSB (Health Service Bus)
//!
//! Receives FHIR bundles over HTTP and relays them to a FHIR repository.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                     HSB                      │
//!   POST /hsb/message     │  ┌──────────────┐                            │
//!  ───────────────────────┼─▶│ Bundle Proxy │── POST {base} or ──────────┼──▶
//!                         │  └──────────────┘   {base}/Bundle            │
//!                         │                                              │     FHIR
//!   POST /hsb             │  ┌──────────────┐   PUT {base}/{type}/{id}   │   repository
//!  ───────────────────────┼─▶│Resource Relay│── per entry, retried ──────┼──▶
//!                         │  └──────────────┘                            │
//!                         │                                              │
//!                         │  config · resilience · observability ·       │
//!                         │  lifecycle                                   │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use hsb::config::loader::{default_config, load_config};
use hsb::lifecycle::startup;
use hsb::observability::logging;

#[derive(Parser)]
#[command(name = "hsb")]
#[command(about = "Health Service Bus: relays FHIR bundles to a FHIR repository", long_about = None)]
struct Cli {
    /// TOML configuration file. Watched for changes while running.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => default_config()?,
    };

    logging::init(&config.observability);

    tracing::info!("hsb v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        backend = %config.backend.base_url,
        proxy_enabled = config.proxy.enabled,
        relay_enabled = config.relay.enabled,
        max_attempts = config.retries.max_attempts,
        backoff = ?config.retries.backoff,
        retry_policy = ?config.retries.policy,
        "Configuration loaded"
    );

    startup::run(config, cli.config.as_deref()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
