//! Startup orchestration.
//!
//! # Responsibilities
//! - Start background tasks (metrics exporter, config watcher)
//! - Bind listeners and begin accepting traffic
//! - Connect OS signals to the shutdown coordinator
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::path::Path;

use tokio::sync::mpsc;

use crate::config::watcher::ConfigWatcher;
use crate::config::HsbConfig;
use crate::http::{HttpServer, ServiceListeners};
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

/// Fatal startup or serving failure.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),
    #[error("failed to watch config file: {0}")]
    Watch(#[from] notify::Error),
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Run the bus until a termination signal arrives.
///
/// When `config_path` is given, edits to that file are applied while running.
pub async fn run(config: HsbConfig, config_path: Option<&Path>) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Kept alive for the lifetime of the server.
    let (_watcher, config_updates) = match config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.starting_from(config.clone()).run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listeners = ServiceListeners::bind(&config).await.map_err(StartupError::Bind)?;
    if let Some(addr) = listeners.proxy_addr() {
        tracing::info!(address = %addr, "Bundle Proxy bound");
    }
    if let Some(addr) = listeners.relay_addr() {
        tracing::info!(address = %addr, "Resource Relay bound");
    }

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::shutdown_signal().await;
        shutdown.trigger();
    });

    HttpServer::new(config)
        .run(listeners, config_updates, server_shutdown)
        .await
        .map_err(StartupError::Serve)
}
