//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create one Axum Router per service (Bundle Proxy, Resource Relay)
//! - Wire up middleware (request ID, tracing, body limit, proxy timeout)
//! - Serve each router on its own listener
//! - Apply configuration reloads to the shared settings snapshot
//! - Stop accepting and drain on shutdown

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use arc_swap::ArcSwap;

use crate::config::{HsbConfig, LimitsConfig};
use crate::fhir::{FhirBackend, HttpFhirClient};
use crate::http::handlers;
use crate::http::request::{make_span, propagate_request_id_layer, set_request_id_layer};
use crate::http::state::{AppState, RuntimeSettings};

/// Path of the Bundle Proxy endpoint.
pub const PROXY_PATH: &str = "/hsb/message";
/// Path of the Resource Relay endpoint.
pub const RELAY_PATH: &str = "/hsb";

/// Bound listeners, one per enabled service.
#[derive(Debug, Default)]
pub struct ServiceListeners {
    pub proxy: Option<TcpListener>,
    pub relay: Option<TcpListener>,
}

impl ServiceListeners {
    /// Bind the listeners of every enabled service.
    pub async fn bind(config: &HsbConfig) -> Result<Self, std::io::Error> {
        let proxy = if config.proxy.enabled {
            Some(TcpListener::bind(&config.proxy.bind_address).await?)
        } else {
            None
        };
        let relay = if config.relay.enabled {
            Some(TcpListener::bind(&config.relay.bind_address).await?)
        } else {
            None
        };
        Ok(Self { proxy, relay })
    }

    pub fn proxy_addr(&self) -> Option<SocketAddr> {
        self.proxy.as_ref().and_then(|l| l.local_addr().ok())
    }

    pub fn relay_addr(&self) -> Option<SocketAddr> {
        self.relay.as_ref().and_then(|l| l.local_addr().ok())
    }
}

/// HTTP server hosting both bus services.
pub struct HttpServer<B = HttpFhirClient> {
    config: HsbConfig,
    state: AppState<B>,
}

impl HttpServer<HttpFhirClient> {
    /// Create a server talking to the configured backend over HTTP.
    pub fn new(config: HsbConfig) -> Self {
        let client = HttpFhirClient::new(&config.backend, config.limits.max_body_size);
        Self::with_backend(config, client)
    }
}

impl<B: FhirBackend> HttpServer<B> {
    /// Create a server over any backend implementation.
    pub fn with_backend(config: HsbConfig, backend: B) -> Self {
        let state = AppState::new(Arc::new(backend), RuntimeSettings::from(&config));
        Self { config, state }
    }

    /// Router for `POST /hsb/message`.
    pub fn proxy_router(&self) -> Router {
        let router = Router::new()
            .route(PROXY_PATH, post(handlers::bundle_proxy::<B>))
            .route("/health", get(|| handlers::health("proxy")))
            .with_state(self.state.clone());
        let timeout = Duration::from_secs(self.config.limits.request_timeout_secs);
        Self::with_layers(router, &self.config.limits, Some(timeout))
    }

    /// Router for `POST /hsb`.
    ///
    /// Not bounded by the inbound timeout: a relay answers only once every
    /// entry has been through its retry budget.
    pub fn relay_router(&self) -> Router {
        let router = Router::new()
            .route(RELAY_PATH, post(handlers::resource_relay::<B>))
            .route("/health", get(|| handlers::health("relay")))
            .with_state(self.state.clone());
        Self::with_layers(router, &self.config.limits, None)
    }

    /// Wrap a router with the shared middleware stack.
    #[allow(deprecated)]
    fn with_layers(router: Router, limits: &LimitsConfig, timeout: Option<Duration>) -> Router {
        let router = router
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(limits.max_body_size));
        let router = match timeout {
            Some(limit) => router.layer(TimeoutLayer::new(limit)),
            None => router,
        };
        router
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(set_request_id_layer())
    }

    /// Settings snapshot shared with the handlers.
    pub fn settings(&self) -> Arc<ArcSwap<RuntimeSettings>> {
        self.state.settings.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &HsbConfig {
        &self.config
    }

    /// Serve until `shutdown` fires, applying configuration updates as they arrive.
    pub async fn run(
        self,
        listeners: ServiceListeners,
        config_updates: mpsc::UnboundedReceiver<HsbConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let proxy = serve("proxy", listeners.proxy, self.proxy_router(), shutdown.resubscribe());
        let relay = serve("relay", listeners.relay, self.relay_router(), shutdown.resubscribe());
        let reload = apply_config_updates(self.settings(), self.config.clone(), config_updates, shutdown);

        tokio::try_join!(proxy, relay, async {
            reload.await;
            Ok::<(), std::io::Error>(())
        })?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn serve(
    service: &'static str,
    listener: Option<TcpListener>,
    router: Router,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let Some(listener) = listener else {
        tracing::info!(service, "Service disabled");
        return Ok(());
    };

    tracing::info!(service, address = %listener.local_addr()?, "Service listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;

    tracing::info!(service, "Service stopped");
    Ok(())
}

async fn apply_config_updates(
    settings: Arc<ArcSwap<RuntimeSettings>>,
    mut current: HsbConfig,
    mut updates: mpsc::UnboundedReceiver<HsbConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(next) => {
                    apply_reload(&settings, &current, &next);
                    current = next;
                }
                None => {
                    let _ = shutdown.recv().await;
                    return;
                }
            },
            _ = shutdown.recv() => return,
        }
    }
}

/// Swap in the reloadable part of `next`. Anything fixed at startup is reported, not applied.
pub fn apply_reload(settings: &ArcSwap<RuntimeSettings>, current: &HsbConfig, next: &HsbConfig) {
    if current.proxy != next.proxy
        || current.relay.enabled != next.relay.enabled
        || current.relay.bind_address != next.relay.bind_address
    {
        tracing::warn!("Listener changes require a restart and were not applied");
    }
    if current.limits != next.limits || current.observability != next.observability {
        tracing::warn!("Limit and observability changes require a restart and were not applied");
    }
    if current.backend.connect_timeout_ms != next.backend.connect_timeout_ms {
        tracing::warn!("backend.connect_timeout_ms changes require a restart and were not applied");
    }

    settings.store(Arc::new(RuntimeSettings::from(next)));
    tracing::info!(
        backend = %next.backend.base_url,
        max_attempts = next.retries.max_attempts,
        "Configuration reloaded"
    );
}
