//! Handler state.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::{BackendConfig, HsbConfig, RelayConfig, RetryConfig};

/// The part of the configuration handlers read per request. Swapped whole on reload.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeSettings {
    pub backend: BackendConfig,
    pub retries: RetryConfig,
    pub relay: RelayConfig,
}

impl From<&HsbConfig> for RuntimeSettings {
    fn from(config: &HsbConfig) -> Self {
        Self {
            backend: config.backend.clone(),
            retries: config.retries.clone(),
            relay: config.relay.clone(),
        }
    }
}

/// Application state injected into handlers.
pub struct AppState<B> {
    pub backend: Arc<B>,
    pub settings: Arc<ArcSwap<RuntimeSettings>>,
}

impl<B> AppState<B> {
    pub fn new(backend: Arc<B>, settings: RuntimeSettings) -> Self {
        Self {
            backend,
            settings: Arc::new(ArcSwap::from_pointee(settings)),
        }
    }
}

impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            settings: self.settings.clone(),
        }
    }
}
