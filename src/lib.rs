//! HSB: a Health Service Bus relaying FHIR bundles to a clinical data repository.
//!
//! Two services share this crate:
//! - the Bundle Proxy forwards a whole bundle in one call (`POST /hsb/message`)
//! - the Resource Relay upserts each contained resource with retry (`POST /hsb`)

pub mod config;
pub mod error;
pub mod fhir;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod services;

pub use config::HsbConfig;
pub use error::HsbError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
