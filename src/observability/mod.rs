//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handlers and the relay loop produce:
//!     → logging.rs (structured log events, request id on every span)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
