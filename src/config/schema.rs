//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the bus.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the Health Service Bus.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct HsbConfig {
    /// Bundle Proxy service (`POST /hsb/message`).
    pub proxy: ServiceConfig,

    /// Resource Relay service (`POST /hsb`).
    pub relay: RelayConfig,

    /// Backend FHIR repository.
    pub backend: BackendConfig,

    /// Retry configuration for the Resource Relay.
    pub retries: RetryConfig,

    /// Inbound request limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener settings for a single service.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Serve this service at all.
    pub enabled: bool,

    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:5000".to_string(),
        }
    }
}

/// Resource Relay settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    /// Serve the relay at all.
    pub enabled: bool,

    /// Bind address (e.g., "0.0.0.0:5001").
    pub bind_address: String,

    /// Answer 207 with per-resource outcomes when any resource was not relayed.
    /// Off by default: the caller always gets the fixed 200 acknowledgement.
    pub report_partial_failure: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:5001".to_string(),
            report_partial_failure: false,
        }
    }
}

/// Backend FHIR server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the FHIR server (e.g., "http://hapi-fhir:8080/fhir").
    pub base_url: String,

    /// Sub-path used for bundles that are not transaction/batch.
    pub bundle_path: String,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Total time allowed for one backend call, body included.
    pub request_timeout_ms: u64,
}

impl BackendConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/fhir".to_string(),
            bundle_path: "Bundle".to_string(),
            connect_timeout_ms: 5_000,
            request_timeout_ms: 30_000,
        }
    }
}

/// Delay strategy between upsert attempts.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Constant `base_delay_ms` between attempts.
    Fixed,
    /// `base_delay_ms * 2^(n-1)`, capped at `max_delay_ms`.
    Exponential,
}

/// Which failed attempts are worth another try.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RetryPolicy {
    /// Transport errors, timeouts, 5xx and 429 are retried; other statuses are final.
    StatusClass,
    /// Everything that is not 200/201 is retried until the budget runs out.
    Legacy,
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per resource, first one included.
    pub max_attempts: u32,

    pub backoff: BackoffStrategy,

    /// Base delay in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Add up to 10% random jitter to each delay.
    pub jitter: bool,

    pub policy: RetryPolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: BackoffStrategy::Fixed,
            base_delay_ms: 2_000,
            max_delay_ms: 30_000,
            jitter: false,
            policy: RetryPolicy::Legacy,
        }
    }
}

/// Inbound request limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,

    /// Maximum time to answer an inbound proxy request, in seconds.
    /// The relay is not bounded by it; its duration follows the retry budget.
    pub request_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 10 * 1024 * 1024, // 10MB
            request_timeout_secs: 300,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter directive used when `RUST_LOG` is unset.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "hsb=info,tower_http=info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
