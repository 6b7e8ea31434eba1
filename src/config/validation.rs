//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, attempts >= 1)
//! - Check that addresses and the backend URL parse
//! - Detect conflicting listener addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: HsbConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use url::Url;

use crate::config::schema::HsbConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &HsbConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !config.proxy.enabled && !config.relay.enabled {
        errors.push(ValidationError::new("proxy.enabled", "at least one service must be enabled"));
    }

    let proxy_addr = check_bind(&mut errors, "proxy.bind_address", &config.proxy.bind_address, config.proxy.enabled);
    let relay_addr = check_bind(&mut errors, "relay.bind_address", &config.relay.bind_address, config.relay.enabled);
    if let (Some(p), Some(r)) = (proxy_addr, relay_addr) {
        if p == r && p.port() != 0 {
            errors.push(ValidationError::new(
                "relay.bind_address",
                format!("conflicts with proxy.bind_address ({})", p),
            ));
        }
    }

    match Url::parse(&config.backend.base_url) {
        Ok(url) if url.scheme() != "http" => errors.push(ValidationError::new(
            "backend.base_url",
            format!("unsupported scheme '{}', only http is supported", url.scheme()),
        )),
        Ok(url) if url.cannot_be_a_base() || url.host().is_none() => {
            errors.push(ValidationError::new("backend.base_url", "must be an absolute http URL"))
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::new("backend.base_url", e.to_string())),
    }

    if config.backend.bundle_path.trim_matches('/').is_empty() {
        errors.push(ValidationError::new("backend.bundle_path", "must not be empty"));
    }
    if config.backend.connect_timeout_ms == 0 {
        errors.push(ValidationError::new("backend.connect_timeout_ms", "must be greater than 0"));
    }
    if config.backend.request_timeout_ms == 0 {
        errors.push(ValidationError::new("backend.request_timeout_ms", "must be greater than 0"));
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if config.retries.max_delay_ms < config.retries.base_delay_ms {
        errors.push(ValidationError::new(
            "retries.max_delay_ms",
            "must be greater than or equal to retries.base_delay_ms",
        ));
    }

    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::new("limits.max_body_size", "must be greater than 0"));
    }
    if config.limits.request_timeout_secs == 0 {
        errors.push(ValidationError::new("limits.request_timeout_secs", "must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_bind(
    errors: &mut Vec<ValidationError>,
    field: &'static str,
    value: &str,
    enabled: bool,
) -> Option<SocketAddr> {
    if !enabled {
        return None;
    }
    match value.parse::<SocketAddr>() {
        Ok(addr) => Some(addr),
        Err(_) => {
            errors.push(ValidationError::new(field, format!("'{}' is not a socket address", value)));
            None
        }
    }
}
