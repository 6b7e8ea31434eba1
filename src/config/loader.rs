//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::HsbConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Overrides the backend base URL.
pub const ENV_BACKEND_URL: &str = "HSB_BACKEND_URL";
/// Overrides the Bundle Proxy bind address.
pub const ENV_PROXY_BIND: &str = "HSB_PROXY_BIND";
/// Overrides the Resource Relay bind address.
pub const ENV_RELAY_BIND: &str = "HSB_RELAY_BIND";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<HsbConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse, apply environment overrides, and validate.
pub fn parse_config(content: &str) -> Result<HsbConfig, ConfigError> {
    let mut config: HsbConfig = toml::from_str(content)?;
    apply_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Defaults plus environment overrides, validated. Used when no file is given.
pub fn default_config() -> Result<HsbConfig, ConfigError> {
    let mut config = HsbConfig::default();
    apply_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply `HSB_*` overrides read through `lookup`.
pub fn apply_overrides<F>(config: &mut HsbConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_BACKEND_URL) {
        config.backend.base_url = url;
    }
    if let Some(addr) = lookup(ENV_PROXY_BIND) {
        config.proxy.bind_address = addr;
    }
    if let Some(addr) = lookup(ENV_RELAY_BIND) {
        config.relay.bind_address = addr;
    }
}
