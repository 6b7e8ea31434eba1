//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + HSB_* environment
//!     → loader.rs (parse, deserialize, apply overrides)
//!     → validation.rs (semantic checks)
//!     → HsbConfig (validated, immutable)
//!     → RuntimeSettings snapshot behind ArcSwap in handler state
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the settings snapshot
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Listener addresses are fixed at startup

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BackendConfig, BackoffStrategy, HsbConfig, LimitsConfig, LogFormat, ObservabilityConfig,
    RelayConfig, RetryConfig, RetryPolicy, ServiceConfig,
};
pub use validation::{validate_config, ValidationError};
