//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, one router per service)
//!     → request.rs (request ID, tracing span)
//!     → handlers.rs (parse bundle, call service, map result to status)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod server;
pub mod state;

pub use request::{RequestId, X_REQUEST_ID};
pub use server::{HttpServer, ServiceListeners, PROXY_PATH, RELAY_PATH};
pub use state::{AppState, RuntimeSettings};
