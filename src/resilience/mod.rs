//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Upsert to backend:
//!     → timeouts.rs (deadline on every backend call)
//!     → retries.rs (classify the attempt, decide whether to try again)
//!     → backoff.rs (how long to wait before the next attempt)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Only the Resource Relay retries; the Bundle Proxy makes one call
//! - Delays are async sleeps, never blocking a runtime thread

pub mod backoff;
pub mod retries;
pub mod timeouts;
