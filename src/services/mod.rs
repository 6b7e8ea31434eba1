//! The two bus services.
//!
//! Both take a parsed [`Bundle`](crate::fhir::Bundle) and a backend; neither
//! keeps state between calls.

pub mod proxy;
pub mod relay;

#[cfg(test)]
pub(crate) mod testing;

pub use proxy::{forward_bundle, ProxyReply, FORWARDED};
pub use relay::{relay_bundle, Outcome, RelayReport, ResourceOutcome, RELAY_ACK};
