//! FHIR backend integration.
//!
//! # Data Flow
//! ```text
//! inbound body
//!     → model.rs (Bundle, ResourceKey)
//!     → endpoints.rs (root, bundle sub-path, {type}/{id})
//!     → client.rs (POST/PUT with FHIR JSON, deadline enforced)
//!     → BackendResponse
//! ```

pub mod client;
pub mod endpoints;
pub mod model;

pub use client::{BackendError, BackendRequest, BackendResponse, FhirBackend, HttpFhirClient};
pub use model::{Bundle, EntryResource, ResourceKey, SkipReason, FHIR_JSON};
