//! Resource Relay: upsert every resource of a bundle, one at a time.
//!
//! Each resource is PUT to `{base}/{resourceType}/{id}` with retry and
//! backoff. Entries are processed strictly in order; a failed or skipped
//! resource never stops the ones after it. Outcomes are logged and counted,
//! and only reported to the caller when the relay is configured to do so.

use axum::body::Bytes;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::Instrument;

use crate::config::{BackendConfig, RetryConfig};
use crate::error::HsbError;
use crate::fhir::{endpoints, BackendRequest, Bundle, FhirBackend, ResourceKey};
use crate::observability::metrics;
use crate::resilience::retries::retry_with_backoff;

/// Fixed acknowledgement returned by the relay.
pub const RELAY_ACK: &str = "Bundle enviado a HAPI";

/// What happened to one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Relayed { status: u16 },
    Skipped { reason: String },
    Failed { reason: String },
}

impl Outcome {
    fn label(&self) -> &'static str {
        match self {
            Outcome::Relayed { .. } => "relayed",
            Outcome::Skipped { .. } => "skipped",
            Outcome::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceOutcome {
    /// Index of the entry in `Bundle.entry`.
    pub entry: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub attempts: u32,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Per-resource outcomes of one relay call, in entry order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelayReport {
    pub outcomes: Vec<ResourceOutcome>,
}

impl RelayReport {
    pub fn relayed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Relayed { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped { .. }))
    }

    /// Every resource reached the backend.
    pub fn is_complete(&self) -> bool {
        self.relayed() == self.outcomes.len()
    }

    pub fn to_json(&self, with_outcomes: bool) -> Value {
        if with_outcomes {
            json!({ "status": RELAY_ACK, "outcomes": self.outcomes })
        } else {
            json!({ "status": RELAY_ACK })
        }
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.outcome)).count()
    }
}

/// Upsert every resource in `bundle`.
///
/// Fails only when the bundle itself is malformed; per-resource problems end
/// up in the report.
pub async fn relay_bundle<B: FhirBackend>(
    backend: &B,
    config: &BackendConfig,
    retries: &RetryConfig,
    bundle: &Bundle,
    request_id: Option<&str>,
) -> Result<RelayReport, HsbError> {
    let resources = bundle.resources()?;
    let mut report = RelayReport::default();

    tracing::info!(resources = resources.len(), "Relaying bundle");

    for resource in resources {
        let entry = resource.entry;
        let outcome = match ResourceKey::from_resource(resource.value) {
            Ok(key) => {
                let span = tracing::info_span!("upsert", entry, resource = %key);
                relay_resource(backend, config, retries, entry, &key, resource.body(), request_id)
                    .instrument(span)
                    .await
            }
            Err(reason) => {
                tracing::warn!(entry, reason = %reason, "Skipping resource");
                ResourceOutcome {
                    entry,
                    resource_type: resource
                        .value
                        .get("resourceType")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    id: None,
                    attempts: 0,
                    outcome: Outcome::Skipped {
                        reason: reason.to_string(),
                    },
                }
            }
        };

        metrics::record_resource(outcome.outcome.label());
        report.outcomes.push(outcome);
    }

    tracing::info!(
        relayed = report.relayed(),
        failed = report.failed(),
        skipped = report.skipped(),
        "Bundle relay finished"
    );

    Ok(report)
}

async fn relay_resource<B: FhirBackend>(
    backend: &B,
    config: &BackendConfig,
    retries: &RetryConfig,
    entry: usize,
    key: &ResourceKey,
    body: Bytes,
    request_id: Option<&str>,
) -> ResourceOutcome {
    let mut outcome = ResourceOutcome {
        entry,
        resource_type: Some(key.resource_type.clone()),
        id: Some(key.id.clone()),
        attempts: 0,
        outcome: Outcome::Failed {
            reason: String::new(),
        },
    };

    let url = match endpoints::resource_endpoint(config, key) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(error = %e, "Error relaying {}", key);
            outcome.outcome = Outcome::Failed { reason: e.to_string() };
            return outcome;
        }
    };

    let timeout = config.request_timeout();

    let retried = retry_with_backoff(retries, |attempt| {
        let request = BackendRequest::put(url.clone(), body.clone(), timeout).with_request_id(request_id);
        async move {
            tracing::debug!(attempt, "Upserting resource");
            let result = backend.send(request).await;
            let status = match &result {
                Ok(response) => response.status.as_str().to_string(),
                Err(_) => "error".to_string(),
            };
            metrics::record_upsert_attempt(&key.resource_type, &status);
            result
        }
    })
    .await;

    outcome.attempts = retried.attempts;
    outcome.outcome = match retried.result {
        Ok(status) => {
            tracing::info!(status = %status, attempts = retried.attempts, "Resource relayed");
            Outcome::Relayed {
                status: status.as_u16(),
            }
        }
        Err(failure) => {
            let reason = failure.to_string();
            tracing::error!(attempts = retried.attempts, reason = %reason, "Error relaying {}", key);
            Outcome::Failed { reason }
        }
    };
    outcome
}
