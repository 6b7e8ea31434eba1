//! Metrics collection and exposition.
//!
//! # Metrics
//! - `hsb_requests_total` (counter): inbound requests by service, status
//! - `hsb_request_duration_seconds` (histogram): inbound latency by service
//! - `hsb_upsert_attempts_total` (counter): backend PUTs by resource type, outcome
//! - `hsb_resources_total` (counter): relayed/skipped/failed resources
//!
//! Recording is a no-op until an exporter is installed.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(service: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "hsb_requests_total",
        "service" => service,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("hsb_request_duration_seconds", "service" => service)
        .record(start.elapsed().as_secs_f64());
}

/// Label for resource types that are malformed or over the series budget.
const OTHER: &str = "other";

/// Distinct `resource_type` label values before new ones fold into `other`.
const MAX_RESOURCE_TYPES: usize = 256;

/// `outcome` is the backend status code, or `error` when no reply came back.
pub fn record_upsert_attempt(resource_type: &str, outcome: &str) {
    metrics::counter!(
        "hsb_upsert_attempts_total",
        "resource_type" => resource_type_label(resource_type),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Bound the label set: resource types come from callers.
fn resource_type_label(resource_type: &str) -> String {
    static SEEN: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();

    if !is_type_name(resource_type) {
        return OTHER.to_string();
    }

    let Ok(mut seen) = SEEN.get_or_init(Default::default).lock() else {
        return OTHER.to_string();
    };
    if seen.contains(resource_type) {
        return resource_type.to_string();
    }
    if seen.len() >= MAX_RESOURCE_TYPES {
        return OTHER.to_string();
    }
    seen.insert(resource_type.to_string());
    resource_type.to_string()
}

fn is_type_name(s: &str) -> bool {
    s.len() <= 64
        && s.starts_with(|c: char| c.is_ascii_uppercase())
        && s.chars().all(|c| c.is_ascii_alphanumeric())
}

pub fn record_resource(outcome: &'static str) {
    metrics::counter!("hsb_resources_total", "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert!(is_type_name("Patient"));
        assert!(is_type_name("MedicationRequest"));
        assert!(!is_type_name(""));
        assert!(!is_type_name("patient"));
        assert!(!is_type_name("Patient/../x"));
        assert!(!is_type_name(&"A".repeat(65)));
    }

    #[test]
    fn test_resource_type_labels_are_bounded() {
        assert_eq!(resource_type_label("Observation"), "Observation");
        assert_eq!(resource_type_label("not a type"), OTHER);

        let labels: HashSet<String> = (0..MAX_RESOURCE_TYPES * 2)
            .map(|i| resource_type_label(&format!("Generated{}", i)))
            .collect();
        assert!(labels.len() <= MAX_RESOURCE_TYPES + 1);
        assert!(labels.contains(OTHER));
        assert_eq!(resource_type_label("Observation"), "Observation");
    }
}
