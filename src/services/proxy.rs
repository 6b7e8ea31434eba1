//! Bundle Proxy: forward a whole bundle to the backend in one call.
//!
//! Transaction and batch bundles go to the backend root, where the server
//! processes them as a unit; every other bundle is created under the bundle
//! sub-path. The reply embeds the backend's status and body; the proxy's own
//! answer is 201 whenever the backend produced a JSON reply.

use axum::body::Bytes;
use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::config::BackendConfig;
use crate::error::HsbError;
use crate::fhir::{endpoints, BackendError, BackendRequest, Bundle, FhirBackend};

/// Fixed `status` field of the proxy reply.
pub const FORWARDED: &str = "forwarded to FHIR";

/// What the backend answered.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyReply {
    pub fhir_status: StatusCode,
    pub fhir_response: Value,
}

impl ProxyReply {
    pub fn to_json(&self) -> Value {
        json!({
            "status": FORWARDED,
            "fhir_status": self.fhir_status.as_u16(),
            "fhir_response": self.fhir_response,
        })
    }
}

/// POST `raw` (the verbatim inbound body of `bundle`) to its endpoint.
pub async fn forward_bundle<B: FhirBackend>(
    backend: &B,
    config: &BackendConfig,
    bundle: &Bundle,
    raw: Bytes,
    request_id: Option<&str>,
) -> Result<ProxyReply, HsbError> {
    let url = endpoints::bundle_endpoint(config, bundle)?;

    tracing::info!(
        bundle_type = bundle.bundle_type().unwrap_or("<none>"),
        url = %url,
        "Forwarding bundle"
    );

    let request = BackendRequest::post(url, raw, config.request_timeout()).with_request_id(request_id);
    let response = backend.send(request).await?;

    let fhir_response: Value = serde_json::from_slice(&response.body).map_err(|e| {
        BackendError::InvalidResponse(format!(
            "status {} with a body that is not JSON: {}",
            response.status, e
        ))
    })?;

    if !response.status.is_success() {
        tracing::warn!(fhir_status = %response.status, "Backend rejected bundle");
    }

    Ok(ProxyReply {
        fhir_status: response.status,
        fhir_response,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::ScriptedBackend;
    use axum::http::Method;

    fn raw(value: Value) -> (Bundle, Bytes) {
        let bytes = Bytes::from(value.to_string());
        (Bundle::parse(&bytes).unwrap(), bytes)
    }

    #[tokio::test]
    async fn test_transaction_posts_to_root_verbatim() {
        let backend = ScriptedBackend::replying(200, r#"{"resourceType":"Bundle","type":"transaction-response"}"#);
        let (bundle, bytes) = raw(json!({"resourceType": "Bundle", "type": "transaction", "entry": []}));

        let reply = forward_bundle(&backend, &BackendConfig::default(), &bundle, bytes.clone(), Some("r1"))
            .await
            .unwrap();

        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::POST);
        assert_eq!(calls[0].url.as_str(), "http://localhost:8080/fhir");
        assert_eq!(calls[0].body, bytes);
        assert_eq!(calls[0].request_id.as_deref(), Some("r1"));
        assert_eq!(reply.fhir_status, StatusCode::OK);
        assert_eq!(reply.fhir_response["type"], "transaction-response");
    }

    #[tokio::test]
    async fn test_collection_posts_to_bundle_path() {
        let backend = ScriptedBackend::replying(201, r#"{"id":"b1"}"#);
        let (bundle, bytes) = raw(json!({"type": "collection"}));

        forward_bundle(&backend, &BackendConfig::default(), &bundle, bytes, None)
            .await
            .unwrap();

        assert_eq!(backend.calls()[0].url.as_str(), "http://localhost:8080/fhir/Bundle");
    }

    #[tokio::test]
    async fn test_backend_error_status_is_embedded() {
        let backend = ScriptedBackend::replying(500, r#"{"resourceType":"OperationOutcome"}"#);
        let (bundle, bytes) = raw(json!({"type": "batch"}));

        let reply = forward_bundle(&backend, &BackendConfig::default(), &bundle, bytes, None)
            .await
            .unwrap();

        assert_eq!(reply.fhir_status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(reply.to_json()["fhir_status"], 500);
        assert_eq!(reply.to_json()["status"], FORWARDED);
    }

    #[tokio::test]
    async fn test_non_json_reply_is_invalid_response() {
        let backend = ScriptedBackend::replying(502, "<html>Bad Gateway</html>");
        let (bundle, bytes) = raw(json!({"type": "batch"}));

        let err = forward_bundle(&backend, &BackendConfig::default(), &bundle, bytes, None)
            .await
            .unwrap_err();

        assert!(matches!(err, HsbError::Backend(BackendError::InvalidResponse(_))));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_transport_error_is_not_retried() {
        let backend = ScriptedBackend::failing();
        let (bundle, bytes) = raw(json!({"type": "batch"}));

        let err = forward_bundle(&backend, &BackendConfig::default(), &bundle, bytes, None)
            .await
            .unwrap_err();

        assert!(matches!(err, HsbError::Backend(BackendError::Transport(_))));
        assert_eq!(backend.calls().len(), 1);
    }
}
