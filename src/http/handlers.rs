//! HTTP handlers for the two services.

use std::time::Instant;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::Instrument;

use crate::fhir::{Bundle, FhirBackend};
use crate::http::request::RequestId;
use crate::http::state::AppState;
use crate::observability::metrics;
use crate::services::{forward_bundle, relay_bundle};

/// `POST /hsb/message`: forward the bundle whole.
///
/// Answers 201 with the backend status and reply embedded, whatever that
/// status is. Only an unusable inbound body or backend reply changes the
/// proxy's own status.
pub async fn bundle_proxy<B: FhirBackend>(
    State(state): State<AppState<B>>,
    request_id: RequestId,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let settings = state.settings.load_full();

    let result = match Bundle::parse(&body) {
        Ok(bundle) => {
            forward_bundle(
                state.backend.as_ref(),
                &settings.backend,
                &bundle,
                body.clone(),
                Some(request_id.as_str()),
            )
            .await
        }
        Err(e) => Err(e),
    };

    let response = match result {
        Ok(reply) => (StatusCode::CREATED, Json(reply.to_json())).into_response(),
        Err(e) => e.into_response(),
    };

    metrics::record_request("proxy", response.status().as_u16(), start);
    response
}

/// `POST /hsb`: upsert each resource of the bundle.
///
/// Answers 200 with the fixed acknowledgement once every entry has been
/// processed. The relay runs on its own task and finishes even if the caller
/// disconnects. With `report_partial_failure`, an incomplete relay answers 207
/// and lists the per-resource outcomes.
pub async fn resource_relay<B: FhirBackend>(
    State(state): State<AppState<B>>,
    request_id: RequestId,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let settings = state.settings.load_full();

    let bundle = match Bundle::parse(&body) {
        Ok(bundle) => bundle,
        Err(e) => {
            let response = e.into_response();
            metrics::record_request("relay", response.status().as_u16(), start);
            return response;
        }
    };

    // Detached so a caller hanging up cannot stop the relay between entries.
    let backend = state.backend.clone();
    let task_settings = settings.clone();
    let task = tokio::spawn(
        async move {
            relay_bundle(
                backend.as_ref(),
                &task_settings.backend,
                &task_settings.retries,
                &bundle,
                Some(request_id.as_str()),
            )
            .await
        }
        .in_current_span(),
    );

    let result = match task.await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "Relay task failed");
            let response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
            metrics::record_request("relay", response.status().as_u16(), start);
            return response;
        }
    };

    let response = match result {
        Ok(report) => {
            let partial = settings.relay.report_partial_failure && !report.is_complete();
            let status = if partial {
                StatusCode::MULTI_STATUS
            } else {
                StatusCode::OK
            };
            (status, Json(report.to_json(partial))).into_response()
        }
        Err(e) => e.into_response(),
    };

    metrics::record_request("relay", response.status().as_u16(), start);
    response
}

/// `GET /health`: liveness only, the backend is not probed.
pub async fn health(service: &'static str) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": service,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
