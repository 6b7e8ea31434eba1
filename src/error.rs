//! Error types surfaced at the HTTP boundary.
//!
//! | Error | HTTP Status | `error` code |
//! |-------|-------------|--------------|
//! | MalformedBundle | 400 | malformed-bundle |
//! | Backend(Transport) | 502 | backend-unreachable |
//! | Backend(InvalidResponse) | 502 | backend-invalid-response |
//! | Backend(Timeout) | 504 | backend-timeout |
//! | Backend(InvalidTarget) | 500 | invalid-backend-target |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::fhir::BackendError;

/// Error returned by the bus operations.
#[derive(Debug, thiserror::Error)]
pub enum HsbError {
    /// The inbound body is not a usable bundle.
    #[error("malformed bundle: {0}")]
    MalformedBundle(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl HsbError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            HsbError::MalformedBundle(_) => StatusCode::BAD_REQUEST,
            HsbError::Backend(BackendError::Transport(_))
            | HsbError::Backend(BackendError::InvalidResponse(_)) => StatusCode::BAD_GATEWAY,
            HsbError::Backend(BackendError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            HsbError::Backend(BackendError::InvalidTarget(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            HsbError::MalformedBundle(_) => "malformed-bundle",
            HsbError::Backend(BackendError::Transport(_)) => "backend-unreachable",
            HsbError::Backend(BackendError::InvalidResponse(_)) => "backend-invalid-response",
            HsbError::Backend(BackendError::Timeout(_)) => "backend-timeout",
            HsbError::Backend(BackendError::InvalidTarget(_)) => "invalid-backend-target",
        }
    }
}

impl IntoResponse for HsbError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "Request failed");
        } else {
            tracing::warn!(error = %self, status = %status, "Request rejected");
        }

        let body = json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        assert_eq!(HsbError::MalformedBundle("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            HsbError::from(BackendError::Transport("refused".into())).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            HsbError::from(BackendError::InvalidResponse("html".into())).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            HsbError::from(BackendError::Timeout(Duration::from_secs(1))).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_response_carries_code() {
        let response = HsbError::MalformedBundle("bad".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
