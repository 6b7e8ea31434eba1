//! HTTP client for the backend FHIR repository.
//!
//! # Responsibilities
//! - Issue one POST or PUT per call with a FHIR JSON body
//! - Enforce the connect timeout and a total per-call deadline
//! - Buffer the backend reply so callers can inspect status and body
//!
//! # Design Decisions
//! - No retry here; retry policy belongs to the caller
//! - `FhirBackend` is the seam handlers are generic over
//! - A non-2xx reply is a successful call; only transport problems are errors

use std::future::Future;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, Method, Request, StatusCode, Uri};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::config::BackendConfig;
use crate::fhir::model::FHIR_JSON;
use crate::http::request::X_REQUEST_ID;
use crate::resilience::timeouts::with_timeout;

/// Failure to obtain a reply from the backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Connection refused, reset, DNS failure and the like.
    #[error("backend unreachable: {0}")]
    Transport(String),
    /// The call did not complete within its deadline.
    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),
    /// The target URL could not be built or is not usable.
    #[error("invalid backend target: {0}")]
    InvalidTarget(String),
    /// The backend replied with something that is not a usable payload.
    #[error("invalid backend response: {0}")]
    InvalidResponse(String),
}

/// One outbound call.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    pub method: Method,
    pub url: Url,
    pub body: Bytes,
    pub timeout: Duration,
    pub request_id: Option<String>,
}

impl BackendRequest {
    pub fn post(url: Url, body: Bytes, timeout: Duration) -> Self {
        Self {
            method: Method::POST,
            url,
            body,
            timeout,
            request_id: None,
        }
    }

    pub fn put(url: Url, body: Bytes, timeout: Duration) -> Self {
        Self {
            method: Method::PUT,
            ..Self::post(url, body, timeout)
        }
    }

    pub fn with_request_id(mut self, request_id: Option<&str>) -> Self {
        self.request_id = request_id.map(str::to_string);
        self
    }
}

/// A buffered backend reply.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Something that can carry a request to the FHIR repository.
pub trait FhirBackend: Send + Sync + 'static {
    fn send(
        &self,
        request: BackendRequest,
    ) -> impl Future<Output = Result<BackendResponse, BackendError>> + Send;
}

/// The production backend: a pooled hyper client.
#[derive(Clone)]
pub struct HttpFhirClient {
    client: Client<HttpConnector, Body>,
    max_response_bytes: usize,
}

impl HttpFhirClient {
    pub fn new(config: &BackendConfig, max_response_bytes: usize) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(config.connect_timeout()));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            max_response_bytes,
        }
    }

    fn build_request(request: &BackendRequest) -> Result<Request<Body>, BackendError> {
        let uri: Uri = request
            .url
            .as_str()
            .parse()
            .map_err(|e| BackendError::InvalidTarget(format!("{}: {}", request.url, e)))?;

        let mut builder = Request::builder()
            .method(request.method.clone())
            .uri(uri)
            .header(header::CONTENT_TYPE, FHIR_JSON)
            .header(header::ACCEPT, FHIR_JSON);

        if let Some(id) = request.request_id.as_deref() {
            if let Ok(value) = HeaderValue::from_str(id) {
                builder = builder.header(X_REQUEST_ID, value);
            }
        }

        builder
            .body(Body::from(request.body.clone()))
            .map_err(|e| BackendError::InvalidTarget(e.to_string()))
    }
}

impl FhirBackend for HttpFhirClient {
    async fn send(&self, request: BackendRequest) -> Result<BackendResponse, BackendError> {
        let req = Self::build_request(&request)?;

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            bytes = request.body.len(),
            "Calling backend"
        );

        with_timeout(request.timeout, async {
            let response: hyper::Response<Incoming> = self
                .client
                .request(req)
                .await
                .map_err(|e| BackendError::Transport(error_chain(&e)))?;

            let (parts, body) = response.into_parts();
            let body = axum::body::to_bytes(Body::new(body), self.max_response_bytes)
                .await
                .map_err(|e| BackendError::InvalidResponse(error_chain(&e)))?;

            Ok(BackendResponse {
                status: parts.status,
                body,
            })
        })
        .await
    }
}

/// Render an error with its sources; hyper's top-level messages alone are terse.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
