//! Retry logic for resource upserts.
//!
//! # Responsibilities
//! - Decide whether an attempt succeeded, may be retried, or is final
//! - Run attempts sequentially with a delay in between
//! - Stop at the first success or when the attempt budget is spent
//!
//! # Design Decisions
//! - Upserts are PUTs keyed by type and id, so repeating one is safe
//! - Success means exactly 200 or 201
//! - No delay after the last attempt

use std::future::Future;

use axum::http::StatusCode;

use crate::config::{RetryConfig, RetryPolicy};
use crate::fhir::{BackendError, BackendResponse};
use crate::resilience::backoff::delay_for;

/// Classification of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Success,
    Retry,
    Final,
}

/// Whether the backend accepted the upsert.
pub fn is_success(status: StatusCode) -> bool {
    status == StatusCode::OK || status == StatusCode::CREATED
}

/// Classify an attempt under `policy`.
pub fn classify(policy: RetryPolicy, result: &Result<BackendResponse, BackendError>) -> Verdict {
    match result {
        Ok(response) if is_success(response.status) => Verdict::Success,
        Err(BackendError::InvalidTarget(_)) => Verdict::Final,
        _ if policy == RetryPolicy::Legacy => Verdict::Retry,
        Err(_) => Verdict::Retry,
        Ok(response) => {
            let status = response.status;
            if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                Verdict::Retry
            } else {
                Verdict::Final
            }
        }
    }
}

/// How the last attempt ended when the upsert did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    Status(StatusCode),
    Error(BackendError),
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptFailure::Status(status) => write!(f, "backend answered {}", status.as_u16()),
            AttemptFailure::Error(e) => write!(f, "{}", e),
        }
    }
}

/// Result of a retried operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried {
    pub attempts: u32,
    pub result: Result<StatusCode, AttemptFailure>,
}

/// Run `attempt` until it succeeds, fails for good, or `max_attempts` is reached.
///
/// `attempt` receives the 1-based attempt number.
pub async fn retry_with_backoff<F, Fut>(config: &RetryConfig, mut attempt: F) -> Retried
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<BackendResponse, BackendError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempts = 0;

    loop {
        attempts += 1;
        let result = attempt(attempts).await;
        let verdict = classify(config.policy, &result);

        if verdict == Verdict::Success {
            let status = result.map(|r| r.status).unwrap_or(StatusCode::OK);
            return Retried {
                attempts,
                result: Ok(status),
            };
        }

        let failure = match result {
            Ok(response) => AttemptFailure::Status(response.status),
            Err(e) => AttemptFailure::Error(e),
        };

        if verdict == Verdict::Final || attempts >= max_attempts {
            return Retried {
                attempts,
                result: Err(failure),
            };
        }

        let delay = delay_for(config, attempts);
        tracing::warn!(attempt = attempts, delay = ?delay, reason = %failure, "Retrying upsert");
        tokio::time::sleep(delay).await;
    }
}
