//! Timeout enforcement.
//!
//! Every backend call runs under a deadline. An elapsed deadline is reported
//! as `BackendError::Timeout`, distinct from transport failures, so the HTTP
//! boundary can answer 504 instead of 502.

use std::future::Future;
use std::time::Duration;

use crate::fhir::BackendError;

/// Run `fut` with a deadline.
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, BackendError>
where
    F: Future<Output = Result<T, BackendError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_deadline() {
        let result: Result<(), _> = with_timeout(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;
        assert_eq!(result, Err(BackendError::Timeout(Duration::from_millis(50))));
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let result: Result<(), _> = with_timeout(Duration::from_secs(1), async {
            Err(BackendError::Transport("refused".into()))
        })
        .await;
        assert_eq!(result, Err(BackendError::Transport("refused".into())));
    }
}
