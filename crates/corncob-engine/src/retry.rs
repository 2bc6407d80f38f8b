//! Exponential-backoff retry wrapper for transient storage failures.
//!
//! Grounded on `lnxdrive-sync/src/engine.rs`'s `with_retry`, adapted to use
//! `CorncobError::is_transient()` (a typed classification already made by
//! each storage adapter) instead of sniffing an `anyhow::Error`'s rendered
//! string for keywords like `"timeout"` or `"429"`.

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use corncob_core::domain::errors::CorncobError;

/// Maximum number of retries for transient errors.
const MAX_RETRIES: u32 = 5;

/// Base delay for exponential backoff (1 second).
const BASE_DELAY_SECS: u64 = 1;

/// Runs `f` with exponential backoff (1s, 2s, 4s, 8s, 16s) on transient
/// failures. Non-transient errors return immediately on the first attempt.
pub async fn with_retry<F, Fut, T>(operation_name: &str, f: F) -> Result<T, CorncobError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, CorncobError>>,
{
    let mut last_error: Option<CorncobError> = None;

    for attempt in 0..=MAX_RETRIES {
        match f().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(operation = operation_name, attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                if attempt < MAX_RETRIES && err.is_transient() {
                    let delay_secs = BASE_DELAY_SECS * 2u64.pow(attempt);
                    warn!(
                        operation = operation_name,
                        attempt,
                        delay_secs,
                        error = %err,
                        "transient error, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs(delay_secs)).await;
                    last_error = Some(err);
                } else {
                    return Err(err);
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| CorncobError::Other(format!("retry exhausted for {operation_name}"))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_immediately_without_retrying_on_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry("noop", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, CorncobError>(42)
        })
        .await
        .unwrap();
        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry("flaky", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(CorncobError::Transport("connection reset".to_string()))
            } else {
                Ok(99)
            }
        })
        .await
        .unwrap();
        assert_eq!(result, 99);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_transient_errors() {
        let calls = AtomicU32::new(0);
        let result = with_retry("permanent", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<u32, _>(CorncobError::AuthExpired("token revoked".to_string()))
        })
        .await;
        assert!(matches!(result, Err(CorncobError::AuthExpired(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
