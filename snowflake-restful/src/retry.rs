//! Caller-side retry of transient failures.

use std::future::Future;

use crate::config::RetryPolicy;
use crate::error::RestfulResult;
use crate::request_id::RequestId;

/// Runs `operation` until it succeeds, fails with a non-retriable error, or
/// `policy` runs out of attempts.
///
/// Every attempt belongs to the same logical request `request_id`; the
/// operation is expected to reuse it. The last error is returned when the
/// attempts run out.
pub async fn retry_transient<T, F, Fut>(
    policy: &RetryPolicy,
    request_id: RequestId,
    mut operation: F,
) -> RestfulResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RestfulResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_retriable() && attempt < max_attempts => {
                let delay = policy.backoff(attempt);
                tracing::debug!(
                    request_id = %request_id,
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => {
                if error.is_retriable() {
                    tracing::warn!(
                        request_id = %request_id,
                        attempt = attempt,
                        error = %error,
                        "Giving up after transient failures"
                    );
                }
                return Err(error);
            }
        }
    }
}
