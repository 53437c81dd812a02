//! Local cancellation of in-flight calls.
//!
//! This stops waiting for a call on the client side. To stop a query that
//! is already running on the server, use [`RestfulClient::cancel`] as well.
//!
//! [`RestfulClient::cancel`]: crate::RestfulClient::cancel

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{RestfulError, RestfulResult};

/// Runs `future` until it completes or `signal` is cancelled.
///
/// On cancellation the future is dropped, which aborts any HTTP call it
/// had in flight, and [`RestfulError::Cancelled`] is returned. A signal
/// that is already cancelled wins over a future that is already ready.
///
/// # Examples
///
/// ```
/// use snowflake_restful::{cancellable, RestfulError};
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let signal = CancellationToken::new();
/// signal.cancel();
/// let result = cancellable(&signal, async { Ok::<_, RestfulError>(1) }).await;
/// assert!(matches!(result, Err(RestfulError::Cancelled)));
/// # }
/// ```
pub async fn cancellable<T, F>(signal: &CancellationToken, future: F) -> RestfulResult<T>
where
    F: Future<Output = RestfulResult<T>>,
{
    tokio::select! {
        biased;

        _ = signal.cancelled() => {
            tracing::debug!("Call cancelled by caller");
            Err(RestfulError::Cancelled)
        }
        result = future => result,
    }
}
