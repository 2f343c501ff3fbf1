use super::DeadlineError;
use std::{future::Future, time::Duration};
use tokio::{select, time::sleep};
use tokio_util::sync::CancellationToken;

/// Runs `fut` until it completes, `timeout` elapses or `cancel_token` is cancelled,
/// whichever happens first.
pub(super) async fn with_deadline<T, E, Fut>(
    cancel_token: &CancellationToken,
    timeout: Duration,
    fut: Fut,
) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    E: From<DeadlineError>,
{
    select! {
        biased;
        _ = cancel_token.cancelled() => Err(DeadlineError::Cancelled.into()),
        result = tokio::time::timeout(timeout, fut) => {
            result.unwrap_or_else(|_| Err(DeadlineError::TimedOut.into()))
        }
    }
}

/// Sleeps for `delay`. Returns `false` if `cancel_token` was cancelled first.
pub(super) async fn sleep_or_cancelled(cancel_token: &CancellationToken, delay: Duration) -> bool {
    select! {
        _ = sleep(delay) => true,
        _ = cancel_token.cancelled() => false,
    }
}
