//! Exponential backoff retry loop

use crate::error::{FetchError, Result};
use nbfetch_types::RetryPolicy;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Run `op` until it succeeds, the attempt budget is spent, or it fails
/// with a non-retryable error.
///
/// `op` receives the 1-based attempt number. Before retry `n` (0-based) the
/// loop sleeps `policy.delay_for(n)` and calls `on_retry(attempt, delay, err)`
/// for the attempt that just failed. Cancelling `interrupt` ends the loop with
/// [`FetchError::Interrupted`] without waiting out the current delay.
pub async fn retry_with_backoff<T, F, Fut, R>(
    policy: &RetryPolicy,
    interrupt: &CancellationToken,
    mut op: F,
    mut on_retry: R,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
    R: FnMut(u32, Duration, &FetchError),
{
    let attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        if interrupt.is_cancelled() {
            return Err(FetchError::Interrupted);
        }

        let err = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !err.is_retryable() {
            debug!("Attempt {} failed with non-retryable error: {}", attempt, err);
            return Err(err);
        }
        if attempt >= attempts {
            return Err(err);
        }

        let delay = policy.delay_for(attempt - 1);
        warn!(
            chain = %error_chain(&err),
            "{}, retrying in {:.1} seconds (attempt {}/{})",
            err,
            delay.as_secs_f64(),
            attempt,
            attempts
        );
        on_retry(attempt, delay, &err);

        tokio::select! {
            _ = interrupt.cancelled() => return Err(FetchError::Interrupted),
            _ = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
    }
}

/// Render an error with all of its sources, outermost first
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
