//! Generic retry harness with exponential backoff.

use std::future::Future;
use std::time::Duration;

/// Invokes `op` up to `max_attempts` times, sleeping
/// `initial_delay * 2^(attempt-1)` between failed attempts.
///
/// A failure is retried only while `is_retryable` holds for it; otherwise
/// the error is returned immediately. On exhaustion the last error is
/// returned. Attempts are strictly serial.
pub async fn with_retry<T, E, F, Fut, P>(
    mut op: F,
    max_attempts: u32,
    initial_delay: Duration,
    is_retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= max_attempts || !is_retryable(&err) {
                    return Err(err);
                }
                let delay = initial_delay * 2u32.pow(attempt - 1);
                log::warn!(
                    "attempt {}/{} failed, retrying in {:?}",
                    attempt,
                    max_attempts,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
