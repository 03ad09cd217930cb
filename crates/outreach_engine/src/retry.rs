use std::future::Future;
use std::time::Duration;

/// Bounded retry for a single async operation: fixed delay between
/// attempts, no jitter, no logging. The last failure is propagated once
/// `max_attempts` calls have been made.
///
/// Used for status polls; job start has its own recovery loop.
pub async fn retry<T, E, F, Fut>(
    mut operation: F,
    max_attempts: u32,
    delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= max_attempts => return Err(err),
            Err(_) => {
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
