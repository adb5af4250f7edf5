use anyhow::Error;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Re-sends a rate archive request that failed before any HTTP response
/// arrived (connection refused, reset, DNS failure).
///
/// A response with an error status is a successful call here: a missing
/// archive day answers 404, and retrying it would only delay the walk to the
/// next day. `retries` counts extra attempts after the first, spaced by
/// `delay_ms`.
pub async fn with_retry<F, Fut, T>(
    mut operation: F,
    retries: usize,
    delay_ms: u64,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(response) => return Ok(response),
            Err(err) if attempt < retries => {
                attempt += 1;
                debug!(
                    "Rate request failed ({}), retry {}/{}",
                    err, attempt, retries
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            Err(err) => return Err(Error::from(err)),
        }
    }
}
