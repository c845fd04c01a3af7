use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Transient socket/pool conditions worth a linear-backoff retry. Anything
/// else (constraint violations, syntax errors, missing tables) bubbles up
/// on the first attempt.
fn is_retryable(err: &sqlx::Error) -> bool {
    let text = err.to_string().to_ascii_lowercase();
    matches!(err, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_))
        || text.contains("database is locked")
        || text.contains("connection reset")
        || text.contains("econnreset")
        || text.contains("etimedout")
        || text.contains("ehostunreach")
        || text.contains("econnrefused")
}

/// Runs `op` up to `retry_count + 1` times, sleeping
/// `retry_delay_ms * (attempt + 1)` between attempts while the error
/// classifies as transient.
pub async fn with_retry<T, F, Fut>(retry_count: u32, retry_delay_ms: u64, mut op: F) -> Result<T, sqlx::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < retry_count && is_retryable(&err) => {
                let delay = Duration::from_millis(retry_delay_ms * (attempt as u64 + 1));
                warn!(attempt, error = %err, "transient database error, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
