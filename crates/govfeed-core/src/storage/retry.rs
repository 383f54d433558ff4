//! Retry for SQLite writes that hit a locked database.
//!
//! Feed fetches are never retried; this only covers the local store, where
//! a concurrent writer can briefly hold the lock.

use std::future::Future;
use std::time::Duration;

/// Maximum number of retry attempts for a write
pub const MAX_RETRIES: u32 = 3;

/// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_BUSY_SNAPSHOT (517)
pub fn is_transient_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => matches!(
            db_err.code().as_deref(),
            Some("5") | Some("6") | Some("517")
        ),
        sqlx::Error::PoolTimedOut => true,
        _ => false,
    }
}

/// 50ms, 100ms, 200ms
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(50 * 2u64.pow(attempt.saturating_sub(1)))
}

/// Run a write, retrying transient lock errors with exponential backoff
pub async fn execute_with_retry<F, Fut, T>(operation: F) -> std::result::Result<T, sqlx::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = std::result::Result<T, sqlx::Error>>,
{
    let mut attempts = 0;
    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if is_transient_error(&e) && attempts < MAX_RETRIES => {
                attempts += 1;
                let delay = backoff_delay(attempts);
                tracing::debug!(
                    error = %e,
                    attempt = attempts,
                    delay_ms = delay.as_millis(),
                    "Database busy, retrying write"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_delay() {
        assert_eq!(backoff_delay(1), Duration::from_millis(50));
        assert_eq!(backoff_delay(2), Duration::from_millis(100));
        assert_eq!(backoff_delay(3), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_retried_then_surface() {
        let calls = AtomicU32::new(0);
        let result: std::result::Result<(), _> = execute_with_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(sqlx::Error::PoolTimedOut) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_RETRIES + 1);
    }

    #[tokio::test]
    async fn test_permanent_errors_not_retried() {
        let calls = AtomicU32::new(0);
        let result: std::result::Result<(), _> = execute_with_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(sqlx::Error::RowNotFound) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
