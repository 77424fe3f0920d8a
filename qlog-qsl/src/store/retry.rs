//! Retry for SQLite lock contention
//!
//! Another process (the desktop logger itself) may hold the log database
//! while a sync runs. Writes that hit "database is locked" are retried with
//! exponential backoff until `max_wait_ms` has elapsed.

use crate::store::StoreError;
use std::future::Future;
use std::time::{Duration, Instant};

const INITIAL_BACKOFF_MS: u64 = 10;
const MAX_BACKOFF_MS: u64 = 1000;

/// True for the transient SQLite busy/locked errors
pub fn is_lock_error(err: &sqlx::Error) -> bool {
    let text = err.to_string();
    text.contains("database is locked") || text.contains("database table is locked")
}

/// Run `operation`, retrying lock errors with backoff (10 ms doubling to 1 s)
///
/// Lock contention that outlasts `max_wait_ms` becomes
/// [`StoreError::Conflict`]; any other error is returned immediately as
/// [`StoreError::Backend`].
pub async fn retry_on_lock<F, Fut, T>(
    operation_name: &str,
    max_wait_ms: u64,
    mut operation: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let start_time = Instant::now();
    let max_duration = Duration::from_millis(max_wait_ms);
    let mut attempt = 0u32;
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Store operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if !is_lock_error(&err) => return Err(StoreError::from(err)),
            Err(_) => {
                let elapsed = start_time.elapsed();
                if elapsed >= max_duration {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = elapsed.as_millis() as u64,
                        max_wait_ms,
                        "Store still locked, giving up"
                    );
                    return Err(StoreError::Conflict(format!(
                        "database locked after {} attempts ({} ms)",
                        attempt,
                        elapsed.as_millis()
                    )));
                }

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms,
                    remaining_ms = max_duration.saturating_sub(elapsed).as_millis() as u64,
                    "Store locked, will retry after backoff"
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
        }
    }
}
