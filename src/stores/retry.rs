//! Connect-time retry with exponential backoff.
//!
//! Backend stores use this when establishing their initial connection so a
//! slow-starting Redis or database does not fail the whole service, while a
//! genuinely bad connection string still fails fast.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

/// Backoff schedule for initial backend connections.
#[derive(Debug, Clone)]
pub struct ConnectRetry {
    pub attempts: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ConnectRetry {
    fn default() -> Self {
        // 5 attempts, ~3s worst case: enough to ride out a container start,
        // short enough to surface a misconfigured URL quickly.
        Self {
            attempts: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}

/// Run `connect` until it succeeds or the schedule is exhausted, doubling
/// the delay between attempts.
pub async fn connect_with_backoff<F, Fut, T, E>(
    target: &str,
    schedule: &ConnectRetry,
    mut connect: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = schedule.initial_delay;
    let mut attempt = 0;

    loop {
        match connect().await {
            Ok(conn) => return Ok(conn),
            Err(err) => {
                attempt += 1;
                if attempt >= schedule.attempts {
                    return Err(err);
                }
                warn!(
                    target_store = target,
                    attempt,
                    max = schedule.attempts,
                    error = %err,
                    "connect failed, retrying in {:?}",
                    delay
                );
                sleep(delay).await;
                delay = (delay * 2).min(schedule.max_delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn fast_schedule() -> ConnectRetry {
        ConnectRetry {
            attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_first_try_success() {
        let result: Result<u32, String> =
            connect_with_backoff("test", &fast_schedule(), || async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_succeeds_after_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_ref = calls.clone();

        let result: Result<u32, String> =
            connect_with_backoff("test", &fast_schedule(), || {
                let calls = calls_ref.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("not yet".to_string())
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_attempts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_ref = calls.clone();

        let result: Result<u32, String> =
            connect_with_backoff("test", &fast_schedule(), || {
                let calls = calls_ref.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("still down".to_string())
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
