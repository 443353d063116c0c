//! Fixed-interval retry supervision with an overall deadline.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

/// Repeatedly invoke `op` until it succeeds or `timeout` has elapsed
/// since the first attempt.
///
/// On failure the supervisor sleeps `interval` and tries again, with
/// no backoff growth. Once the deadline is exceeded the last error is
/// returned. The operation itself is arbitrary; registry calls and the
/// watch loop are both run under this supervisor.
pub async fn supervise<T, E, F, Fut>(
    mut op: F,
    interval: Duration,
    timeout: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if started.elapsed() >= timeout {
                    debug!("Giving up after {} attempt(s): {}", attempt, e);
                    return Err(e);
                }
                debug!(
                    "Attempt {} failed, retrying in {:?}: {}",
                    attempt, interval, e
                );
                sleep(interval).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<u32, String> = supervise(
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                }
            },
            Duration::from_secs(2),
            Duration::from_secs(60),
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<&str, String> = supervise(
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 3 {
                        Err("not yet".to_string())
                    } else {
                        Ok("done")
                    }
                }
            },
            Duration::from_secs(2),
            Duration::from_secs(60),
        )
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_returns_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), String> = supervise(
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    Err(format!("failure {}", n))
                }
            },
            Duration::from_secs(2),
            Duration::from_secs(5),
        )
        .await;

        // Attempts at t=0, 2, 4, 6; the deadline check fires at t=6.
        let err = result.unwrap_err();
        assert_eq!(err, "failure 3");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_single_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), String> = supervise(
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err("nope".to_string())
                }
            },
            Duration::from_secs(2),
            Duration::ZERO,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
