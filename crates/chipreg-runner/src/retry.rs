//! Fixed-delay retry of transient failures.

use std::future::Future;
use std::time::Duration;

use chipreg_core::RegressionConfig;
use tracing::debug;

/// Retry budget and delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first (0 = run once).
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    pub fn from_config(config: &RegressionConfig) -> Self {
        Self::new(config.max_retries, config.retry_delay())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// What one attempt produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt<T> {
    /// Accept this value, no further attempts.
    Final(T),
    /// Worth another try; the string describes the cause.
    Transient(String),
}

/// Result of the whole retry loop.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome<T> {
    Completed { value: T, attempts: u32 },
    Exhausted { attempts: u32, last_cause: String },
}

/// Run `op` until it yields [`Attempt::Final`] or the budget is spent.
///
/// `op` receives the 1-based attempt number. `on_retry` is called with the
/// failed attempt number and cause before each delay. An `Err` from `op`
/// aborts the loop immediately.
pub async fn retry_fixed<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    mut op: F,
    mut on_retry: R,
) -> Result<RetryOutcome<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Attempt<T>, E>>,
    R: FnMut(u32, &str),
{
    let max_attempts = policy.max_attempts();
    let mut last_cause = String::new();

    for attempt in 1..=max_attempts {
        match op(attempt).await? {
            Attempt::Final(value) => {
                return Ok(RetryOutcome::Completed {
                    value,
                    attempts: attempt,
                })
            }
            Attempt::Transient(cause) => {
                if attempt < max_attempts {
                    on_retry(attempt, &cause);
                    debug!(attempt, delay_ms = policy.delay.as_millis() as u64, "Retrying after delay");
                    tokio::time::sleep(policy.delay).await;
                }
                last_cause = cause;
            }
        }
    }

    Ok(RetryOutcome::Exhausted {
        attempts: max_attempts,
        last_cause,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt() {
        let policy = RetryPolicy::default();
        let outcome = retry_fixed(
            &policy,
            |_| async { Ok::<_, Infallible>(Attempt::Final("ok")) },
            |_, _| panic!("no retry expected"),
        )
        .await
        .unwrap();
        assert_eq!(
            outcome,
            RetryOutcome::Completed {
                value: "ok",
                attempts: 1
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_succeeds_with_fixed_delay() {
        let policy = RetryPolicy::new(2, Duration::from_secs(5));
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();
        let mut retried = Vec::new();

        let outcome = retry_fixed(
            &policy,
            |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Ok::<_, Infallible>(Attempt::Transient(format!("timeout {attempt}")))
                    } else {
                        Ok(Attempt::Final(attempt))
                    }
                }
            },
            |attempt, cause| retried.push((attempt, cause.to_string())),
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            RetryOutcome::Completed {
                value: 3,
                attempts: 3
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(retried.len(), 2);
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(10) && waited < Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_after_max_retries_plus_one() {
        let policy = RetryPolicy::new(2, Duration::from_secs(1));
        let calls = AtomicU32::new(0);

        let outcome: RetryOutcome<()> = retry_fixed(
            &policy,
            |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, Infallible>(Attempt::Transient(format!("exit 1 on {attempt}"))) }
            },
            |_, _| {},
        )
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            outcome,
            RetryOutcome::Exhausted {
                attempts: 3,
                last_cause: "exit 1 on 3".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_runs_once() {
        let policy = RetryPolicy::new(0, Duration::from_secs(1));
        let outcome: RetryOutcome<()> = retry_fixed(
            &policy,
            |_| async { Ok::<_, Infallible>(Attempt::Transient("x".to_string())) },
            |_, _| panic!("no retry expected"),
        )
        .await
        .unwrap();
        assert!(matches!(outcome, RetryOutcome::Exhausted { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn test_error_aborts_loop() {
        let policy = RetryPolicy::new(5, Duration::ZERO);
        let calls = AtomicU32::new(0);
        let result: Result<RetryOutcome<()>, &str> = retry_fixed(
            &policy,
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("disk full") }
            },
            |_, _| {},
        )
        .await;
        assert_eq!(result.unwrap_err(), "disk full");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
