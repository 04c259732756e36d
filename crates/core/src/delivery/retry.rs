use std::fmt::Display;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

/// How often to try and how long to wait in between. Delay before retry
/// number `n` (counting the first attempt as 0) is `base_delay * 2^n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Fake clock: records every requested delay and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        if let Ok(mut waits) = self.waits.lock() {
            waits.push(delay);
        }
    }
}

#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Runs `op` until it succeeds or the policy runs out of attempts. `op`
/// receives the zero-based attempt number. On success returns the value and
/// the number of attempts used.
///
/// Waits happen only between attempts: with the default policy a run that
/// always fails sleeps 1, 2, 4 and 8 seconds and then gives up. The 16 second
/// delay for the fifth attempt would precede no retry, so it is never slept.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    operation: &'static str,
    mut op: F,
) -> Result<(T, u32), RetryExhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt: u32 = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok((value, attempt + 1)),
            Err(err) => {
                let attempts = attempt + 1;
                if attempts >= max_attempts {
                    return Err(RetryExhausted {
                        attempts,
                        last_error: err,
                    });
                }
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    operation,
                    attempt = attempts,
                    ?delay,
                    error = %err,
                    "attempt failed; retrying"
                );
                sleeper.sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
