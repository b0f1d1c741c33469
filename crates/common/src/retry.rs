//! Bounded fixed-delay retries around flaky external calls.
//!
//! The policy is a plain value: callers build one from configuration and pass
//! it to [`retry`] at each call site they want to protect.

use std::{fmt::Display, future::Future, time::Duration};

use tracing::warn;

/// Total attempt budget and pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Build a policy. `max_attempts` is clamped to at least one attempt.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// A policy that makes exactly one attempt.
    #[must_use]
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

/// Run `call` until it succeeds or the policy's attempts are used up.
///
/// Sleeps `policy.delay()` between attempts (no growth). The error of the
/// final attempt is returned unchanged.
pub async fn retry<T, E, F, Fut>(policy: RetryPolicy, operation: &str, mut call: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts;
    let mut attempt = 1u32;

    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= max_attempts => return Err(err),
            Err(err) => {
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    delay_ms = policy.delay.as_millis() as u64,
                    error = %err,
                    "external call failed, retrying"
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            },
        }
    }
}
