//! Retry wrapper with classified backoff
//!
//! [`execute`] wraps a remote-call operation and retries according to the
//! failure's [`ErrorClass`]: exponential backoff with jitter for transient
//! failures, a much longer slowly-growing delay for quota exhaustion, and an
//! immediate return for fatal errors. The caller sees exactly one terminal
//! error per failed chain, wrapping the last underlying cause.

use std::future::Future;
use std::time::Duration;

use rand::{thread_rng, Rng};
use tracing::{error, warn};

use crate::classify::ErrorClass;
use crate::error::{Error, Result};

/// Retry behavior for a wrapped remote call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay after the first transient failure
    pub base_delay: Duration,
    /// Growth factor applied per transient attempt
    pub multiplier: f64,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Base delay after a quota-exhausted failure. Quota resets are
    /// minute/day scale, so this is much longer than `base_delay`.
    pub quota_delay: Duration,
    /// Jitter fraction (0.0 to 1.0) applied to transient delays
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            quota_delay: Duration::from_secs(30),
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Backoff before the attempt following transient failure `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as f64
            * self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let clamped = base.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(self.jittered(clamped) as u64)
    }

    /// Backoff after quota-exhausted failure `attempt`: slowly growing,
    /// capped at the policy maximum.
    pub fn quota_delay_for(&self, attempt: u32) -> Duration {
        self.quota_delay.saturating_mul(attempt.max(1)).min(self.max_delay)
    }

    fn jittered(&self, millis: f64) -> f64 {
        if self.jitter > 0.0 {
            let factor = thread_rng().gen_range(1.0 - self.jitter..1.0 + self.jitter);
            (millis * factor).max(0.0)
        } else {
            millis
        }
    }
}

/// Run `operation` under `policy`, retrying transient and quota failures.
///
/// Returns the first success, or a single terminal error tagged with the
/// final classification and wrapping the last underlying failure. Fatal
/// failures surface immediately without a retry or a delay.
pub async fn execute<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let class = err.class();
        match class {
            ErrorClass::Fatal => {
                error!(attempt, error = %err, "fatal error, not retrying");
                return Err(err);
            }
            ErrorClass::Transient | ErrorClass::QuotaExhausted if attempt >= max_attempts => {
                error!(attempt, class = ?class, error = %err, "giving up");
                return Err(match class {
                    ErrorClass::Transient => Error::TransientExhausted {
                        attempts: attempt,
                        source: Box::new(err),
                    },
                    _ => Error::QuotaExhausted {
                        attempts: attempt,
                        source: Box::new(err),
                    },
                });
            }
            ErrorClass::Transient => {
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt,
                    max_attempts,
                    class = ?class,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, backing off"
                );
                tokio::time::sleep(delay).await;
            }
            ErrorClass::QuotaExhausted => {
                let delay = policy.quota_delay_for(attempt);
                warn!(
                    attempt,
                    max_attempts,
                    class = ?class,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "quota reported exhausted, backing off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
