//! Rate-limit retry with backoff.
//!
//! Only the 429 "too many requests" signal is retried. Any other failure
//! propagates immediately; exhausting the attempt budget yields
//! `LlmError::RateLimited`.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::LlmError;

/// Randomization applied to the fallback delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitterStrategy {
    /// Delay is exactly the calculated value.
    None,
    /// Random value in `[0, calculated_delay]`.
    Full,
}

impl std::str::FromStr for JitterStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(JitterStrategy::None),
            "full" => Ok(JitterStrategy::Full),
            other => Err(format!("unknown jitter strategy '{other}' (expected none|full)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Fallback delay is `base_delay × attempt`.
    pub base_delay: Duration,
    /// Upper bound for any single wait, including server hints.
    pub max_delay: Duration,
    pub jitter: JitterStrategy,
    /// Prefer the delay embedded in the upstream error when present.
    pub honor_retry_hint: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(2000),
            max_delay: Duration::from_secs(60),
            jitter: JitterStrategy::None,
            honor_retry_hint: true,
        }
    }
}

impl RetryPolicy {
    /// Same attempt budget, no waiting.
    #[cfg(test)]
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            honor_retry_hint: false,
            ..Self::default()
        }
    }

    /// Delay before the retry following failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let delay = match hint.filter(|_| self.honor_retry_hint) {
            Some(hinted) => hinted,
            None => {
                let fallback = self.base_delay.saturating_mul(attempt);
                match self.jitter {
                    JitterStrategy::None => fallback,
                    JitterStrategy::Full => fallback.mul_f64(fastrand::f64()),
                }
            }
        };
        delay.min(self.max_delay)
    }
}

/// Invokes `call` until it succeeds, fails with a non-rate-limit error,
/// or the attempt budget is spent.
pub async fn invoke_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut call: F,
) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_rate_limited() => {
                if attempt >= max_attempts {
                    warn!("{label}: still rate limited after {attempt} attempts, giving up");
                    return Err(LlmError::RateLimited { attempts: attempt });
                }
                let delay = policy.delay_for(attempt, e.retry_hint());
                warn!(
                    "{label}: rate limited on attempt {}/{}, retrying after {}ms",
                    attempt,
                    max_attempts,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
