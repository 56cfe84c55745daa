use std::time::Duration;

use rand::random_range;

/// Attempt budget and per-attempt time bound for the retry executor.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub operation_timeout_seconds: u64,
}

impl RetryConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_seconds)
    }
}

/// Inter-attempt delay policy. The executor's observed contract is an
/// immediate re-attempt; the policy is a seam so backoff can be switched
/// on without touching any caller.
#[derive(Debug, Clone, Default)]
pub enum RetryDelay {
    #[default]
    Immediate,
    ExponentialBackoff {
        initial_delay_ms: u64,
        max_delay_ms: u64,
        backoff_multiplier: u64,
    },
}

impl RetryDelay {
    /// Delay to apply after `completed_attempts` failed attempts (>= 1).
    pub fn delay_after(&self, completed_attempts: u32) -> Option<Duration> {
        match self {
            RetryDelay::Immediate => None,
            RetryDelay::ExponentialBackoff {
                initial_delay_ms,
                max_delay_ms,
                backoff_multiplier,
            } => {
                let exponent = completed_attempts.saturating_sub(1);
                let base = initial_delay_ms
                    .saturating_mul(backoff_multiplier.saturating_pow(exponent))
                    .min(*max_delay_ms);

                let jitter = random_range(-0.1..=0.1);
                let jittered = (base as f64 * (1.0 + jitter)) as u64;

                Some(Duration::from_millis(jittered))
            }
        }
    }
}
