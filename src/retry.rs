use anyhow::{Error, Result, anyhow};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::retry::{RetryConfig, RetryDelay};

#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    #[error("Operation '{operation}' was cancelled")]
    Cancelled { operation: String },

    #[error("Operation '{operation}' failed after {attempts} attempts: {last_error}")]
    Exhausted {
        operation: String,
        attempts: u32,
        last_error: Error,
    },
}

impl RetryError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }
}

/// Bounded-retry executor with a per-attempt timeout. A timed-out attempt
/// counts against the budget like any other failure; cancellation through
/// the token short-circuits without consuming further attempts.
#[derive(Clone)]
pub struct RetryService {
    config: RetryConfig,
    delay: RetryDelay,
}

impl RetryService {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            delay: RetryDelay::Immediate,
        }
    }

    pub fn with_delay(mut self, delay: RetryDelay) -> Self {
        self.delay = delay;
        self
    }

    pub async fn execute_with_retry<T, F, Fut>(
        &self,
        operation_name: &str,
        cancel: &CancellationToken,
        operation: F,
    ) -> Result<T, RetryError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let attempt_timeout = self.config.attempt_timeout();
        let mut last_error: Option<Error> = None;

        for attempt in 1..=self.config.max_attempts {
            if attempt > 1 {
                if let Some(delay) = self.delay.delay_after(attempt - 1) {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            return Err(RetryError::Cancelled {
                                operation: operation_name.to_string(),
                            });
                        }
                        _ = sleep(delay) => {}
                    }
                }
            }

            let outcome = tokio::select! {
                _ = cancel.cancelled() => {
                    info!(operation = operation_name, attempt, "Operation cancelled");
                    return Err(RetryError::Cancelled {
                        operation: operation_name.to_string(),
                    });
                }
                outcome = timeout(attempt_timeout, operation()) => outcome,
            };

            match outcome {
                Ok(Ok(value)) => {
                    if attempt > 1 {
                        info!(
                            operation = operation_name,
                            attempt,
                            max_attempts = self.config.max_attempts,
                            "Operation succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Ok(Err(e)) => {
                    debug!(
                        operation = operation_name,
                        attempt,
                        max_attempts = self.config.max_attempts,
                        error = %e,
                        "Attempt failed"
                    );
                    last_error = Some(e);
                }
                Err(_) => {
                    debug!(
                        operation = operation_name,
                        attempt,
                        max_attempts = self.config.max_attempts,
                        timeout_seconds = self.config.operation_timeout_seconds,
                        "Attempt timed out"
                    );
                    last_error = Some(anyhow!(
                        "Attempt timed out after {}s",
                        self.config.operation_timeout_seconds
                    ));
                }
            }
        }

        warn!(
            operation = operation_name,
            max_attempts = self.config.max_attempts,
            "Retry budget exhausted"
        );

        Err(RetryError::Exhausted {
            operation: operation_name.to_string(),
            attempts: self.config.max_attempts,
            last_error: last_error
                .unwrap_or_else(|| anyhow!("Operation was never attempted (max_attempts = 0)")),
        })
    }
}
