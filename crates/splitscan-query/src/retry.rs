//! Bounded, blocking retry with configurable backoff.

use std::time::Duration;

use thiserror::Error;
use tracing::{error, warn};

use splitscan_core::{CoreError, RetryConfig};

/// Every attempt failed.
#[derive(Debug, Error)]
#[error("operation failed after {attempts} attempts: {last_error}")]
pub struct RetryExhausted {
    pub attempts: u32,
    #[source]
    pub last_error: CoreError,
}

/// One attempt plus up to `max_retries` retries, sleeping between them.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Total attempts the policy allows.
    pub const fn max_attempts(&self) -> u32 {
        self.config.max_attempts()
    }

    /// Runs `operation` until it succeeds or the attempts run out, calling
    /// `sleep` with the backoff between attempts.
    ///
    /// `operation` receives the 1-based attempt number.
    pub fn run_with_sleep<T, S, F>(&self, mut sleep: S, mut operation: F) -> Result<T, RetryExhausted>
    where
        S: FnMut(Duration),
        F: FnMut(u32) -> Result<T, CoreError>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            match operation(attempt) {
                Ok(result) => return Ok(result),
                Err(err) => {
                    if attempt >= max_attempts {
                        error!(attempt, error = %err, "operation failed, no retries left");
                        return Err(RetryExhausted {
                            attempts: attempt,
                            last_error: err,
                        });
                    }

                    let delay = self.config.backoff_for_attempt(attempt - 1);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "operation failed, retrying"
                    );
                    sleep(delay);
                }
            }
        }
    }
}
