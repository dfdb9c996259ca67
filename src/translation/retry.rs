use crate::translation::cancel::CancelSignal;
use crate::utils::TranslateError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

/// Final result of a retried operation and how many calls were actually made.
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T, TranslateError>,
    pub attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Delay after the `attempt`-th failure (1-based). A server-provided
    /// `Retry-After` wins over the exponential schedule; both are capped.
    pub fn delay_for(&self, attempt: u32, error: &TranslateError) -> Duration {
        let exponential = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
        error
            .retry_after()
            .unwrap_or(exponential)
            .min(self.max_delay)
    }

    /// Runs `op` until it succeeds, fails permanently, runs out of attempts,
    /// or `cancel` fires during a backoff. `op` receives the 1-based attempt
    /// number and returns [`TranslateError::Cancelled`] if it gave up before
    /// sending anything; that attempt is not counted.
    pub async fn execute<T, F, Fut>(&self, cancel: &CancelSignal, mut op: F) -> Attempted<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, TranslateError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match op(attempt).await {
                Ok(value) => {
                    return Attempted {
                        result: Ok(value),
                        attempts: attempt,
                    }
                }
                Err(TranslateError::Cancelled) => {
                    return Attempted {
                        result: Err(TranslateError::Cancelled),
                        attempts: attempt - 1,
                    }
                }
                Err(e) => e,
            };

            if !error.is_transient() || attempt >= self.max_attempts {
                return Attempted {
                    result: Err(error),
                    attempts: attempt,
                };
            }

            let delay = self.delay_for(attempt, &error);
            warn!(
                attempt = attempt,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Transient translation failure, backing off"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {
                    return Attempted {
                        result: Err(TranslateError::Cancelled),
                        attempts: attempt,
                    };
                }
            }
        }
    }
}
