//! Bounded retry around pipeline calls.
//!
//! Attempts run back to back inside the caller's task; the delay between
//! them is an async sleep, so a retrying request never holds a worker
//! thread. With `n` attempts a request can take at most
//! `worst_case_delay()` plus the time spent in the attempts themselves.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::core::errors::ApiError;

use super::pipeline::{Pipeline, PipelineAnswer, PipelineInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// The same delay before every retry.
    Fixed,
    /// Doubles after each retry, never exceeding `max_delay`.
    Exponential { max_delay: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
    backoff: Backoff,
}

impl RetryPolicy {
    /// `max_attempts` counts every call including the first; zero is treated as 1.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            backoff: Backoff::Fixed,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Wait before the 1-based `attempt`. The first attempt never waits.
    pub fn delay_before_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { max_delay } => {
                let doublings = (attempt - 2).min(31);
                self.delay
                    .checked_mul(1u32 << doublings)
                    .unwrap_or(max_delay)
                    .min(max_delay)
            }
        }
    }

    /// Total time spent sleeping when every attempt fails.
    pub fn worst_case_delay(&self) -> Duration {
        (2..=self.max_attempts)
            .map(|attempt| self.delay_before_attempt(attempt))
            .sum()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_secs(60))
    }
}

/// Every attempt failed. Carries the last error for logging only; callers
/// must not forward it to clients.
#[derive(Debug, Error)]
#[error("all {attempts} attempts failed, last error: {last_error}")]
pub struct RetriesExhausted {
    pub attempts: u32,
    pub last_error: ApiError,
}

impl From<RetriesExhausted> for ApiError {
    fn from(_: RetriesExhausted) -> Self {
        ApiError::ResponseFailed
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResilientInvoker {
    policy: RetryPolicy,
}

impl ResilientInvoker {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn invoke_with_retry(
        &self,
        pipeline: &Pipeline,
        input: &PipelineInput,
    ) -> Result<PipelineAnswer, RetriesExhausted> {
        self.run(|| pipeline.invoke(input)).await
    }

    /// Calls `operation` until it succeeds or the policy's attempts run out.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, RetriesExhausted>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 1;

        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            tracing::error!(
                "Attempt {}/{} failed: {}",
                attempt,
                max_attempts,
                error
            );

            if attempt >= max_attempts {
                return Err(RetriesExhausted {
                    attempts: attempt,
                    last_error: error,
                });
            }

            attempt += 1;
            let delay = self.policy.delay_before_attempt(attempt);
            tracing::info!("Retrying in {} seconds", delay.as_secs_f64());
            tokio::time::sleep(delay).await;
        }
    }
}
