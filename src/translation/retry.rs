/*!
 * Bounded retry of translation calls.
 *
 * `RetryMachine` walks an explicit state machine:
 *
 * ```text
 * Attempting(n) --ok--------------------------> Succeeded
 * Attempting(n) --transient, n < max----------> Backoff(n, delay) --sleep--> Attempting(n + 1)
 * Attempting(n) --fatal | rejected | n == max-> FailedTerminal
 * ```
 *
 * The delay after attempt `n` is `base * 2^(n-1)`, capped at `max`.
 */

use log::{debug, warn};
use std::future::Future;
use std::time::Duration;

use crate::errors::{PipelineError, ProviderError};

/// Attempt budget and backoff bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first call included (at least 1)
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(base_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms.max(base_delay_ms)),
        }
    }

    /// Backoff after the given (1-based) failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let factor = 1u32 << exponent;
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 1000, 10_000)
    }
}

/// Where a retried call currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Attempting { attempt: u32 },
    Backoff { attempt: u32, delay: Duration },
    Succeeded,
    FailedTerminal,
}

impl RetryState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::FailedTerminal)
    }
}

/// Drives one logical call through `RetryState`
#[derive(Debug)]
pub struct RetryMachine {
    policy: RetryPolicy,
    state: RetryState,
    history: Vec<RetryState>,
}

impl RetryMachine {
    pub fn new(policy: RetryPolicy) -> Self {
        let state = RetryState::Attempting { attempt: 1 };
        Self {
            policy,
            state,
            history: vec![state],
        }
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    /// Every state visited, in order
    pub fn history(&self) -> &[RetryState] {
        &self.history
    }

    fn transition(&mut self, next: RetryState) {
        self.state = next;
        self.history.push(next);
    }

    /// Record a successful attempt
    pub fn succeed(&mut self) {
        self.transition(RetryState::Succeeded);
    }

    /// Record a failed attempt and return the error to surface when the
    /// machine gave up; `None` means a backoff was scheduled.
    pub fn fail(&mut self, error: ProviderError) -> Option<PipelineError> {
        let RetryState::Attempting { attempt } = self.state else {
            return None;
        };

        if error.is_fatal() {
            self.transition(RetryState::FailedTerminal);
            return Some(PipelineError::FatalServiceFailure(error));
        }
        if !error.is_transient() {
            self.transition(RetryState::FailedTerminal);
            return Some(PipelineError::ServiceRejected(error));
        }
        if attempt >= self.policy.max_attempts {
            self.transition(RetryState::FailedTerminal);
            return Some(PipelineError::TransientServiceFailure {
                attempts: attempt,
                source: error,
            });
        }

        let delay = self.policy.delay_for(attempt);
        warn!(
            "Translation attempt {}/{} failed: {}. Retrying in {} ms",
            attempt,
            self.policy.max_attempts,
            error,
            delay.as_millis()
        );
        self.transition(RetryState::Backoff { attempt, delay });
        None
    }

    /// Leave `Backoff` for the next attempt
    pub fn resume(&mut self) {
        if let RetryState::Backoff { attempt, .. } = self.state {
            self.transition(RetryState::Attempting { attempt: attempt + 1 });
        }
    }

    /// Run `operation` until it succeeds or the machine reaches `FailedTerminal`
    pub async fn run<F, Fut, T>(&mut self, mut operation: F) -> Result<T, PipelineError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        loop {
            match self.state {
                RetryState::Attempting { attempt } => match operation(attempt).await {
                    Ok(value) => {
                        if attempt > 1 {
                            debug!("Translation succeeded on attempt {}", attempt);
                        }
                        self.succeed();
                        return Ok(value);
                    }
                    Err(error) => {
                        if let Some(terminal) = self.fail(error) {
                            return Err(terminal);
                        }
                    }
                },
                RetryState::Backoff { delay, .. } => {
                    tokio::time::sleep(delay).await;
                    self.resume();
                }
                RetryState::Succeeded | RetryState::FailedTerminal => {
                    return Err(PipelineError::ServiceRejected(ProviderError::RequestFailed(
                        "retry machine already finished".to_string(),
                    )));
                }
            }
        }
    }
}
