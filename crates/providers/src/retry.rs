//! Bounded retry for provider calls.
//!
//! A [`RetryPolicy`] runs an async operation up to `attempts` times,
//! sleeping between failures. The last error is returned once attempts are
//! exhausted. There is no sleep after the final failure.

use std::future::Future;
use std::time::Duration;

use mimic_config::RetryConfig;
use mimic_core::error::ProviderError;
use tracing::warn;

/// How the wait between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay every time.
    Fixed,
    /// Delay doubles after each failure.
    Exponential,
}

/// Attempt-bounded retry with a fixed or exponential delay.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
    backoff: Backoff,
}

impl RetryPolicy {
    /// A fixed-delay policy. At least one attempt is always made.
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
            backoff: Backoff::Fixed,
        }
    }

    /// Switch to exponential backoff.
    pub fn exponential(mut self) -> Self {
        self.backoff = Backoff::Exponential;
        self
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        let policy = Self::new(config.attempts, Duration::from_secs(config.delay_secs));
        if config.exponential {
            policy.exponential()
        } else {
            policy
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Wait after the `failed_attempt`-th failure (1-based).
    pub fn delay_for(&self, failed_attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential => {
                let factor = 2u32.saturating_pow(failed_attempt.saturating_sub(1));
                self.delay.saturating_mul(factor)
            }
        }
    }

    /// Run `op` until it succeeds or attempts run out.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<F, Fut, T>(&self, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.attempts => {
                    warn!(
                        attempts = self.attempts,
                        error = %e,
                        "Retry: giving up"
                    );
                    return Err(e);
                }
                Err(e) => {
                    let wait = self.delay_for(attempt);
                    warn!(
                        attempt,
                        total = self.attempts,
                        wait_ms = wait.as_millis() as u64,
                        error = %e,
                        "Retry: attempt failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
