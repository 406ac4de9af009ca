use std::future::Future;
use std::time::Duration;

use crate::errors::PluginError;

const DEFAULT_MAX_RETRIES: usize = 3;
const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_secs(5);

/// Exponential-backoff policy around a retryable operation.
///
/// Only [`PluginError::Retryable`] triggers a retry; every other error
/// returns immediately. After the attempt budget is exhausted the
/// underlying cause is returned, not the retryable wrapper. The policy
/// itself is stateless across calls.
#[derive(Debug, Clone)]
pub struct Retrier {
    max_retries: usize,
    initial_interval: Duration,
}

impl Retrier {
    /// `max_retries` is the total attempt budget; zero selects the
    /// default of 3. `None` for the interval selects the default of 5s;
    /// an explicit zero interval is honored (useful in tests).
    pub fn new(max_retries: usize, initial_interval: Option<Duration>) -> Self {
        Self {
            max_retries: if max_retries == 0 {
                DEFAULT_MAX_RETRIES
            } else {
                max_retries
            },
            initial_interval: initial_interval.unwrap_or(DEFAULT_INITIAL_INTERVAL),
        }
    }

    /// Drives `op` until it succeeds, fails permanently, or runs out of
    /// attempts. `notify` is called before each backoff sleep with the
    /// underlying error and the upcoming delay.
    pub async fn retry<F, Fut, N>(&self, mut op: F, mut notify: N) -> Result<(), PluginError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), PluginError>>,
        N: FnMut(&PluginError, Duration),
    {
        let mut interval = self.initial_interval;
        let mut attempts = 0;
        loop {
            attempts += 1;
            match op().await {
                Ok(()) => return Ok(()),
                Err(PluginError::Retryable(inner)) => {
                    if attempts >= self.max_retries {
                        return Err(*inner);
                    }
                    notify(&inner, interval);
                    tokio::time::sleep(interval).await;
                    interval *= 2;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for Retrier {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, None)
    }
}
