//! Transport retry policy
//!
//! One reusable policy shared by every remote call site: a fixed number of
//! attempts with a linearly increasing delay, retrying transport-level
//! failures only. Upstream HTTP errors and precondition failures pass
//! through on the first attempt.

use std::future::Future;
use std::time::Duration;

use super::client::ApiError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before retry n is `backoff_unit * n`.
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    /// Run `call` until it returns a non-retryable result or attempts are
    /// exhausted; the last error is returned as-is.
    pub async fn run<T, F, Fut>(&self, op_name: &str, mut call: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt = 1u32;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transport() && attempt < self.max_attempts => {
                    let delay = self.backoff_unit * attempt;
                    log::warn!(
                        "{}: transport error on attempt {}/{} ({}), retrying in {:?}",
                        op_name,
                        attempt,
                        self.max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transport() {
                        log::warn!(
                            "{}: transport error on final attempt {}/{}: {}",
                            op_name,
                            attempt,
                            self.max_attempts,
                            e
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}
