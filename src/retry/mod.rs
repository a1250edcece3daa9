use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::{RepurposeError, StageResult};

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_retries: u32,

    /// Wait after the first failed attempt; doubles after every further failure
    #[serde(rename = "initial_wait_ms", with = "millis")]
    pub initial_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_wait: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_wait: Duration) -> Self {
        Self {
            max_retries,
            initial_wait,
        }
    }

    /// Wait before the attempt following failed attempt number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_wait.saturating_mul(1u32 << exponent)
    }

    /// Run `operation` until it succeeds, fails with a non-transient error, or the
    /// attempt budget is spent.
    pub async fn call<T, F, Fut>(&self, label: &str, mut operation: F) -> StageResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StageResult<T>>,
    {
        if self.max_retries == 0 {
            return Err(RepurposeError::Config(
                "max_retries must allow at least one attempt".to_string(),
            ));
        }

        let mut attempt = 0;
        loop {
            attempt += 1;

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!("{} succeeded on attempt {}", label, attempt);
                    }
                    return Ok(value);
                }
                Err(err) if !err.is_transient() => {
                    tracing::debug!("{} failed without retry: {}", label, err);
                    return Err(err);
                }
                Err(err) if attempt >= self.max_retries => {
                    tracing::warn!(
                        "{} failed after {} attempts: {}",
                        label,
                        attempt,
                        err
                    );
                    return Err(RepurposeError::RetryExhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                Err(err) => {
                    let wait = self.backoff(attempt);
                    tracing::warn!(
                        "{} attempt {}/{} failed: {}. Retrying in {:?}",
                        label,
                        attempt,
                        self.max_retries,
                        err,
                        wait
                    );
                    sleep(wait).await;
                }
            }
        }
    }
}

/// Free-function form of [`RetryPolicy::call`]
pub async fn call_with_retry<T, F, Fut>(
    operation: F,
    max_retries: u32,
    initial_wait: Duration,
) -> StageResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StageResult<T>>,
{
    RetryPolicy::new(max_retries, initial_wait)
        .call("operation", operation)
        .await
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
