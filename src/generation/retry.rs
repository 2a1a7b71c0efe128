//! Retry-on-rate-limit policy shared by the content pipeline and refine.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{GenerationError, GenerationOptions, GenerationService};

/// How many times to call the generator and how long to wait after a rate limit.
///
/// Only rate limiting is retried. Any other error ends the attempt loop at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Policy for the background pipeline.
    pub const fn bulk() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(15),
        }
    }

    /// Policy for refine, which runs inside a request.
    pub const fn interactive() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(10),
        }
    }

    pub const fn with_backoff(self, backoff: Duration) -> Self {
        Self { backoff, ..self }
    }
}

/// Waits between attempts and between pipeline sections.
///
/// The wait is an `async` call, so dropping the caller's future (for example
/// when an HTTP client disconnects) ends it.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Call `service` under `policy`.
///
/// Returns the first successful text, or the last error once a non-rate-limit
/// error occurs or all attempts are used up.
pub async fn generate_with_retry(
    service: &dyn GenerationService,
    sleeper: &dyn Sleeper,
    policy: RetryPolicy,
    prompt: &str,
    options: &GenerationOptions,
) -> Result<String, GenerationError> {
    let mut attempt = 1;
    loop {
        match service.generate(prompt, options).await {
            Ok(text) => {
                debug!(attempt, "generate_with_retry: success");
                return Ok(text);
            }
            Err(e) if e.is_rate_limit() && attempt < policy.max_attempts => {
                warn!(
                    attempt,
                    backoff_secs = policy.backoff.as_secs_f64(),
                    "Rate limit hit, backing off"
                );
                sleeper.sleep(policy.backoff).await;
                attempt += 1;
            }
            Err(e) => {
                warn!(attempt, error = %e, "Generation abandoned");
                return Err(e);
            }
        }
    }
}
