//! Caller-side retry with exponential backoff.
//!
//! [`RequestManager`](crate::api::RequestManager) never retries on its own;
//! callers that want retries wrap their operation in [`with_retry`].

use std::time::Duration;
use tokio::time::sleep;

use crate::api::ClientError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Budget for backoff delays across all retries. Checked only between
    /// attempts; a running attempt is never cut short.
    pub max_total_time: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            max_total_time: None,
        }
    }
}

impl RetryConfig {
    /// Allow `retries` retries after the first attempt
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.max_attempts = retries.saturating_add(1);
        self
    }

    /// Backoff before the retry following attempt number `attempt`
    fn backoff(&self, attempt: u32) -> Duration {
        let exp = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powf(attempt.saturating_sub(1) as f64);
        Duration::from_secs_f64(exp.min(self.max_delay.as_secs_f64()))
    }
}

/// Failures that are worth another attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientError {
    /// The request never produced a status
    Network,
    /// Too many requests (429)
    TooManyRequests,
    /// Service unavailable (503)
    ServiceUnavailable,
    /// Gateway timeout (504)
    GatewayTimeout,
    /// Any other 5xx
    ServerError,
}

impl TransientError {
    /// Classify a client error, returning `None` for permanent failures
    pub fn from_client_error(err: &ClientError) -> Option<Self> {
        match err {
            ClientError::Network(_) => Some(TransientError::Network),
            ClientError::Remote { status, .. } => match *status {
                429 => Some(TransientError::TooManyRequests),
                503 => Some(TransientError::ServiceUnavailable),
                504 => Some(TransientError::GatewayTimeout),
                500..=599 => Some(TransientError::ServerError),
                _ => None,
            },
            _ => None,
        }
    }

    /// Lower bound on the wait before retrying, for errors that imply one
    pub fn recommended_delay(&self) -> Option<Duration> {
        match self {
            TransientError::TooManyRequests => Some(Duration::from_secs(61)),
            TransientError::ServiceUnavailable => Some(Duration::from_secs(10)),
            _ => None,
        }
    }
}

/// Execute an async operation with retry logic
///
/// # Arguments
///
/// * `config` - Retry configuration
/// * `operation` - The async operation to execute
///
/// # Returns
///
/// The result of the operation, or the last error once retries are
/// exhausted. Permanent errors are returned immediately.
pub async fn with_retry<T, F, Fut>(config: RetryConfig, operation: F) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ClientError>>,
{
    let mut attempts = 0;
    let mut total_elapsed = Duration::ZERO;
    let mut operation = operation;

    loop {
        attempts += 1;

        match operation().await {
            Ok(result) => {
                if attempts > 1 {
                    tracing::info!(
                        "Operation succeeded on attempt {} after {} transient failures",
                        attempts,
                        attempts - 1
                    );
                }
                return Ok(result);
            }
            Err(error) => {
                let Some(transient) = TransientError::from_client_error(&error) else {
                    return Err(error);
                };

                let delay = config.backoff(attempts);
                let delay = match transient.recommended_delay() {
                    Some(floor) => delay.max(floor),
                    None => delay,
                };
                total_elapsed += delay;

                let over_budget = config
                    .max_total_time
                    .is_some_and(|budget| total_elapsed > budget);
                if attempts >= config.max_attempts || over_budget {
                    tracing::warn!(
                        "Operation failed after {} attempts (total backoff: {:?}): {}",
                        attempts,
                        total_elapsed,
                        error
                    );
                    return Err(error);
                }

                tracing::debug!(
                    "Transient error on attempt {}: {:?}, retrying in {:?}",
                    attempts,
                    transient,
                    delay
                );
                sleep(delay).await;
            }
        }
    }
}
