//! Utility modules supporting request orchestration.
//!
//! - [`CacheStore`]: Content-addressed disk cache keyed by [`RequestFingerprint`]
//! - [`RateLimiter`]: Minimum spacing between outbound network requests
//! - [`with_retry`]: Execute an operation with automatic retry on transient errors
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use lumen_client::api::RequestManager;
//! use lumen_client::config::get_config;
//! use lumen_client::utils::{with_retry, RetryConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = RequestManager::from_config(&get_config())?;
//! let topics = with_retry(RetryConfig::default().with_retries(3), || manager.get_topics()).await?;
//! # Ok(())
//! # }
//! ```

mod cache;
mod rate_limit;
mod retry;

pub use cache::{canonical_request, CacheResult, CacheStats, CacheStore, RequestFingerprint};
pub use rate_limit::{RateLimiter, RequestPermit, DEFAULT_INTERVAL};
pub use retry::{with_retry, RetryConfig, TransientError};
