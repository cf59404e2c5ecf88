//! Request orchestration against the notice database.
//!
//! - [`RequestManager`]: cache-first fetching with a shared rate limiter
//! - [`PaginatedSearch`]: fans one query out over a range of pages
//! - [`Transport`]: the HTTP boundary, implemented by [`HttpTransport`] and,
//!   for tests, [`MockTransport`]
//! - [`parse`]: converts raw payloads into typed records
//!
//! # Example
//!
//! ```rust,no_run
//! use lumen_client::api::{PaginatedSearch, RequestManager};
//! use lumen_client::config::Config;
//! use lumen_client::models::ParamBuilder;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = RequestManager::from_config(&Config::default())?;
//! let query = ParamBuilder::new().with_query("Skinamarink", None).with_amount(50)?;
//! let notices = PaginatedSearch::new(query)
//!     .with_page_range(1, 4)?
//!     .search(&manager)
//!     .await?;
//! println!("{} notices", notices.len());
//! # Ok(())
//! # }
//! ```

mod manager;
pub mod mock;
mod paginated;
pub mod parse;
mod transport;

pub use manager::{RequestManager, ENTITY_SEARCH_PATH, NOTICE_SEARCH_PATH, TOPICS_PATH};
pub use mock::MockTransport;
pub use paginated::{FetchStrategy, LaunchSpacing, PaginatedSearch};
pub use transport::{HttpTransport, DEFAULT_BASE_URL, DEFAULT_USER_AGENT};

use async_trait::async_trait;
use std::path::PathBuf;

use crate::models::QueryParams;

/// Raw HTTP response handed back by a [`Transport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The HTTP boundary used by [`RequestManager`].
///
/// Implementations issue exactly one GET per call and never retry.
/// Authentication and user agent are the transport's concern.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Issue `GET <base><path>?<params>`
    async fn get(&self, path: &str, params: &QueryParams) -> Result<TransportResponse, ClientError>;
}

/// Broad classes of failure a caller usually branches on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The query was malformed
    Query,
    /// The remote service failed or could not be reached
    Remote,
    /// The response could not be understood
    Decode,
    /// Local configuration, cache or runtime failure
    Local,
}

/// Errors that can occur when talking to the notice database
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Invalid builder input (page, amount, date range)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A search was issued without any parameters
    #[error("Search query has no parameters")]
    EmptyQuery,

    /// The service answered with a non-success status
    #[error("Remote error {status}: {body}")]
    Remote { status: u16, body: String },

    /// The payload was not valid JSON or lacked required fields
    #[error("Decode error: {0}")]
    Decode(String),

    /// Reading or writing the cache failed
    #[error("Cache I/O error at {}: {source}", .path.display())]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The request never produced an HTTP status
    #[error("Network error: {0}")]
    Network(String),

    /// No authentication token was configured
    #[error("No authentication token configured (set LUMEN_API or api.token)")]
    MissingToken,

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A page task panicked or was cancelled
    #[error("Task error: {0}")]
    Task(String),
}

impl ClientError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ClientError::InvalidArgument(_) | ClientError::EmptyQuery => ErrorCategory::Query,
            ClientError::Remote { .. } | ClientError::Network(_) => ErrorCategory::Remote,
            ClientError::Decode(_) => ErrorCategory::Decode,
            ClientError::CacheIo { .. }
            | ClientError::MissingToken
            | ClientError::Config(_)
            | ClientError::Task(_) => ErrorCategory::Local,
        }
    }

    /// HTTP status carried by a [`ClientError::Remote`]
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(format!("JSON: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(ClientError::EmptyQuery.category(), ErrorCategory::Query);
        assert_eq!(
            ClientError::InvalidArgument("x".into()).category(),
            ErrorCategory::Query
        );
        assert_eq!(
            ClientError::Remote {
                status: 503,
                body: String::new()
            }
            .category(),
            ErrorCategory::Remote
        );
        assert_eq!(
            ClientError::Decode("bad".into()).category(),
            ErrorCategory::Decode
        );
        assert_eq!(ClientError::MissingToken.category(), ErrorCategory::Local);
    }

    #[test]
    fn test_remote_status() {
        let err = ClientError::Remote {
            status: 404,
            body: "not found".into(),
        };
        assert_eq!(err.status(), Some(404));
        assert_eq!(ClientError::EmptyQuery.status(), None);
    }

    #[test]
    fn test_transport_response_success_range() {
        assert!(TransportResponse::new(200, "").is_success());
        assert!(TransportResponse::new(204, "").is_success());
        assert!(!TransportResponse::new(301, "").is_success());
        assert!(!TransportResponse::new(500, "").is_success());
    }
}
