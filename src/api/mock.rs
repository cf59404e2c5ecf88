//! Mock transport for testing purposes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use super::{ClientError, Transport, TransportResponse};
use crate::models::QueryParams;

/// A request observed by [`MockTransport`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub path: String,
    pub params: QueryParams,
    pub at: Instant,
}

#[derive(Debug, Default)]
struct MockState {
    /// Responses keyed by path and encoded query
    exact: HashMap<(String, String), TransportResponse>,
    /// Fallback responses keyed by path
    by_path: HashMap<String, TransportResponse>,
    calls: Vec<RecordedCall>,
}

/// A transport that returns predefined responses and records every call.
///
/// Unmatched requests get a 404 with an empty body.
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
    latency: Duration,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Respond to any request for `path`
    pub fn respond(&self, path: &str, status: u16, body: impl Into<String>) {
        self.state()
            .by_path
            .insert(path.to_string(), TransportResponse::new(status, body));
    }

    /// Respond to requests for `path` with exactly `params`
    pub fn respond_to(&self, path: &str, params: &QueryParams, status: u16, body: impl Into<String>) {
        self.state().exact.insert(
            (path.to_string(), params.to_query_string()),
            TransportResponse::new(status, body),
        );
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, path: &str, params: &QueryParams) -> Result<TransportResponse, ClientError> {
        let response = {
            let mut state = self.state();
            state.calls.push(RecordedCall {
                path: path.to_string(),
                params: params.clone(),
                at: Instant::now(),
            });
            state
                .exact
                .get(&(path.to_string(), params.to_query_string()))
                .or_else(|| state.by_path.get(path))
                .cloned()
                .unwrap_or_else(|| TransportResponse::new(404, ""))
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ParamBuilder;

    #[tokio::test]
    async fn test_exact_match_preferred() {
        let mock = MockTransport::new();
        let page_two = ParamBuilder::new().with_page(2).into_params();
        mock.respond("/notices/search.json", 200, "default");
        mock.respond_to("/notices/search.json", &page_two, 500, "boom");

        let default = mock
            .get("/notices/search.json", &QueryParams::new())
            .await
            .unwrap();
        assert_eq!(default.body, "default");

        let exact = mock.get("/notices/search.json", &page_two).await.unwrap();
        assert_eq!(exact.status, 500);
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_unmatched_is_not_found() {
        let mock = MockTransport::new();
        let response = mock.get("/missing.json", &QueryParams::new()).await.unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(mock.calls()[0].path, "/missing.json");
    }
}
