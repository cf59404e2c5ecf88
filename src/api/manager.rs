//! Cache-first request manager.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::parse;
use super::{ClientError, HttpTransport, Transport};
use crate::config::Config;
use crate::models::{
    keys, EntitySearch, Notice, ParamBuilder, QueryParams, SearchData, TopicRecord, MAX_PER_PAGE,
};
use crate::utils::{CacheResult, CacheStats, CacheStore, RateLimiter, RequestFingerprint};

/// Notice search endpoint
pub const NOTICE_SEARCH_PATH: &str = "/notices/search.json";

/// Topic listing endpoint
pub const TOPICS_PATH: &str = "/topics.json";

/// Entity search endpoint
pub const ENTITY_SEARCH_PATH: &str = "/entities/search.json";

/// Fetches JSON through a response cache and a shared rate limiter.
///
/// Clones share the same transport, cache and limiter, so a clone handed to
/// a spawned task is the same logical manager. Separate managers never
/// coordinate their rate limits.
#[derive(Debug, Clone)]
pub struct RequestManager {
    transport: Arc<dyn Transport>,
    cache: CacheStore,
    limiter: Arc<RateLimiter>,
}

impl RequestManager {
    /// Create a manager over `transport` with a fresh limiter
    pub fn new(transport: Arc<dyn Transport>, cache: CacheStore, interval: Duration) -> Self {
        Self {
            transport,
            cache,
            limiter: Arc::new(RateLimiter::new(interval)),
        }
    }

    /// Build an HTTP-backed manager from configuration.
    ///
    /// Fails with [`ClientError::MissingToken`] when no token is configured.
    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        let token = config
            .api
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(ClientError::MissingToken)?;
        let transport =
            HttpTransport::with_options(token, &config.api.base_url, &config.api.user_agent)?;
        let cache = CacheStore::from_dir(config.cache.effective_dir())?;

        Ok(Self::new(
            Arc::new(transport),
            cache,
            config.rate_limits.interval(),
        ))
    }

    pub fn rate_limit_interval(&self) -> Duration {
        self.limiter.interval()
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Fetch `path` with `params`, answering from the cache when possible.
    ///
    /// A cache hit never touches the rate limiter. On a miss exactly one GET
    /// is issued; non-2xx statuses become [`ClientError::Remote`] and bodies
    /// that are not JSON become [`ClientError::Decode`]. Failing to write the
    /// cache is logged and the payload is still returned.
    pub async fn fetch(&self, path: &str, params: &QueryParams) -> Result<Value, ClientError> {
        let fingerprint = RequestFingerprint::compute(path, params);

        if let CacheResult::Hit(payload) = self.cache.lookup(&fingerprint)? {
            return Ok(payload);
        }

        let response = {
            let permit = self.limiter.before_request().await;
            tracing::info!("GET {} ({} params)", path, params.len());
            let response = self.transport.get(path, params).await?;
            permit.complete();
            response
        };

        if !response.is_success() {
            tracing::debug!("{} answered with status {}", path, response.status);
            return Err(ClientError::Remote {
                status: response.status,
                body: response.body,
            });
        }

        let payload: Value = serde_json::from_str(&response.body)
            .map_err(|e| ClientError::Decode(format!("invalid JSON from {}: {}", path, e)))?;

        if let Err(e) = self.cache.store(&fingerprint, &payload, path, params) {
            tracing::warn!("Failed to cache response for {}: {}", path, e);
        }

        Ok(payload)
    }

    /// Run one notice search
    pub async fn search(&self, query: &ParamBuilder) -> Result<SearchData, ClientError> {
        if query.is_empty() {
            return Err(ClientError::EmptyQuery);
        }
        let payload = self.fetch(NOTICE_SEARCH_PATH, query.params()).await?;
        parse::parse_search(payload)
    }

    /// Fetch a single notice by id
    pub async fn get_notice(&self, id: u64) -> Result<Notice, ClientError> {
        let path = format!("/notices/{}.json", id);
        let payload = self.fetch(&path, &QueryParams::new()).await?;
        parse::parse_single_notice(&payload)
    }

    /// List every topic known to the service
    pub async fn get_topics(&self) -> Result<Vec<TopicRecord>, ClientError> {
        let payload = self.fetch(TOPICS_PATH, &QueryParams::new()).await?;
        parse::parse_topics(&payload)
    }

    /// Search senders, recipients and principals by name
    pub async fn search_entity(
        &self,
        name: &str,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<EntitySearch, ClientError> {
        if name.trim().is_empty() {
            return Err(ClientError::EmptyQuery);
        }

        let mut params = QueryParams::new();
        params.insert(keys::TERM, name);
        if let Some(page) = page {
            params.insert(keys::PAGE, page.to_string());
        }
        if let Some(per_page) = per_page {
            if per_page > MAX_PER_PAGE {
                return Err(ClientError::InvalidArgument(format!(
                    "requested {} entities per page, the maximum is {}",
                    per_page, MAX_PER_PAGE
                )));
            }
            params.insert(keys::PER_PAGE, per_page.to_string());
        }

        let payload = self.fetch(ENTITY_SEARCH_PATH, &params).await?;
        parse::parse_entities(payload)
    }
}
