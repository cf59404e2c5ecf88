//! HTTP transport backed by reqwest.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use std::sync::Arc;
use url::Url;

use super::{ClientError, Transport, TransportResponse};
use crate::models::QueryParams;

/// Production host of the notice database
pub const DEFAULT_BASE_URL: &str = "https://lumendatabase.org";

/// Header carrying the caller's API token
const AUTH_HEADER: &str = "x-authentication-token";

/// Default user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP transport with authentication and user agent preset.
///
/// No request timeout is applied beyond reqwest's defaults. Gzip, brotli
/// and deflate responses are accepted and decoded transparently.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Arc<Client>,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport against the production host
    pub fn new(token: &str) -> Result<Self, ClientError> {
        Self::with_options(token, DEFAULT_BASE_URL, DEFAULT_USER_AGENT)
    }

    /// Create a transport with a custom base URL and user agent
    pub fn with_options(token: &str, base_url: &str, user_agent: &str) -> Result<Self, ClientError> {
        if token.is_empty() {
            return Err(ClientError::MissingToken);
        }

        let mut headers = HeaderMap::new();
        let mut token = HeaderValue::from_str(token)
            .map_err(|e| ClientError::Config(format!("invalid token header: {}", e)))?;
        token.set_sensitive(true);
        headers.insert(AUTH_HEADER, token);

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .gzip(true)
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Full request URL with form-encoded parameters
    pub fn request_url(&self, path: &str, params: &QueryParams) -> Result<Url, ClientError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| ClientError::Config(format!("invalid request URL: {}", e)))?;
        if !params.is_empty() {
            url.set_query(Some(&params.to_query_string()));
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str, params: &QueryParams) -> Result<TransportResponse, ClientError> {
        let url = self.request_url(path, params)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::Network(format!("Failed to request {}: {}", path, e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Network(format!("Failed to read body of {}: {}", path, e)))?;

        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ParamBuilder;

    #[test]
    fn test_empty_token_rejected() {
        assert!(matches!(
            HttpTransport::new(""),
            Err(ClientError::MissingToken)
        ));
    }

    #[test]
    fn test_request_url_encoding() {
        let transport =
            HttpTransport::with_options("token", "https://example.org/", "agent").unwrap();
        let params = ParamBuilder::new()
            .with_query("fan fiction", Some(true))
            .into_params();

        let url = transport
            .request_url("/notices/search.json", &params)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.org/notices/search.json?term=fan+fiction&term-require-all=true"
        );
    }

    #[test]
    fn test_request_url_without_params() {
        let transport = HttpTransport::with_options("token", "https://example.org", "agent").unwrap();
        let url = transport
            .request_url("/topics.json", &QueryParams::new())
            .unwrap();
        assert_eq!(url.as_str(), "https://example.org/topics.json");
    }
}
