//! Integration tests for the Lumen client
//!
//! These tests run the request manager over the real reqwest transport
//! against a local mock server.

use lumen_client::api::{FetchStrategy, LaunchSpacing, PaginatedSearch, RequestManager};
use lumen_client::config::Config;
use lumen_client::models::{NoticeType, ParamBuilder, Topic};
use lumen_client::ClientError;
use mockito::{Matcher, Server};
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

const TOKEN: &str = "secret-token";
const USER_AGENT: &str = "lumen-test/1.0";

fn test_config(base_url: &str, cache_dir: Option<&Path>) -> Config {
    let mut config = Config::default();
    config.api.token = Some(TOKEN.to_string());
    config.api.base_url = base_url.to_string();
    config.api.user_agent = USER_AGENT.to_string();
    config.cache.enabled = cache_dir.is_some();
    config.cache.directory = cache_dir.map(Path::to_path_buf);
    config.rate_limits.interval_ms = 10;
    config
}

fn search_body(page: u64, count: u64) -> String {
    let notices: Vec<_> = (0..count)
        .map(|i| {
            json!({
                "id": page * 100 + i,
                "title": format!("Notice {}", page * 100 + i),
                "type": "DMCA",
                "topics": ["Copyright"],
                "works": [{
                    "description": "A film",
                    "infringing_urls": [{"url": "https://files.example/x"}]
                }]
            })
        })
        .collect();
    json!({
        "notices": notices,
        "meta": {
            "current_page": page,
            "per_page": count,
            "total_entries": 1000,
            "facets": {
                "sender_name_facet": {"buckets": [{"key": "Studio", "doc_count": 9}]}
            }
        }
    })
    .to_string()
}

#[tokio::test]
async fn test_search_sends_credentials_and_encoded_params() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/notices/search.json")
        .match_header("x-authentication-token", TOKEN)
        .match_header("user-agent", USER_AGENT)
        .match_query(Matcher::AllOf(vec![
            Matcher::Regex("term=fan\\+fiction".to_string()),
            Matcher::UrlEncoded("term-require-all".to_string(), "true".to_string()),
            Matcher::UrlEncoded("sender_name".to_string(), "Big Studio".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(search_body(1, 2))
        .expect(1)
        .create_async()
        .await;

    let manager = RequestManager::from_config(&test_config(&server.url(), None)).unwrap();
    let query = ParamBuilder::new()
        .with_query("fan fiction", Some(true))
        .with_sender("Big Studio", None);

    let data = manager.search(&query).await.unwrap();

    mock.assert_async().await;
    assert_eq!(data.notices.len(), 2);
    assert_eq!(data.notices[0].notice_type, Some(NoticeType::Dmca));
    assert_eq!(data.notices[0].topics, vec![Topic::Copyright]);
    assert_eq!(data.notices[0].infringing_urls.get("files.example"), Some(&1));
    assert_eq!(data.metadata.senders[0].name, "Studio");
    assert_eq!(data.page_info.total_entries, Some(1000));
}

#[tokio::test]
async fn test_repeated_search_hits_cache() {
    let temp_dir = TempDir::new().unwrap();
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/notices/search.json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(search_body(1, 3))
        .expect(1)
        .create_async()
        .await;

    let config = test_config(&server.url(), Some(temp_dir.path()));
    let manager = RequestManager::from_config(&config).unwrap();
    let first = ParamBuilder::new()
        .with_query("movie", None)
        .with_amount(3)
        .unwrap();
    let reordered = ParamBuilder::new()
        .with_amount(3)
        .unwrap()
        .with_query("movie", None);

    let a = manager.search(&first).await.unwrap();
    let b = manager.search(&reordered).await.unwrap();

    mock.assert_async().await;
    assert_eq!(a, b);
    assert_eq!(manager.cache_stats().entry_count, 1);

    // A fresh manager over the same directory still finds the entry
    let fresh = RequestManager::from_config(&config).unwrap();
    fresh.search(&first).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_disabled_cache_fetches_every_time() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/topics.json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"topics": [{"id": 1, "name": "Copyright", "parent_id": null}]}"#)
        .expect(2)
        .create_async()
        .await;

    let manager = RequestManager::from_config(&test_config(&server.url(), None)).unwrap();
    manager.get_topics().await.unwrap();
    let topics = manager.get_topics().await.unwrap();

    mock.assert_async().await;
    assert_eq!(topics[0].name, "Copyright");
}

#[tokio::test]
async fn test_not_found_is_remote_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/notices/999.json")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body("Not Found")
        .create_async()
        .await;

    let manager = RequestManager::from_config(&test_config(&server.url(), None)).unwrap();
    let err = manager.get_notice(999).await.unwrap_err();

    match err {
        ClientError::Remote { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "Not Found");
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_json_is_decode_error() {
    let temp_dir = TempDir::new().unwrap();
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/topics.json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("{\"topics\": [")
        .create_async()
        .await;

    let manager =
        RequestManager::from_config(&test_config(&server.url(), Some(temp_dir.path()))).unwrap();
    let err = manager.get_topics().await.unwrap_err();

    assert!(matches!(err, ClientError::Decode(_)));
    assert_eq!(manager.cache_stats().entry_count, 0);
}

#[tokio::test]
async fn test_get_notice() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/notices/42.json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            json!({"court_order": {
                "id": 42,
                "title": "Court order to Google",
                "topics": ["Defamation", "Something New"],
                "works": [{"description": "Blog post  \n", "infringing_urls": []}]
            }})
            .to_string(),
        )
        .create_async()
        .await;

    let manager = RequestManager::from_config(&test_config(&server.url(), None)).unwrap();
    let notice = manager.get_notice(42).await.unwrap();

    assert_eq!(notice.notice_type, Some(NoticeType::CourtOrder));
    assert_eq!(notice.topics, vec![Topic::Defamation]);
    assert_eq!(notice.unrecognized_topics, vec!["Something New"]);
    assert_eq!(notice.works, vec!["Blog post"]);
}

#[tokio::test]
async fn test_search_entity() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/entities/search.json")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("term".to_string(), "Google LLC".to_string()),
            Matcher::UrlEncoded("per_page".to_string(), "5".to_string()),
        ]))
        .with_status(200)
        .with_body(r#"{"entities": [{"id": 3, "name": "Google LLC", "kind": "organization"}], "meta": {"total_entries": 1}}"#)
        .create_async()
        .await;

    let manager = RequestManager::from_config(&test_config(&server.url(), None)).unwrap();
    let result = manager.search_entity("Google LLC", None, Some(5)).await.unwrap();

    mock.assert_async().await;
    assert_eq!(result.entities.len(), 1);
    assert_eq!(result.page_info.total_entries, Some(1));
}

#[tokio::test]
async fn test_paginated_search_over_http() {
    let mut server = Server::new_async().await;
    let mut mocks = Vec::new();
    for page in 1..=3u64 {
        let mock = server
            .mock("GET", "/notices/search.json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("term".to_string(), "Skinamarink".to_string()),
                Matcher::UrlEncoded("page".to_string(), page.to_string()),
            ]))
            .with_status(200)
            .with_body(search_body(page, 10))
            .expect(1)
            .create_async()
            .await;
        mocks.push(mock);
    }

    let manager = RequestManager::from_config(&test_config(&server.url(), None)).unwrap();
    let notices = PaginatedSearch::new(ParamBuilder::new().with_query("Skinamarink", None))
        .with_amount_per_page(10)
        .unwrap()
        .with_page_range(1, 3)
        .unwrap()
        .with_strategy(FetchStrategy::Concurrent(LaunchSpacing::RateLimitInterval))
        .search(&manager)
        .await
        .unwrap();

    for mock in &mocks {
        mock.assert_async().await;
    }
    let ids: Vec<_> = notices.iter().filter_map(|n| n.id).collect();
    let expected: Vec<u64> = (1..=3u64)
        .flat_map(|page| (0..10).map(move |i| page * 100 + i))
        .collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_paginated_search_fails_on_bad_page() {
    let mut server = Server::new_async().await;
    let mut ok_pages = Vec::new();
    for page in ["1", "3"] {
        let mock = server
            .mock("GET", "/notices/search.json")
            .match_query(Matcher::UrlEncoded("page".to_string(), page.to_string()))
            .with_status(200)
            .with_body(search_body(1, 10))
            .create_async()
            .await;
        ok_pages.push(mock);
    }
    let _broken = server
        .mock("GET", "/notices/search.json")
        .match_query(Matcher::UrlEncoded("page".to_string(), "2".to_string()))
        .with_status(502)
        .with_body("Bad Gateway")
        .create_async()
        .await;

    let manager = RequestManager::from_config(&test_config(&server.url(), None)).unwrap();
    let result = PaginatedSearch::new(ParamBuilder::new().with_query("movie", None))
        .with_page_range(1, 3)
        .unwrap()
        .with_strategy(FetchStrategy::Sequential)
        .search(&manager)
        .await;

    assert_eq!(result.unwrap_err().status(), Some(502));
}

#[test]
fn test_missing_token() {
    let mut config = test_config("http://localhost", None);
    config.api.token = None;
    assert!(matches!(
        RequestManager::from_config(&config),
        Err(ClientError::MissingToken)
    ));
}
