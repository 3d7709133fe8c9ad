// Request client integration tests
// Runs the API client and GitHub discovery against a wiremock server

use anyhow::Result;
use geoleak::github::{ApiClient, ApiConfig, Discovery, Endpoint, GithubDiscovery, IdentityRotator};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Rotator that counts calls and lifts the server-side throttle
struct CountingRotator {
    calls: AtomicUsize,
    throttled: Arc<AtomicBool>,
    delay: Duration,
}

impl CountingRotator {
    fn new(throttled: Arc<AtomicBool>) -> Self {
        Self { calls: AtomicUsize::new(0), throttled, delay: Duration::from_millis(50) }
    }
}

impl IdentityRotator for CountingRotator {
    async fn rotate(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.throttled.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Answers 403 while the throttle flag is set, otherwise a fixed body
struct Throttle {
    throttled: Arc<AtomicBool>,
    body: serde_json::Value,
}

impl Respond for Throttle {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        if self.throttled.load(Ordering::SeqCst) {
            ResponseTemplate::new(403).set_body_string("API rate limit exceeded")
        } else {
            ResponseTemplate::new(200).set_body_json(self.body.clone())
        }
    }
}

fn config_for(server: &MockServer) -> ApiConfig {
    ApiConfig {
        base_url: server.uri(),
        retry_delay: Duration::from_millis(10),
        ..ApiConfig::default()
    }
}

#[tokio::test]
async fn test_fetch_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/alice/proj/contributors"))
        .and(query_param("per_page", "30"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"login": "alice"}])))
        .expect(1)
        .mount(&server)
        .await;

    let throttled = Arc::new(AtomicBool::new(false));
    let client = ApiClient::new(config_for(&server), CountingRotator::new(throttled)).unwrap();

    let doc = client.fetch(Endpoint::Contributors, "alice/proj").await.unwrap();
    assert_eq!(doc, json!([{"login": "alice"}]));
}

#[tokio::test]
async fn test_token_sent_as_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/alice/repos"))
        .and(header("authorization", "token secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let config = ApiConfig { token: Some("secret".to_string()), ..config_for(&server) };
    let client = ApiClient::new(config, CountingRotator::new(Arc::new(AtomicBool::new(false)))).unwrap();

    let doc = client.fetch(Endpoint::UserRepositories, "alice").await.unwrap();
    assert_eq!(doc, json!([]));
}

#[tokio::test]
async fn test_throttled_request_rotates_and_retries() {
    let server = MockServer::start().await;
    let throttled = Arc::new(AtomicBool::new(true));
    Mock::given(method("GET"))
        .and(path("/users/alice/repos"))
        .respond_with(Throttle { throttled: Arc::clone(&throttled), body: json!([{"full_name": "alice/proj"}]) })
        .mount(&server)
        .await;

    let rotator = CountingRotator::new(Arc::clone(&throttled));
    let client = ApiClient::new(config_for(&server), rotator).unwrap();

    let doc = client.fetch(Endpoint::UserRepositories, "alice").await.unwrap();
    assert_eq!(doc, json!([{"full_name": "alice/proj"}]));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn test_concurrent_fetches_rotate_once() {
    let server = MockServer::start().await;
    let throttled = Arc::new(AtomicBool::new(true));
    Mock::given(method("GET"))
        .respond_with(Throttle { throttled: Arc::clone(&throttled), body: json!([]) })
        .mount(&server)
        .await;

    let client = Arc::new(ApiClient::new(config_for(&server), CountingRotator::new(throttled)).unwrap());

    let mut tasks = Vec::new();
    for i in 0..8 {
        let client = Arc::clone(&client);
        tasks.push(tokio::spawn(async move {
            client.fetch(Endpoint::UserRepositories, &format!("user{i}")).await
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), json!([]));
    }

    // Waiting callers retry after the first rotation instead of rotating again
    assert_eq!(client.rotator().calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_resource_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/ghost/gone/contributors"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/alice/empty/contributors"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let throttled = Arc::new(AtomicBool::new(false));
    let client = ApiClient::new(config_for(&server), CountingRotator::new(throttled)).unwrap();

    assert_eq!(client.fetch(Endpoint::Contributors, "ghost/gone").await.unwrap(), json!([]));
    assert_eq!(client.fetch(Endpoint::Contributors, "alice/empty").await.unwrap(), json!([]));
    assert_eq!(client.rotator().calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_legal_block_is_empty_without_rotation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/blocked/repo/contributors"))
        .respond_with(ResponseTemplate::new(451))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(config_for(&server), CountingRotator::new(Arc::new(AtomicBool::new(false)))).unwrap();

    assert_eq!(client.fetch(Endpoint::Contributors, "blocked/repo").await.unwrap(), json!([]));
    assert_eq!(client.rotator().calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalid_json_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let client = ApiClient::new(config_for(&server), CountingRotator::new(Arc::new(AtomicBool::new(false)))).unwrap();
    assert!(client.fetch(Endpoint::Listing, "0").await.is_err());
}

#[tokio::test]
async fn test_discovery_parses_listings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/alice/proj/contributors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"login": "alice", "contributions": 12},
            {"type": "Anonymous", "email": "x@example.com", "contributions": 1},
            {"login": "bob", "contributions": 3}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/bob/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"full_name": "bob/one"},
            {"full_name": "bob/two"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repositories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 26, "html_url": "https://github.com/mojombo/grit"}
        ])))
        .mount(&server)
        .await;

    let api = ApiClient::new(config_for(&server), CountingRotator::new(Arc::new(AtomicBool::new(false)))).unwrap();
    let discovery = GithubDiscovery::new(api, 1000);

    assert_eq!(discovery.contributors("alice/proj").await.unwrap(), vec!["alice", "bob"]);
    assert_eq!(discovery.user_repositories("bob").await.unwrap(), vec!["bob/one", "bob/two"]);
    assert_eq!(
        discovery.random_repository().await.unwrap().as_deref(),
        Some("https://github.com/mojombo/grit")
    );
}

#[tokio::test]
async fn test_empty_listing_page_yields_no_seed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repositories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let api = ApiClient::new(config_for(&server), CountingRotator::new(Arc::new(AtomicBool::new(false)))).unwrap();
    let discovery = GithubDiscovery::new(api, 1000);

    assert_eq!(discovery.random_repository().await.unwrap(), None);
}
