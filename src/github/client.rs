//! GitHub API client
//!
//! Minimal read-only client for the three listing endpoints the crawler uses.
//! Throttled requests are never surfaced: the client rotates its network
//! identity and retries until the request succeeds.

use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;

use super::rotation::IdentityRotator;

const LOG_TARGET: &str = "github";

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// The platform's default page size for list endpoints
pub const DEFAULT_PER_PAGE: u32 = 30;

const USER_AGENT: &str = concat!("geoleak/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>,
    /// Page size for contributor and user-repository listings
    pub per_page: u32,
    /// Pause after a failed rotation before the next attempt
    pub retry_delay: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token: None,
            per_page: DEFAULT_PER_PAGE,
            retry_delay: Duration::from_secs(5),
        }
    }
}

/// Read endpoints consumed by discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `owner/name` -> contributor logins
    Contributors,
    /// `login` -> repositories owned by the user
    UserRepositories,
    /// listing offset -> one page of the global repository listing
    Listing,
}

impl Endpoint {
    fn path(self, param: &str, per_page: u32) -> String {
        match self {
            Endpoint::Contributors => format!("/repos/{param}/contributors?per_page={per_page}"),
            Endpoint::UserRepositories => format!("/users/{param}/repos?per_page={per_page}"),
            Endpoint::Listing => format!("/repositories?since={param}"),
        }
    }
}

/// Request client that hides rate limiting behind identity rotation.
///
/// One lock covers "request, and if throttled rotate and retry", so workers
/// sharing a client never rotate concurrently or observe a half-rotated
/// egress address.
pub struct ApiClient<R> {
    client: reqwest::Client,
    config: ApiConfig,
    rotator: R,
    gate: Mutex<()>,
}

impl<R: IdentityRotator> ApiClient<R> {
    pub fn new(config: ApiConfig, rotator: R) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));

        if let Some(token) = &config.token {
            let mut auth = HeaderValue::from_str(&format!("token {token}"))
                .context("GitHub token is not a valid header value")?;
            auth.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth);
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, config, rotator, gate: Mutex::new(()) })
    }

    pub fn rotator(&self) -> &R {
        &self.rotator
    }

    /// GET an endpoint and return its JSON document.
    ///
    /// Loops until the platform answers: throttling, server errors and
    /// transport failures all trigger a rotation and a retry. A missing
    /// resource (404/410), a legal block (451) or an empty listing (204) yields an empty array.
    /// Only an undecodable success body is returned as an error.
    pub async fn fetch(&self, endpoint: Endpoint, param: &str) -> Result<Value> {
        let url = format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.path(param, self.config.per_page)
        );

        let _guard = self.gate.lock().await;
        let mut attempt: u64 = 0;

        loop {
            attempt += 1;
            match self.client.get(&url).send().await {
                Ok(resp) => match resp.status() {
                    StatusCode::NO_CONTENT => return Ok(Value::Array(Vec::new())),
                    // Permanent refusals: retrying would hold the gate forever
                    StatusCode::NOT_FOUND | StatusCode::GONE | StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS => {
                        log::debug!(target: LOG_TARGET, "{url} is unavailable ({})", resp.status());
                        return Ok(Value::Array(Vec::new()));
                    }
                    status if status.is_success() => {
                        return resp
                            .json::<Value>()
                            .await
                            .with_context(|| format!("Invalid JSON from {url}"));
                    }
                    status => {
                        log::warn!(target: LOG_TARGET, "GET {url} returned {status} (attempt {attempt}), rotating identity");
                    }
                },
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "GET {url} failed (attempt {attempt}): {e}, rotating identity");
                }
            }

            if let Err(e) = self.rotator.rotate().await {
                log::warn!(target: LOG_TARGET, "Identity rotation failed: {e:#}");
                tokio::time::sleep(self.config.retry_delay).await;
            }
        }
    }
}
