//! Discovery strategies backed by the GitHub API

use anyhow::{Context, Result};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::future::Future;

use super::client::{ApiClient, Endpoint};
use super::rotation::IdentityRotator;

const LOG_TARGET: &str = "discovery";

/// Highest repository id used as a random listing offset by default
pub const DEFAULT_MAX_LISTING_ID: u64 = 700_000_000;

/// Sources of new frontier entries.
///
/// Returned identities are raw; the frontier canonicalizes them on push.
pub trait Discovery: Send + Sync {
    /// Contributor logins of a repository
    fn contributors(&self, repository: &str) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Repositories owned by a user, at most one page
    fn user_repositories(&self, user: &str) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// One arbitrary repository from the platform, if the listing was not empty
    fn random_repository(&self) -> impl Future<Output = Result<Option<String>>> + Send;
}

#[derive(Debug, Deserialize)]
struct Contributor {
    /// Anonymous contributors carry no login
    #[serde(default)]
    login: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwnedRepository {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct ListedRepository {
    html_url: String,
}

pub struct GithubDiscovery<R> {
    api: ApiClient<R>,
    max_listing_id: u64,
}

impl<R: IdentityRotator> GithubDiscovery<R> {
    pub fn new(api: ApiClient<R>, max_listing_id: u64) -> Self {
        Self { api, max_listing_id }
    }
}

impl<R: IdentityRotator> Discovery for GithubDiscovery<R> {
    async fn contributors(&self, repository: &str) -> Result<Vec<String>> {
        let doc = self.api.fetch(Endpoint::Contributors, repository).await?;
        let contributors: Vec<Contributor> = serde_json::from_value(doc)
            .with_context(|| format!("Unexpected contributor listing for {repository}"))?;
        Ok(contributors.into_iter().filter_map(|c| c.login).collect())
    }

    async fn user_repositories(&self, user: &str) -> Result<Vec<String>> {
        let doc = self.api.fetch(Endpoint::UserRepositories, user).await?;
        let repos: Vec<OwnedRepository> = serde_json::from_value(doc)
            .with_context(|| format!("Unexpected repository listing for {user}"))?;
        Ok(repos.into_iter().map(|r| r.full_name).collect())
    }

    async fn random_repository(&self) -> Result<Option<String>> {
        let since = rand::thread_rng().gen_range(0..=self.max_listing_id);
        log::debug!(target: LOG_TARGET, "Sampling global listing at offset {since}");

        let doc = self.api.fetch(Endpoint::Listing, &since.to_string()).await?;
        let page: Vec<ListedRepository> = serde_json::from_value(doc)
            .context("Unexpected global repository listing")?;

        Ok(page.choose(&mut rand::thread_rng()).map(|r| r.html_url.clone()))
    }
}
