// Shared test fixtures for integration tests
// Functions here are used across different test files
#![allow(dead_code)]

use anyhow::{Result, anyhow};
use git2::{Repository, Signature};
use geoleak::github::Discovery;
use geoleak::repository::Database;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Create an in-memory test database with the schema in place
pub async fn create_test_db() -> Database {
    let db = Database::new(":memory:").await.unwrap();
    db.init_schema().await.unwrap();
    db
}

/// Create a file-backed test database in `dir`
pub async fn create_db_in_dir(dir: &TempDir) -> (Database, PathBuf) {
    let db_path = dir.path().join("frontier.db");
    let db = Database::new(db_path.to_str().unwrap()).await.unwrap();
    db.init_schema().await.unwrap();
    (db, db_path)
}

/// Scripted discovery: fixed contributor and repository listings, plus a
/// sequence of random seeds handed out in order
#[derive(Default)]
pub struct FakeDiscovery {
    pub contributors: HashMap<String, Vec<String>>,
    pub repositories: HashMap<String, Vec<String>>,
    pub seeds: Mutex<VecDeque<String>>,
    pub failing_users: Vec<String>,
    pub seed_calls: AtomicUsize,
    pub contributor_calls: AtomicUsize,
}

impl FakeDiscovery {
    pub fn with_contributors(mut self, repo: &str, logins: &[&str]) -> Self {
        self.contributors.insert(repo.to_string(), logins.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_repositories(mut self, user: &str, repos: &[&str]) -> Self {
        self.repositories.insert(user.to_string(), repos.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_seeds(self, seeds: &[&str]) -> Self {
        self.seeds.lock().unwrap().extend(seeds.iter().map(|s| s.to_string()));
        self
    }

    pub fn failing_user(mut self, user: &str) -> Self {
        self.failing_users.push(user.to_string());
        self
    }
}

impl Discovery for FakeDiscovery {
    async fn contributors(&self, repository: &str) -> Result<Vec<String>> {
        self.contributor_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.contributors.get(repository).cloned().unwrap_or_default())
    }

    async fn user_repositories(&self, user: &str) -> Result<Vec<String>> {
        if self.failing_users.iter().any(|u| u == user) {
            return Err(anyhow!("listing for {user} unavailable"));
        }
        Ok(self.repositories.get(user).cloned().unwrap_or_default())
    }

    async fn random_repository(&self) -> Result<Option<String>> {
        self.seed_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.seeds.lock().unwrap().pop_front())
    }
}

/// Discovery whose contributor listing never completes, so a worker stays
/// inside its cycle until cancelled
pub struct StallingDiscovery;

impl Discovery for StallingDiscovery {
    async fn contributors(&self, _repository: &str) -> Result<Vec<String>> {
        std::future::pending().await
    }

    async fn user_repositories(&self, _user: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn random_repository(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Create a temporary git repository at `<root>/<owner>/<name>`
pub fn create_test_repo(root: &Path, repository: &str) -> (PathBuf, Repository) {
    let repo_path = root.join(repository);
    std::fs::create_dir_all(&repo_path).unwrap();
    let repo = Repository::init(&repo_path).unwrap();

    // Configure git user for commits
    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Test User").unwrap();
    config.set_str("user.email", "test@example.com").unwrap();

    (repo_path, repo)
}

/// Add files to the repository and create a commit
pub fn add_commit(repo: &Repository, files: &[(&str, &[u8])], message: &str) -> git2::Oid {
    let sig = Signature::now("Test User", "test@example.com").unwrap();
    let mut index = repo.index().unwrap();

    for (path, content) in files {
        // Write file to working directory
        let full_path = repo.workdir().unwrap().join(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&full_path, content).unwrap();

        index.add_path(Path::new(path)).unwrap();
    }

    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();

    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents).unwrap()
}

/// Checkout template that copies `<fixtures>/{repo}` instead of cloning
pub fn copy_checkout_command(fixtures: &Path) -> String {
    format!("cp -R {}/{{repo}} {{dest}}", fixtures.display())
}

/// Extractor that prints the file itself, so fixture contents decide hits
pub const CAT_EXTRACTOR: &str = "cat {file}";

/// Fixture content recognized as carrying coordinates
pub const GPS_OUTPUT: &[u8] = b"GPS Latitude : 37 deg 46' 29.64\" N\nGPS Longitude : 122 deg 25' 9.85\" W\n";

/// Fixture content with a location tag but no coordinates
pub const TAG_ONLY_OUTPUT: &[u8] = b"GPS Version ID : 2.2.0.0\n";
