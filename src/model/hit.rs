/// A file inside a scanned repository whose metadata carried GPS coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    /// Canonical `owner/name` of the repository
    pub repository: String,
    /// Path of the file relative to the repository root
    pub path: String,
}

impl Hit {
    pub fn new(repository: impl Into<String>, path: impl Into<String>) -> Self {
        Self { repository: repository.into(), path: path.into() }
    }
}

/// Row counts of the persistent frontier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrontierStats {
    pub repositories: u64,
    pub users: u64,
    pub queued_repositories: u64,
    pub queued_users: u64,
    pub hits: u64,
}
