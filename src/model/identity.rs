use anyhow::{Context, Result, bail};
use std::fmt;
use url::Url;

/// The two kinds of entity the crawler discovers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Repository,
    User,
}

impl EntityKind {
    /// Number of path segments in a canonical identity (`owner/name` vs `login`)
    fn segments(self) -> usize {
        match self {
            EntityKind::Repository => 2,
            EntityKind::User => 1,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Repository => f.write_str("repository"),
            EntityKind::User => f.write_str("user"),
        }
    }
}

/// Reduce a raw identity to its canonical, platform-relative form.
///
/// A scheme, or a first segment that looks like a host (`github.com/...`),
/// marks the input as a URL whose host is dropped. Path segments beyond the
/// canonical form are dropped in either case, so
/// `https://github.com/alice/proj/tree/main` and `alice/proj/tree/main` both
/// become `alice/proj`, and `https://github.com/alice` becomes `alice`. A
/// trailing `.git` on a repository name is removed.
pub fn canonicalize(kind: EntityKind, raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        bail!("empty {kind} identity");
    }

    let wanted = kind.segments();
    let has_scheme = trimmed.contains("://");
    let has_host = trimmed.split('/').next().is_some_and(|first| first.contains('.'));

    let mut segments: Vec<String> = if has_scheme || has_host {
        let with_scheme = if has_scheme {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        };
        let url = Url::parse(&with_scheme)
            .with_context(|| format!("invalid {kind} URL: {raw}"))?;
        url.path_segments()
            .map(|segs| segs.filter(|s| !s.is_empty()).take(wanted).map(str::to_string).collect())
            .unwrap_or_default()
    } else {
        trimmed.split('/').take(wanted).map(str::to_string).collect()
    };

    if segments.len() != wanted || segments.iter().any(|s| s.is_empty()) {
        bail!("invalid {kind} identity: {raw}");
    }
    if segments.iter().any(|s| s.chars().any(char::is_whitespace)) {
        bail!("{kind} identity contains whitespace: {raw}");
    }

    if kind == EntityKind::Repository {
        if let Some(name) = segments[1].strip_suffix(".git") {
            if name.is_empty() {
                bail!("invalid repository name: {raw}");
            }
            segments[1] = name.to_string();
        }
    }

    Ok(segments.join("/"))
}
