//! Frontier discovery algorithm
//!
//! Repositories are served from the repository queue first. When it runs dry
//! a queued user is expanded into their repositories, and when both queues are
//! empty the platform's global listing seeds a random repository. The seed
//! fallback keeps the frontier from ever being permanently empty, so the loop
//! only ends with a repository or with cancellation.

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::github::Discovery;
use crate::model::EntityKind;

use super::store::Frontier;

const LOG_TARGET: &str = "frontier";

/// Produce the next repository to visit, expanding the frontier as needed.
///
/// Returns `None` only when `cancel` fires. A user popped for expansion is
/// requeued if cancellation interrupts the expansion.
pub async fn pop_repo<F, D>(frontier: &F, discovery: &D, cancel: &CancellationToken) -> Result<Option<String>>
where
    F: Frontier,
    D: Discovery,
{
    loop {
        if cancel.is_cancelled() {
            return Ok(None);
        }

        if let Some(repo) = frontier.pop(EntityKind::Repository).await? {
            return Ok(Some(repo));
        }

        match frontier.pop(EntityKind::User).await? {
            Some(user) => expand_user(frontier, discovery, &user, cancel).await?,
            None => seed_random(frontier, discovery, cancel).await?,
        }
    }
}

async fn expand_user<F: Frontier, D: Discovery>(
    frontier: &F,
    discovery: &D,
    user: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    let repos = tokio::select! {
        _ = cancel.cancelled() => {
            frontier.requeue(EntityKind::User, user).await?;
            return Ok(());
        }
        repos = discovery.user_repositories(user) => repos,
    };

    match repos {
        Ok(repos) => {
            let queued = frontier.push_many(EntityKind::Repository, &repos).await?;
            log::info!(target: LOG_TARGET, "Expanded user {user}: {queued} new of {} repositories", repos.len());
        }
        Err(e) => log::warn!(target: LOG_TARGET, "Could not expand user {user}: {e:#}"),
    }
    Ok(())
}

async fn seed_random<F: Frontier, D: Discovery>(
    frontier: &F,
    discovery: &D,
    cancel: &CancellationToken,
) -> Result<()> {
    let seed = tokio::select! {
        _ = cancel.cancelled() => return Ok(()),
        seed = discovery.random_repository() => seed,
    };

    match seed {
        Ok(Some(repo)) => {
            if frontier.push(EntityKind::Repository, &repo).await? {
                log::info!(target: LOG_TARGET, "Seeded frontier with {repo}");
            } else {
                log::debug!(target: LOG_TARGET, "Random seed {repo} was already seen");
            }
        }
        Ok(None) => log::debug!(target: LOG_TARGET, "Random listing page was empty"),
        Err(e) => log::warn!(target: LOG_TARGET, "Random seeding failed: {e:#}"),
    }
    Ok(())
}

/// Push a repository's contributors onto the user queue.
///
/// Failures are logged and absorbed; the repository is still scanned.
pub async fn expand_contributors<F: Frontier, D: Discovery>(frontier: &F, discovery: &D, repository: &str) -> Result<usize> {
    match discovery.contributors(repository).await {
        Ok(logins) => {
            let queued = frontier.push_many(EntityKind::User, &logins).await?;
            log::debug!(target: LOG_TARGET, "{repository}: {queued} new of {} contributors", logins.len());
            Ok(queued)
        }
        Err(e) => {
            log::warn!(target: LOG_TARGET, "Could not list contributors of {repository}: {e:#}");
            Ok(0)
        }
    }
}
