//! Frontier store trait for persistence abstraction
//!
//! Decouples the discovery and worker logic from database implementation details.

use anyhow::Result;
use std::future::Future;

use crate::model::EntityKind;

/// Persistent, deduplicating FIFO queues of repositories and users.
///
/// Implementations must make each operation atomic: a push checks "seen" and
/// inserts in one step, a pop selects and deletes in one step.
pub trait Frontier: Send + Sync {
    /// Queue an identity unless it was ever seen; true if newly queued
    fn push(&self, kind: EntityKind, identity: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Queue several identities; returns how many were new
    fn push_many(&self, kind: EntityKind, identities: &[String]) -> impl Future<Output = Result<usize>> + Send;

    /// Remove and return the oldest queued identity
    fn pop(&self, kind: EntityKind) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Queue a known identity again without the seen check
    fn requeue(&self, kind: EntityKind, identity: &str) -> impl Future<Output = Result<()>> + Send;

    /// Record a hit once per (repository, path); true if new
    fn record_hit(&self, repository: &str, path: &str) -> impl Future<Output = Result<bool>> + Send;
}
