//! Database implementation of Frontier

use anyhow::Result;

use crate::model::EntityKind;
use crate::repository::Database;

use super::store::Frontier;

impl Frontier for Database {
    async fn push(&self, kind: EntityKind, identity: &str) -> Result<bool> {
        Database::push(self, kind, identity).await
    }

    async fn push_many(&self, kind: EntityKind, identities: &[String]) -> Result<usize> {
        Database::push_many(self, kind, identities).await
    }

    async fn pop(&self, kind: EntityKind) -> Result<Option<String>> {
        Database::pop(self, kind).await
    }

    async fn requeue(&self, kind: EntityKind, identity: &str) -> Result<()> {
        Database::requeue(self, kind, identity).await
    }

    async fn record_hit(&self, repository: &str, path: &str) -> Result<bool> {
        Database::record_hit(self, repository, path).await
    }
}
