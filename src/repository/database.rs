use anyhow::{Context, Result, bail};
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Pool, Row, Sqlite, Transaction};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::model::{EntityKind, FrontierStats, Hit, canonicalize};

use super::schema::{self, EntityTable, SCHEMA_VERSION};

const LOG_TARGET: &str = "database";

/// The store exists but was not created by this version of the crawler
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("unexpected table set: found [{}], expected [{}]", found.join(", "), expected.join(", "))]
    TableMismatch { found: Vec<String>, expected: Vec<String> },

    #[error("schema version {found} does not match expected version {expected}")]
    VersionMismatch { found: i64, expected: i64 },
}

/// SQLite-backed frontier: entity tables, their FIFO queues and hits.
///
/// Every check-then-act sequence runs inside one transaction, so concurrent
/// workers never create duplicate entities or pop the same queue entry.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection
    pub async fn new(db_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", db_path))?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(30));

        // One connection: transactions from different workers serialize on it
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        Ok(Self { pool })
    }

    /// Create the schema on first use or validate it on later runs.
    ///
    /// Returns true if the tables were created. A store holding any other
    /// table set, or another schema version, fails with [`SchemaError`].
    pub async fn init_schema(&self) -> Result<bool> {
        let found: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
        )
        .fetch_all(&self.pool)
        .await?;

        if found.is_empty() {
            let mut tx = self.pool.begin().await?;
            for ddl in schema::create_statements() {
                sqlx::query(&ddl).execute(&mut *tx).await?;
            }
            sqlx::query(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            log::info!(target: LOG_TARGET, "Created frontier schema (version {SCHEMA_VERSION})");
            return Ok(true);
        }

        let expected = schema::expected_tables();
        if found != expected {
            return Err(SchemaError::TableMismatch {
                found,
                expected: expected.into_iter().map(str::to_string).collect(),
            }
            .into());
        }

        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await?;
        if version != SCHEMA_VERSION {
            return Err(SchemaError::VersionMismatch { found: version, expected: SCHEMA_VERSION }.into());
        }

        Ok(false)
    }

    /// Queue an identity unless it has been seen before.
    ///
    /// Returns true if a new entity (and queue entry) was created.
    pub async fn push(&self, kind: EntityKind, identity: &str) -> Result<bool> {
        let name = canonicalize(kind, identity)?;
        let mut tx = self.pool.begin().await?;
        let queued = Self::push_in_tx(&mut tx, kind.table(), &name).await?;
        tx.commit().await?;
        if queued {
            log::debug!(target: LOG_TARGET, "Queued {kind} {name}");
        }
        Ok(queued)
    }

    /// Queue a batch of identities in one transaction.
    ///
    /// Identities that fail canonicalization are logged and skipped. Returns
    /// the number of newly queued entities.
    pub async fn push_many<S: AsRef<str>>(&self, kind: EntityKind, identities: &[S]) -> Result<usize> {
        let table = kind.table();
        let mut tx = self.pool.begin().await?;
        let mut queued = 0;

        for raw in identities {
            let name = match canonicalize(kind, raw.as_ref()) {
                Ok(name) => name,
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "Skipping {kind}: {e:#}");
                    continue;
                }
            };
            if Self::push_in_tx(&mut tx, table, &name).await? {
                queued += 1;
            }
        }

        tx.commit().await?;
        Ok(queued)
    }

    async fn push_in_tx(tx: &mut Transaction<'_, Sqlite>, table: &EntityTable, name: &str) -> Result<bool> {
        let inserted = sqlx::query(&table.insert_entity_sql())
            .bind(name)
            .execute(&mut **tx)
            .await?;

        // Already seen: first discovery wins
        if inserted.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(&table.enqueue_by_id_sql())
            .bind(inserted.last_insert_rowid())
            .execute(&mut **tx)
            .await?;
        Ok(true)
    }

    /// Remove the oldest queue entry and return its identity
    pub async fn pop(&self, kind: EntityKind) -> Result<Option<String>> {
        let table = kind.table();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&table.peek_oldest_sql())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let entry_id: i64 = row.get("entry_id");
        let identity: String = row.get("identity");

        sqlx::query(&table.delete_entry_sql())
            .bind(entry_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Some(identity))
    }

    /// Put an already-known identity back on its queue
    pub async fn requeue(&self, kind: EntityKind, identity: &str) -> Result<()> {
        let result = sqlx::query(&kind.table().enqueue_by_key_sql())
            .bind(identity)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            bail!("cannot requeue unknown {kind} {identity}");
        }
        log::info!(target: LOG_TARGET, "Requeued {kind} {identity}");
        Ok(())
    }

    /// Whether an identity has ever been seen, queued or not
    pub async fn is_seen(&self, kind: EntityKind, identity: &str) -> Result<bool> {
        let name = canonicalize(kind, identity)?;
        let row = sqlx::query(&kind.table().exists_sql())
            .bind(&name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn queue_len(&self, kind: EntityKind) -> Result<u64> {
        self.count(kind.table().queue).await
    }

    /// Record a hit; duplicates of the same (repository, path) are ignored.
    ///
    /// Returns true if a new row was written.
    pub async fn record_hit(&self, repository: &str, path: &str) -> Result<bool> {
        let result = sqlx::query(&schema::insert_hit_sql())
            .bind(path)
            .bind(repository)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// All hits in the order they were recorded
    pub async fn hits(&self) -> Result<Vec<Hit>> {
        let rows = sqlx::query(&schema::select_hits_sql())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|row| Hit {
            repository: row.get("repository"),
            path: row.get("path"),
        }).collect())
    }

    pub async fn stats(&self) -> Result<FrontierStats> {
        Ok(FrontierStats {
            repositories: self.count(schema::REPOSITORIES.table).await?,
            users: self.count(schema::USERS.table).await?,
            queued_repositories: self.count(schema::REPOSITORIES.queue).await?,
            queued_users: self.count(schema::USERS.queue).await?,
            hits: self.count(schema::HITS).await?,
        })
    }

    async fn count(&self, table: &str) -> Result<u64> {
        let n: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }
}
