//! Typed schema of the persistent frontier
//!
//! Every table and column name used in SQL lives here; queries are built from
//! these definitions instead of string literals scattered through the store.

use crate::model::EntityKind;

/// Stored in `PRAGMA user_version`; bump when the table layout changes.
pub const SCHEMA_VERSION: i64 = 1;

/// A discovered entity table paired with its FIFO queue table
#[derive(Debug)]
pub struct EntityTable {
    /// Entity table; a row here is the permanent "seen" record
    pub table: &'static str,
    /// Unique canonical identity column
    pub key: &'static str,
    /// Queue table; a row here means "pending visit"
    pub queue: &'static str,
    /// Queue column referencing `table.id`
    pub queue_ref: &'static str,
}

pub const REPOSITORIES: EntityTable = EntityTable {
    table: "repository",
    key: "name",
    queue: "repository_queue",
    queue_ref: "repository_id",
};

pub const USERS: EntityTable = EntityTable {
    table: "user",
    key: "login",
    queue: "user_queue",
    queue_ref: "user_id",
};

/// Hit table and columns
pub const HITS: &str = "hit";
pub const HIT_REPOSITORY: &str = "repository_id";
pub const HIT_PATH: &str = "path";

impl EntityKind {
    pub fn table(self) -> &'static EntityTable {
        match self {
            EntityKind::Repository => &REPOSITORIES,
            EntityKind::User => &USERS,
        }
    }
}

impl EntityTable {
    pub fn create_entity_sql(&self) -> String {
        format!(
            "CREATE TABLE {} (id INTEGER PRIMARY KEY AUTOINCREMENT, {} TEXT NOT NULL UNIQUE)",
            self.table, self.key
        )
    }

    pub fn create_queue_sql(&self) -> String {
        format!(
            "CREATE TABLE {} (id INTEGER PRIMARY KEY AUTOINCREMENT, {} INTEGER NOT NULL REFERENCES {}(id))",
            self.queue, self.queue_ref, self.table
        )
    }

    /// Insert an entity unless its identity is already known
    pub fn insert_entity_sql(&self) -> String {
        format!("INSERT OR IGNORE INTO {} ({}) VALUES (?)", self.table, self.key)
    }

    pub fn enqueue_by_id_sql(&self) -> String {
        format!("INSERT INTO {} ({}) VALUES (?)", self.queue, self.queue_ref)
    }

    pub fn enqueue_by_key_sql(&self) -> String {
        format!(
            "INSERT INTO {} ({}) SELECT id FROM {} WHERE {} = ?",
            self.queue, self.queue_ref, self.table, self.key
        )
    }

    /// Oldest queue entry joined to its entity identity
    pub fn peek_oldest_sql(&self) -> String {
        format!(
            "SELECT q.id AS entry_id, e.{key} AS identity FROM {queue} q \
             JOIN {table} e ON e.id = q.{queue_ref} ORDER BY q.id LIMIT 1",
            key = self.key,
            queue = self.queue,
            table = self.table,
            queue_ref = self.queue_ref,
        )
    }

    pub fn delete_entry_sql(&self) -> String {
        format!("DELETE FROM {} WHERE id = ?", self.queue)
    }

    pub fn exists_sql(&self) -> String {
        format!("SELECT 1 FROM {} WHERE {} = ?", self.table, self.key)
    }
}

pub fn create_hits_sql() -> String {
    format!(
        "CREATE TABLE {HITS} (id INTEGER PRIMARY KEY AUTOINCREMENT, \
         {HIT_REPOSITORY} INTEGER NOT NULL REFERENCES {repo}(id), \
         {HIT_PATH} TEXT NOT NULL, \
         UNIQUE ({HIT_REPOSITORY}, {HIT_PATH}))",
        repo = REPOSITORIES.table,
    )
}

pub fn insert_hit_sql() -> String {
    format!(
        "INSERT OR IGNORE INTO {HITS} ({HIT_REPOSITORY}, {HIT_PATH}) \
         SELECT id, ? FROM {repo} WHERE {key} = ?",
        repo = REPOSITORIES.table,
        key = REPOSITORIES.key,
    )
}

pub fn select_hits_sql() -> String {
    format!(
        "SELECT r.{key} AS repository, h.{HIT_PATH} AS path FROM {HITS} h \
         JOIN {repo} r ON r.id = h.{HIT_REPOSITORY} ORDER BY h.id",
        key = REPOSITORIES.key,
        repo = REPOSITORIES.table,
    )
}

/// All table names, sorted, as `sqlite_master` reports them
pub fn expected_tables() -> Vec<&'static str> {
    let mut names = vec![
        REPOSITORIES.table,
        REPOSITORIES.queue,
        USERS.table,
        USERS.queue,
        HITS,
    ];
    names.sort_unstable();
    names
}

/// DDL for a fresh store, in dependency order
pub fn create_statements() -> Vec<String> {
    vec![
        REPOSITORIES.create_entity_sql(),
        USERS.create_entity_sql(),
        REPOSITORIES.create_queue_sql(),
        USERS.create_queue_sql(),
        create_hits_sql(),
    ]
}
