// Shared benchmark helpers
// Functions here are used across different benchmark files
#![allow(dead_code)]

use geoleak::repository::Database;

/// Generate N distinct repository names spread over a few owners
pub fn generate_repositories(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("owner{}/repo{}", i % 97, i)).collect()
}

/// Generate N distinct user logins
pub fn generate_users(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("user{i}")).collect()
}

/// Create an in-memory database with the schema in place
pub async fn setup_bench_db() -> Database {
    let db = Database::new(":memory:").await.unwrap();
    db.init_schema().await.unwrap();
    db
}
