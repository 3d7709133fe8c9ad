//! Crawl frontier
//!
//! - **store**: the `Frontier` trait (atomic push/pop/requeue)
//! - **db_store**: SQLite implementation on top of `Database`
//! - **expand**: the `pop_repo` discovery algorithm and contributor expansion

mod db_store;
mod expand;
mod store;

pub use expand::{expand_contributors, pop_repo};
pub use store::Frontier;
