mod database;
pub mod schema;

pub use database::{Database, SchemaError};
pub use schema::SCHEMA_VERSION;
