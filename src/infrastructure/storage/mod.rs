//! Storage infrastructure - SQLite pool and schema migrations

pub mod migrations;
pub mod sqlite;

pub use migrations::{run_storage_migrations, storage_migrations, Migration, SqliteMigrator};
pub use sqlite::{connect, SqliteConfig};
