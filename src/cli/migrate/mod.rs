//! Migrate command - prepares the key database

use tracing::info;

use crate::infrastructure::storage::{connect, run_storage_migrations, SqliteMigrator};

/// Apply pending migrations and report the schema version
pub async fn run() -> anyhow::Result<()> {
    let config = super::bootstrap()?;

    let pool = connect(&config.database.sqlite()).await?;
    run_storage_migrations(&pool).await?;

    let version = SqliteMigrator::new(pool.clone()).current_version().await?;
    info!(version = ?version, "Database schema is up to date");

    pool.close().await;

    Ok(())
}
