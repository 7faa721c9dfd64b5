//! Database migrations infrastructure
//!
//! Versioned schema steps recorded in `_migrations`, run once at startup.

use sqlx::sqlite::SqlitePool;
use tracing::info;

use crate::domain::DomainError;

/// Represents a database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version, strictly increasing
    pub version: i64,
    /// Human-readable description
    pub description: String,
    /// SQL to run when applying the migration
    pub up: String,
    /// SQL to run when reverting the migration
    pub down: String,
    /// Optional `SELECT COUNT(*)` query; a non-zero result means the
    /// change is already present and `up` is skipped
    pub already_applied_probe: Option<String>,
}

impl Migration {
    pub fn new(
        version: i64,
        description: impl Into<String>,
        up: impl Into<String>,
        down: impl Into<String>,
    ) -> Self {
        Self {
            version,
            description: description.into(),
            up: up.into(),
            down: down.into(),
            already_applied_probe: None,
        }
    }

    pub fn with_probe(mut self, probe: impl Into<String>) -> Self {
        self.already_applied_probe = Some(probe.into());
        self
    }
}

/// SQLite migrator
#[derive(Debug, Clone)]
pub struct SqliteMigrator {
    pool: SqlitePool,
}

impl SqliteMigrator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the migrations table if it doesn't exist
    async fn ensure_migrations_table(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                installed_on DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create migrations table: {}", e)))?;

        Ok(())
    }

    async fn is_recorded(&self, version: i64) -> Result<bool, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _migrations WHERE version = ?")
            .bind(version)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                DomainError::storage(format!("Failed to check migration status: {}", e))
            })?;

        Ok(count > 0)
    }

    /// Runs a single migration inside a transaction. Returns whether it ran.
    pub async fn run_migration(&self, migration: &Migration) -> Result<bool, DomainError> {
        self.ensure_migrations_table().await?;

        if self.is_recorded(migration.version).await? {
            return Ok(false);
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            DomainError::storage(format!("Failed to begin migration transaction: {}", e))
        })?;

        let skip = match &migration.already_applied_probe {
            Some(probe) => {
                let present: i64 = sqlx::query_scalar(probe)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| {
                        DomainError::storage(format!(
                            "Failed to probe migration {}: {}",
                            migration.version, e
                        ))
                    })?;
                present > 0
            }
            None => false,
        };

        if !skip {
            sqlx::raw_sql(&migration.up)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    DomainError::storage(format!(
                        "Failed to run migration {}: {}",
                        migration.version, e
                    ))
                })?;
        }

        sqlx::query("INSERT INTO _migrations (version, description) VALUES (?, ?)")
            .bind(migration.version)
            .bind(&migration.description)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to record migration {}: {}",
                    migration.version, e
                ))
            })?;

        tx.commit().await.map_err(|e| {
            DomainError::storage(format!(
                "Failed to commit migration {}: {}",
                migration.version, e
            ))
        })?;

        info!(
            version = migration.version,
            description = %migration.description,
            skipped = skip,
            "Applied migration"
        );

        Ok(true)
    }

    /// Reverts a single migration
    pub async fn revert_migration(&self, migration: &Migration) -> Result<(), DomainError> {
        self.ensure_migrations_table().await?;

        if !self.is_recorded(migration.version).await? {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            DomainError::storage(format!("Failed to begin revert transaction: {}", e))
        })?;

        sqlx::raw_sql(&migration.down)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to revert migration {}: {}",
                    migration.version, e
                ))
            })?;

        sqlx::query("DELETE FROM _migrations WHERE version = ?")
            .bind(migration.version)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to remove migration record {}: {}",
                    migration.version, e
                ))
            })?;

        tx.commit().await.map_err(|e| {
            DomainError::storage(format!(
                "Failed to commit revert of migration {}: {}",
                migration.version, e
            ))
        })?;

        Ok(())
    }

    /// Returns the latest applied migration version
    pub async fn current_version(&self) -> Result<Option<i64>, DomainError> {
        self.ensure_migrations_table().await?;

        let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM _migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                DomainError::storage(format!("Failed to get migration version: {}", e))
            })?;

        Ok(version)
    }
}

/// Schema of the key store
///
/// Version 1 matches tables created by the legacy service, which may or may
/// not carry `usage_count`; version 2 adds the column only where missing.
pub fn storage_migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            1,
            "Create api_keys table",
            r#"
            CREATE TABLE IF NOT EXISTS api_keys (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                key TEXT UNIQUE NOT NULL,
                user_type TEXT CHECK(user_type IN ('trial', 'paid')) NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            "#,
            r#"
            DROP TABLE IF EXISTS api_keys;
            "#,
        ),
        Migration::new(
            2,
            "Add usage_count to api_keys",
            r#"
            ALTER TABLE api_keys ADD COLUMN usage_count INTEGER NOT NULL DEFAULT 0;
            "#,
            r#"
            ALTER TABLE api_keys DROP COLUMN usage_count;
            "#,
        )
        .with_probe(
            "SELECT COUNT(*) FROM pragma_table_info('api_keys') WHERE name = 'usage_count'",
        ),
    ]
}

/// Runs all pending storage migrations
pub async fn run_storage_migrations(pool: &SqlitePool) -> Result<(), DomainError> {
    let migrator = SqliteMigrator::new(pool.clone());

    for migration in storage_migrations() {
        migrator.run_migration(&migration).await?;
    }

    Ok(())
}
