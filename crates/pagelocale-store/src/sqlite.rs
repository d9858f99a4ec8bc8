//! SQLite-backed durable preference store.

use async_trait::async_trait;
use pagelocale_core::{
    config::StoreConfig, error::LocaleError, shellexpand, traits::PreferenceStore,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::{debug, info};

/// Preference store backed by a single SQLite table.
#[derive(Clone)]
pub struct SqlitePreferenceStore {
    pool: SqlitePool,
}

impl SqlitePreferenceStore {
    /// Open (or create) the database, running migrations on first use.
    pub async fn new(config: &StoreConfig) -> Result<Self, LocaleError> {
        let db_path = shellexpand(&config.db_path);

        // Ensure parent directory exists.
        if let Some(parent) = std::path::Path::new(&db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| LocaleError::Store(format!("failed to create data dir: {e}")))?;
            }
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| LocaleError::Store(format!("invalid db path: {e}")))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(opts)
            .await
            .map_err(|e| LocaleError::Store(format!("failed to connect to sqlite: {e}")))?;

        Self::run_migrations(&pool).await?;

        info!("Preference store initialized at {db_path}");

        Ok(Self { pool })
    }

    /// Wrap an existing pool. Migrations are run before returning.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, LocaleError> {
        Self::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<(), LocaleError> {
        sqlx::raw_sql(include_str!("../migrations/001_init.sql"))
            .execute(pool)
            .await
            .map_err(|e| LocaleError::Store(format!("migration 001_init failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for SqlitePreferenceStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, LocaleError> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM preferences WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| LocaleError::Store(format!("failed to read '{key}': {e}")))?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), LocaleError> {
        sqlx::query(
            "INSERT INTO preferences (key, value, updated_at) VALUES (?, ?, datetime('now')) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| LocaleError::Store(format!("failed to write '{key}': {e}")))?;

        debug!("preference {key} = {value}");
        Ok(())
    }
}
