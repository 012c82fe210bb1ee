//! kpoint key-value database connection pool and initialization.

use std::path::Path;

use sqlx::SqlitePool;
use tracing::info;

use crate::{
    error::{DbError, DbResult},
    sqlite_runtime::create_file_pool,
};

/// kpoint database pool wrapper
#[derive(Debug, Clone)]
pub struct KvDbPool {
    pool: SqlitePool,
}

impl KvDbPool {
    /// Open (creating if needed) the database file and run migrations.
    pub async fn open(db_path: &Path) -> DbResult<Self> {
        info!("Initializing kpoint database at: {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let pool = create_file_pool(db_path, 4).await?;

        Self::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Get the inner SQLx pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub(crate) async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
        sqlx::migrate!("./migrations/kv")
            .run(pool)
            .await
            .map_err(|e| DbError::Migration(e.to_string()))?;

        info!("kpoint database migrations completed");
        Ok(())
    }

    /// Wrap an existing, already migrated pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}
