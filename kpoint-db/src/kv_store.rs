//! Raw string-keyed storage backed by the `kv_store` table.
//!
//! Every write replaces the whole value for its key.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::DbResult;

/// Repository for the kv_store table.
pub struct KvRepository;

impl KvRepository {
    /// Read the value stored under `key`.
    pub async fn get(pool: &SqlitePool, key: &str) -> DbResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(|(value,)| value))
    }

    /// Overwrite the value stored under `key`.
    pub async fn put(pool: &SqlitePool, key: &str, value: &str) -> DbResult<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO kv_store (key, value, updated_at)
             VALUES (?, ?, ?)",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().timestamp_millis())
        .execute(pool)
        .await?;
        Ok(())
    }
}
