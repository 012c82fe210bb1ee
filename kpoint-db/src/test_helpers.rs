//! Test helpers for kpoint databases.

use crate::{
    error::DbResult, kv_db::KvDbPool, persistence::PersistenceGateway,
    sqlite_runtime::create_in_memory_pool,
};

/// Create an in-memory, migrated kpoint database for testing
pub async fn create_test_pool() -> DbResult<KvDbPool> {
    let pool = create_in_memory_pool(1).await?;
    KvDbPool::run_migrations(&pool).await?;
    Ok(KvDbPool::from_pool(pool))
}

/// Create a persistence gateway over an in-memory database
pub async fn create_test_gateway() -> DbResult<PersistenceGateway> {
    Ok(PersistenceGateway::new(create_test_pool().await?))
}
