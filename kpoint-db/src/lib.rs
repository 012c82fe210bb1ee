//! kpoint-db: durable key-value storage for kpoint.
//!
//! This crate provides:
//! - A SQLite-backed `kv_store` table with whole-value overwrites
//! - The persistence gateway for the saved set and chat history

pub mod error;
pub mod kv_db;
pub mod kv_store;
pub mod persistence;
mod sqlite_runtime;

// Re-export commonly used types
pub use error::{DbError, DbResult};
pub use kv_db::KvDbPool;
pub use kv_store::KvRepository;
pub use persistence::{CHAT_MESSAGES_KEY, PersistedState, PersistenceGateway, SAVED_POINTS_KEY};

// Re-export test helpers when running tests or when test-helpers feature is enabled
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
