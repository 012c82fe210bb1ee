//! Persistence gateway for the saved set and chat history.
//!
//! Both collections live under fixed keys as full JSON arrays. Reads never
//! fail: a missing, unreadable or corrupt value loads as an empty collection.

use std::path::Path;

use kpoint_core::{ChatMessage, KnowledgePoint};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::kv_db::KvDbPool;
use crate::kv_store::KvRepository;

/// Key holding the saved knowledge points.
pub const SAVED_POINTS_KEY: &str = "savedKnowledgePoints";

/// Key holding the chat history.
pub const CHAT_MESSAGES_KEY: &str = "chatMessages";

/// Collections restored at session start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedState {
    pub saved_points: Vec<KnowledgePoint>,
    pub chat_messages: Vec<ChatMessage>,
}

/// Load/save of persisted collections, last write wins.
#[derive(Debug, Clone)]
pub struct PersistenceGateway {
    db: KvDbPool,
}

impl PersistenceGateway {
    pub fn new(db: KvDbPool) -> Self {
        Self { db }
    }

    /// Open the database file at `db_path`.
    pub async fn open(db_path: &Path) -> DbResult<Self> {
        Ok(Self::new(KvDbPool::open(db_path).await?))
    }

    /// Load both collections. Absent or corrupt values become empty.
    pub async fn load(&self) -> PersistedState {
        PersistedState {
            saved_points: self.load_collection(SAVED_POINTS_KEY).await,
            chat_messages: self.load_collection(CHAT_MESSAGES_KEY).await,
        }
    }

    /// Overwrite the saved set. Empty sets are not written; returns whether
    /// a write happened.
    pub async fn persist_saved(&self, points: &[KnowledgePoint]) -> DbResult<bool> {
        self.write_collection(SAVED_POINTS_KEY, points).await
    }

    /// Overwrite the chat history. Empty histories are not written.
    pub async fn persist_chat(&self, messages: &[ChatMessage]) -> DbResult<bool> {
        self.write_collection(CHAT_MESSAGES_KEY, messages).await
    }

    async fn load_collection<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let raw = match KvRepository::get(self.db.pool(), key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key, "no persisted value, starting empty");
                return Vec::new();
            }
            Err(e) => {
                warn!(key, error = %e, "failed to read persisted value, starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<T>>(&raw) {
            Ok(items) => items,
            Err(e) => {
                warn!(key, error = %e, "corrupt persisted value, starting empty");
                Vec::new()
            }
        }
    }

    async fn write_collection<T: Serialize>(&self, key: &str, items: &[T]) -> DbResult<bool> {
        if items.is_empty() {
            return Ok(false);
        }

        let json = serde_json::to_string(items).map_err(|source| DbError::Serialization {
            key: key.to_string(),
            source,
        })?;
        KvRepository::put(self.db.pool(), key, &json).await?;
        debug!(key, count = items.len(), "persisted collection");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::create_test_gateway;

    #[tokio::test]
    async fn test_load_from_empty_database() {
        let gateway = create_test_gateway().await.unwrap();
        let state = gateway.load().await;
        assert_eq!(state, PersistedState::default());
    }

    #[tokio::test]
    async fn test_corrupt_value_loads_empty() {
        let gateway = create_test_gateway().await.unwrap();
        KvRepository::put(gateway.db.pool(), SAVED_POINTS_KEY, "{not json")
            .await
            .unwrap();
        KvRepository::put(gateway.db.pool(), CHAT_MESSAGES_KEY, r#"{"an":"object"}"#)
            .await
            .unwrap();

        let state = gateway.load().await;
        assert!(state.saved_points.is_empty());
        assert!(state.chat_messages.is_empty());
    }

    #[tokio::test]
    async fn test_empty_collections_are_not_written() {
        let gateway = create_test_gateway().await.unwrap();
        let point = KnowledgePoint::new("kp-1-0", "Title", "Content body", "Desc")
            .saved_copy(chrono::Utc::now());

        assert!(gateway.persist_saved(&[point]).await.unwrap());
        assert!(!gateway.persist_saved(&[]).await.unwrap());
        assert!(!gateway.persist_chat(&[]).await.unwrap());

        let state = gateway.load().await;
        assert_eq!(state.saved_points.len(), 1);
    }

    #[tokio::test]
    async fn test_persist_overwrites_full_collection() {
        let gateway = create_test_gateway().await.unwrap();
        let first = vec![ChatMessage::user("first")];
        let second = vec![
            ChatMessage::user("first"),
            ChatMessage::assistant("reply"),
        ];

        gateway.persist_chat(&first).await.unwrap();
        gateway.persist_chat(&second).await.unwrap();

        let state = gateway.load().await;
        assert_eq!(state.chat_messages, second);
    }
}
