//! Shared application state.
//!
//! `AppState` owns the session: the knowledge store, the chat log, pending
//! reply tasks and the persistence gateway. Every mutation of a persisted
//! collection is written through while the collection's lock is held, so
//! writes land in mutation order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use kpoint_core::{ChatMessage, Config, KnowledgePoint, Settings};
use kpoint_db::PersistenceGateway;
use kpoint_knowledge::{
    ChatLog, Extraction, KnowledgeError, KnowledgeResult, KnowledgeStore, PointDetail, TurnState,
    respond,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::extraction::{ExtractionClient, ExtractionError};
use crate::providers::CompletionProvider;
use crate::providers::openai_compatible::OpenAiCompatibleClient;
use crate::tool_dispatch::{DispatchError, RemoteToolDispatch};

/// Errors raised while assembling the state from configuration.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to build provider client: {0}")]
    Provider(#[from] crate::providers::ProviderError),
    #[error("failed to build remote store dispatcher: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Shared application state
pub struct AppState {
    provider: Arc<dyn CompletionProvider>,
    extractor: ExtractionClient,
    dispatch: Option<Arc<RemoteToolDispatch>>,
    persistence: PersistenceGateway,
    store: Mutex<KnowledgeStore>,
    chat: Mutex<ChatLog>,
    /// State of each turn still in flight, by user message id
    turns: Mutex<HashMap<String, TurnState>>,
    /// Parent of every pending reply's token; replaced after each cancel
    reply_cancel: Mutex<CancellationToken>,
    reply_delay: Duration,
    input_text: Mutex<String>,
}

impl AppState {
    /// Build the state from configuration, restoring persisted collections.
    pub async fn from_config(
        config: &Config,
        persistence: PersistenceGateway,
    ) -> Result<Arc<Self>, StateError> {
        let llm = &config.settings.llm;
        let provider: Arc<dyn CompletionProvider> = Arc::new(
            OpenAiCompatibleClient::new(
                llm.base_url.clone(),
                config.llm_api_key().map(str::to_string),
                llm.model.clone(),
                "siliconflow",
                Duration::from_secs(llm.timeout_seconds),
            )?
            .with_dump_queries(config.settings.logging.dump_queries),
        );
        let dispatch = RemoteToolDispatch::from_config(config, provider.clone())?;

        Ok(Self::with_provider(config.settings.clone(), provider, dispatch, persistence).await)
    }

    /// Build the state around an existing provider.
    pub async fn with_provider(
        settings: Settings,
        provider: Arc<dyn CompletionProvider>,
        dispatch: Option<RemoteToolDispatch>,
        persistence: PersistenceGateway,
    ) -> Arc<Self> {
        let restored = persistence.load().await;
        info!(
            saved = restored.saved_points.len(),
            messages = restored.chat_messages.len(),
            "restored persisted state"
        );

        Arc::new(Self {
            extractor: ExtractionClient::new(provider.clone(), &settings.llm),
            reply_delay: Duration::from_millis(settings.chat.response_delay_ms),
            provider,
            dispatch: dispatch.map(Arc::new),
            persistence,
            store: Mutex::new(KnowledgeStore::with_saved(restored.saved_points)),
            chat: Mutex::new(ChatLog::from_messages(restored.chat_messages)),
            turns: Mutex::new(HashMap::new()),
            reply_cancel: Mutex::new(CancellationToken::new()),
            input_text: Mutex::new(String::new()),
        })
    }

    pub fn provider(&self) -> &Arc<dyn CompletionProvider> {
        &self.provider
    }

    pub fn is_extracting(&self) -> bool {
        self.extractor.is_extracting()
    }

    /// Last text submitted for extraction.
    pub async fn input_text(&self) -> String {
        self.input_text.lock().await.clone()
    }

    // -- Extraction and selection ------------------------------------------

    /// Extract points from `text` and make them the current batch.
    ///
    /// The session text changes only once this extraction holds the
    /// in-progress flag.
    pub async fn extract(&self, text: &str) -> Result<Extraction, ExtractionError> {
        let permit = self.extractor.begin(text)?;
        *self.input_text.lock().await = text.to_string();

        let extraction = self.extractor.run(permit, text).await;
        self.store
            .lock()
            .await
            .set_extracted(extraction.points.clone());
        Ok(extraction)
    }

    pub async fn extracted(&self) -> Vec<KnowledgePoint> {
        self.store.lock().await.extracted().to_vec()
    }

    pub async fn toggle_selection(&self, id: &str) -> KnowledgeResult<KnowledgePoint> {
        self.store.lock().await.toggle_selection(id).cloned()
    }

    pub async fn point_detail(&self, id: &str) -> KnowledgeResult<PointDetail> {
        let store = self.store.lock().await;
        let point = store
            .point(id)
            .cloned()
            .ok_or_else(|| KnowledgeError::UnknownPoint(id.to_string()))?;
        Ok(PointDetail::new(point))
    }

    /// Detail of the point selected most recently, if it is still selected.
    pub async fn current_detail(&self) -> Option<PointDetail> {
        let store = self.store.lock().await;
        store.detail_point().cloned().map(PointDetail::new)
    }

    // -- Saved set -----------------------------------------------------------

    /// Save the batch point `id`. Returns `None` when it was already saved.
    pub async fn save_point(&self, id: &str) -> KnowledgeResult<Option<KnowledgePoint>> {
        let mut store = self.store.lock().await;
        let entry = store.save_by_id(id, Utc::now())?;
        if let Some(entry) = &entry {
            self.persist_saved(&store).await;
            self.mirror_to_remote(entry.clone());
        }
        Ok(entry)
    }

    /// Save every selected batch point, returning the entries added.
    pub async fn save_selected(&self) -> Vec<KnowledgePoint> {
        let mut store = self.store.lock().await;
        let added = store.save_selected(Utc::now());
        if !added.is_empty() {
            self.persist_saved(&store).await;
            for entry in &added {
                self.mirror_to_remote(entry.clone());
            }
        }
        added
    }

    pub async fn saved(&self) -> Vec<KnowledgePoint> {
        self.store.lock().await.saved().to_vec()
    }

    pub async fn search_saved(&self, query: &str) -> Vec<KnowledgePoint> {
        let store = self.store.lock().await;
        store.search_saved(query).into_iter().cloned().collect()
    }

    async fn persist_saved(&self, store: &KnowledgeStore) {
        if let Err(e) = self.persistence.persist_saved(store.saved()).await {
            warn!(error = %e, "failed to persist saved points");
        }
    }

    fn mirror_to_remote(&self, entry: KnowledgePoint) {
        let Some(dispatch) = self.dispatch.clone() else {
            return;
        };
        tokio::spawn(async move {
            if let Err(e) = dispatch.dispatch(&entry).await {
                warn!(id = %entry.id, error = %e, "remote store save failed");
            }
        });
    }

    // -- Chat ----------------------------------------------------------------

    pub async fn chat_messages(&self) -> Vec<ChatMessage> {
        self.chat.lock().await.messages().to_vec()
    }

    /// State of a turn still in flight. Finished and cancelled turns are
    /// dropped and report `None`.
    pub async fn turn_state(&self, user_message_id: &str) -> Option<TurnState> {
        self.turns.lock().await.get(user_message_id).copied()
    }

    /// Number of replies scheduled but not yet appended.
    pub async fn pending_replies(&self) -> usize {
        self.turns
            .lock()
            .await
            .values()
            .filter(|state| **state == TurnState::ResponsePending)
            .count()
    }

    /// Append the user's message and schedule the reply.
    ///
    /// The reply is computed against the saved set as it is now, and appended
    /// after the configured delay unless cancelled first.
    pub async fn submit_query(self: &Arc<Self>, content: &str) -> KnowledgeResult<ChatMessage> {
        let query = content.trim();
        if query.is_empty() {
            return Err(KnowledgeError::EmptyQuery);
        }

        let saved = self.saved().await;
        let message = ChatMessage::user(query);
        self.append_chat(message.clone()).await;
        self.set_turn(&message.id, TurnState::UserSubmitted).await;

        let token = self.reply_cancel.lock().await.child_token();
        self.set_turn(&message.id, TurnState::ResponsePending).await;

        let state = Arc::clone(self);
        let turn_id = message.id.clone();
        let query = query.to_string();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(turn = %turn_id, "pending reply cancelled");
                    state.turns.lock().await.remove(&turn_id);
                }
                _ = tokio::time::sleep(state.reply_delay) => {
                    state.append_chat(respond(&query, &saved)).await;
                    state.turns.lock().await.remove(&turn_id);
                    debug!(turn = %turn_id, state = ?TurnState::ResponseAppended, "reply appended");
                }
            }
        });

        Ok(message)
    }

    /// Cancel every pending reply. Returns how many were pending.
    pub async fn cancel_pending(&self) -> usize {
        let pending = self.pending_replies().await;
        let mut token = self.reply_cancel.lock().await;
        token.cancel();
        *token = CancellationToken::new();
        info!(pending, "cancelled pending replies");
        pending
    }

    async fn set_turn(&self, id: &str, state: TurnState) {
        self.turns.lock().await.insert(id.to_string(), state);
    }

    async fn append_chat(&self, message: ChatMessage) {
        let mut chat = self.chat.lock().await;
        chat.push(message);
        if let Err(e) = self.persistence.persist_chat(chat.messages()).await {
            warn!(error = %e, "failed to persist chat history");
        }
    }
}
