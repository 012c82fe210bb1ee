use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use kpoint_core::{ChatMessage, KnowledgePoint};
use kpoint_knowledge::{ExtractionSource, PointDetail};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::error::ApiError;
use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub points: Vec<KnowledgePoint>,
    pub source: ExtractionSource,
    /// Nothing could be extracted; the UI shows its empty state
    pub empty: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub input_text: String,
    pub extracting: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ChatHistoryResponse {
    pub messages: Vec<ChatMessage>,
    pub pending: usize,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: usize,
}

/// Body of `POST /api/llm`.
#[derive(Debug, Deserialize)]
pub struct LlmProxyRequest {
    #[serde(default)]
    pub model: Option<Value>,
    #[serde(default)]
    pub messages: Option<Value>,
    #[serde(default)]
    pub options: Option<Map<String, Value>>,
}

impl LlmProxyRequest {
    /// `{model, messages, ...options}`; option keys win on collision.
    pub fn into_upstream_body(self) -> Value {
        let mut body = Map::new();
        if let Some(model) = self.model {
            body.insert("model".to_string(), model);
        }
        if let Some(messages) = self.messages {
            body.insert("messages".to_string(), messages);
        }
        body.extend(self.options.unwrap_or_default());
        Value::Object(body)
    }
}

/// Run the HTTP server
pub async fn run(state: Arc<AppState>, bind_addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Create the router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/session", get(session_handler))
        .route("/api/extract", post(extract_handler))
        .route("/api/points", get(points_handler))
        .route("/api/points/{id}", get(point_detail_handler))
        .route("/api/points/{id}/toggle", post(toggle_handler))
        .route("/api/points/{id}/save", post(save_point_handler))
        .route("/api/detail", get(current_detail_handler))
        .route("/api/saved", get(saved_handler).post(save_selected_handler))
        .route("/api/chat", get(chat_history_handler).post(chat_handler))
        .route("/api/chat/pending", delete(cancel_pending_handler))
        .route("/api/llm", post(llm_proxy_handler))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Health check handler
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn session_handler(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    Json(SessionResponse {
        input_text: state.input_text().await,
        extracting: state.is_extracting(),
    })
}

async fn extract_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let extraction = state.extract(&request.text).await?;
    Ok(Json(ExtractResponse {
        empty: extraction.is_empty(),
        points: extraction.points,
        source: extraction.source,
    }))
}

async fn points_handler(State(state): State<Arc<AppState>>) -> Json<Vec<KnowledgePoint>> {
    Json(state.extracted().await)
}

async fn point_detail_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PointDetail>, ApiError> {
    Ok(Json(state.point_detail(&id).await?))
}

async fn toggle_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<KnowledgePoint>, ApiError> {
    Ok(Json(state.toggle_selection(&id).await?))
}

async fn current_detail_handler(State(state): State<Arc<AppState>>) -> Json<Option<PointDetail>> {
    Json(state.current_detail().await)
}

/// 201 with the new entry, or 200 with the existing one when already saved.
async fn save_point_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<KnowledgePoint>), ApiError> {
    match state.save_point(&id).await? {
        Some(entry) => Ok((StatusCode::CREATED, Json(entry))),
        None => {
            let existing = state
                .saved()
                .await
                .into_iter()
                .find(|p| p.id == id)
                .ok_or(ApiError::Internal)?;
            Ok((StatusCode::OK, Json(existing)))
        }
    }
}

async fn save_selected_handler(State(state): State<Arc<AppState>>) -> Json<Vec<KnowledgePoint>> {
    Json(state.save_selected().await)
}

async fn saved_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<KnowledgePoint>> {
    match query.q.as_deref() {
        Some(q) => Json(state.search_saved(q).await),
        None => Json(state.saved().await),
    }
}

async fn chat_history_handler(State(state): State<Arc<AppState>>) -> Json<ChatHistoryResponse> {
    Json(ChatHistoryResponse {
        messages: state.chat_messages().await,
        pending: state.pending_replies().await,
    })
}

async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<(StatusCode, Json<ChatMessage>), ApiError> {
    let message = state.submit_query(&request.content).await?;
    Ok((StatusCode::ACCEPTED, Json(message)))
}

async fn cancel_pending_handler(State(state): State<Arc<AppState>>) -> Json<CancelResponse> {
    Json(CancelResponse {
        cancelled: state.cancel_pending().await,
    })
}

/// Relay a completions request upstream with the server-held key.
///
/// Any failure, including an unparseable body, is a bare 500.
async fn llm_proxy_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: LlmProxyRequest = serde_json::from_slice(&body).map_err(|e| {
        error!("LLM proxy: invalid request body: {}", e);
        ApiError::Internal
    })?;

    state
        .provider()
        .forward_raw(request.into_upstream_body())
        .await
        .map(Json)
        .map_err(|e| {
            error!("LLM proxy: upstream call failed: {}", e);
            ApiError::Internal
        })
}
