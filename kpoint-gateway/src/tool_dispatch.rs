//! Best-effort mirror of saved points into a remote tool store.
//!
//! A secondary model call is offered a single function tool; when the model
//! calls it, the arguments are POSTed to the configured store URL. Nothing
//! here can affect the local save.

use std::sync::Arc;
use std::time::Duration;

use kpoint_core::{Config, KnowledgePoint};
use reqwest::header::AUTHORIZATION;
use serde_json::json;
use tracing::{debug, info};

use crate::providers::{CompletionProvider, CompletionRequest, ProviderError, ToolDefinition};

const DISPATCH_SYSTEM_PROMPT: &str = "You file knowledge points into the user's remote \
knowledge store. Call the provided tool exactly once with the point's title, content and \
description.";

const DISPATCH_MAX_TOKENS: u32 = 500;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("model call failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("remote store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("remote store returned {status}: {body}")]
    Status { status: u16, body: String },
}

pub struct RemoteToolDispatch {
    provider: Arc<dyn CompletionProvider>,
    http_client: reqwest::Client,
    url: String,
    token: Option<String>,
    tool_name: String,
    temperature: f64,
}

impl RemoteToolDispatch {
    /// Build a dispatcher when the remote store is enabled, `None` otherwise.
    pub fn from_config(
        config: &Config,
        provider: Arc<dyn CompletionProvider>,
    ) -> Result<Option<Self>, DispatchError> {
        let remote = &config.settings.remote_store;
        let Some(url) = remote.url.clone().filter(|_| remote.enabled) else {
            return Ok(None);
        };

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.settings.llm.timeout_seconds))
            .build()?;

        Ok(Some(Self {
            provider,
            http_client,
            url,
            token: config.remote_store_token().map(str::to_string),
            tool_name: remote.tool_name.clone(),
            temperature: config.settings.llm.temperature,
        }))
    }

    fn tool(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.tool_name.clone(),
            description: "Save a knowledge point to the remote knowledge store".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "content": {"type": "string"},
                    "description": {"type": "string"}
                },
                "required": ["title", "content", "description"]
            }),
        }
    }

    /// Ask the model to file `point` and forward its tool call.
    ///
    /// Returns `false` when the model declined to call the tool.
    pub async fn dispatch(&self, point: &KnowledgePoint) -> Result<bool, DispatchError> {
        let user = json!({
            "title": point.title,
            "content": point.content,
            "description": point.description,
        })
        .to_string();
        let request = CompletionRequest::new(user, self.temperature, DISPATCH_MAX_TOKENS)
            .with_system(DISPATCH_SYSTEM_PROMPT)
            .with_tool(self.tool());

        let response = self.provider.complete(request).await?;
        let Some(call) = response.tool_call(&self.tool_name) else {
            debug!(id = %point.id, "model did not call the remote store tool");
            return Ok(false);
        };

        let mut request = self.http_client.post(&self.url).json(&call.arguments);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!(id = %point.id, "point mirrored to remote store");
        Ok(true)
    }
}
