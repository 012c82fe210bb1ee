//! Provider trait for abstracting chat-completions backends.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A function tool offered to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

/// A tool call made by the model, with parsed arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Value,
}

/// Single-turn completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub user: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Ask for `response_format: {"type": "json_object"}`
    pub json_mode: bool,
    pub tools: Vec<ToolDefinition>,
}

impl CompletionRequest {
    pub fn new(user: impl Into<String>, temperature: f64, max_tokens: u32) -> Self {
        Self {
            system: None,
            user: user.into(),
            temperature,
            max_tokens,
            json_mode: false,
            tools: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_json_mode(mut self) -> Self {
        self.json_mode = true;
        self
    }

    pub fn with_tool(mut self, tool: ToolDefinition) -> Self {
        self.tools.push(tool);
        self
    }
}

/// Unified response type across providers
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    pub id: Option<String>,
    /// `choices[0].message.content`, when present and non-empty
    pub text: Option<String>,
    pub tool_calls: Vec<ToolInvocation>,
}

impl CompletionResponse {
    /// First tool call with the given name.
    pub fn tool_call(&self, name: &str) -> Option<&ToolInvocation> {
        self.tool_calls.iter().find(|call| call.name == name)
    }
}

/// Provider error types
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid response format: {0}")]
    InvalidFormat(String),
}

/// Provider trait for chat-completions backends
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name
    fn name(&self) -> &str;

    /// Current model
    fn model(&self) -> &str;

    /// Send one request and return the first choice.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Forward an already-built request body and return the upstream JSON
    /// as-is, whatever its status.
    async fn forward_raw(&self, body: Value) -> Result<Value, ProviderError>;
}
