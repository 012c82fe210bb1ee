//! OpenAI-compatible API client.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::providers::provider::{
    CompletionProvider, CompletionRequest, CompletionResponse, ProviderError, ToolDefinition,
    ToolInvocation,
};
use crate::providers::query_dump::QueryDump;

/// OpenAI-compatible API client.
#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    http_client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    provider_name: String,
    dump_queries: bool,
}

/// Request body for the Chat Completions API
#[derive(Debug, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    temperature: f64,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

/// OpenAI-compatible message format
#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCall>>,
}

/// OpenAI-compatible tool call
#[derive(Debug, Serialize, Deserialize)]
struct ToolCall {
    #[serde(default)]
    id: Option<String>,
    function: ToolCallFunction,
}

/// Tool call function details
#[derive(Debug, Serialize, Deserialize)]
struct ToolCallFunction {
    name: String,
    arguments: String,
}

/// OpenAI-compatible tool definition
#[derive(Debug, Serialize)]
struct OpenAiToolDefinition {
    r#type: &'static str,
    function: ToolDefinition,
}

/// OpenAI-compatible chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
}

/// Choice in the response
#[derive(Debug, Deserialize)]
struct Choice {
    message: OpenAiMessage,
}

impl OpenAiCompatibleClient {
    /// Create a new OpenAI-compatible client.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        provider_name: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            api_key,
            model: model.into(),
            base_url: base_url.into(),
            provider_name: provider_name.into(),
            dump_queries: false,
        })
    }

    /// Enable or disable debug query logging
    pub fn with_dump_queries(mut self, enabled: bool) -> Self {
        self.dump_queries = enabled;
        self
    }

    /// Build request headers with optional auth.
    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(api_key) = &self.api_key {
            let auth_value = format!("Bearer {}", api_key);
            if let Ok(header_value) = HeaderValue::from_str(&auth_value) {
                headers.insert(AUTHORIZATION, header_value);
            }
        }
        headers
    }

    fn normalized_base_url(&self) -> String {
        self.base_url.trim_end_matches('/').to_string()
    }

    fn chat_completions_url(&self) -> String {
        let base = self.normalized_base_url();
        if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }

    fn build_request(&self, request: CompletionRequest) -> ChatCompletionsRequest {
        let mut messages = Vec::new();
        if let Some(system) = request.system {
            messages.push(OpenAiMessage {
                role: "system".to_string(),
                content: Some(system),
                tool_calls: None,
            });
        }
        messages.push(OpenAiMessage {
            role: "user".to_string(),
            content: Some(request.user),
            tool_calls: None,
        });

        let (tools, tool_choice) = if request.tools.is_empty() {
            (None, None)
        } else {
            let tools = request
                .tools
                .into_iter()
                .map(|function| OpenAiToolDefinition {
                    r#type: "function",
                    function,
                })
                .collect();
            (Some(tools), Some(serde_json::json!("auto")))
        };

        ChatCompletionsRequest {
            model: self.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_mode.then_some(ResponseFormat {
                r#type: "json_object",
            }),
            tools,
            tool_choice,
        }
    }

    /// Convert the first choice into a provider response
    fn convert_response(response: ChatCompletionsResponse) -> CompletionResponse {
        let Some(choice) = response.choices.into_iter().next() else {
            return CompletionResponse {
                id: response.id,
                ..CompletionResponse::default()
            };
        };

        let text = choice.message.content.filter(|text| !text.is_empty());
        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .filter_map(|call| {
                match serde_json::from_str(&call.function.arguments) {
                    Ok(arguments) => Some(ToolInvocation {
                        name: call.function.name,
                        arguments,
                    }),
                    Err(e) => {
                        debug!(
                            tool = %call.function.name,
                            id = ?call.id,
                            error = %e,
                            "dropping tool call with unparseable arguments"
                        );
                        None
                    }
                }
            })
            .collect();

        CompletionResponse {
            id: response.id,
            text,
            tool_calls,
        }
    }

    /// POST `body` to the completions endpoint, dumping both sides if enabled.
    /// Returns the status and raw body text.
    async fn post_json(
        &self,
        body: &Value,
    ) -> Result<(reqwest::StatusCode, String), ProviderError> {
        let dump = if self.dump_queries {
            QueryDump::request(&self.provider_name, &self.model, body).await
        } else {
            None
        };

        let response = self
            .http_client
            .post(self.chat_completions_url())
            .headers(self.build_headers())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if let Some(dump) = &dump
            && let Ok(val) = serde_json::from_str::<Value>(&response_text)
        {
            dump.response(&val).await;
        }

        Ok((status, response_text))
    }
}

#[async_trait::async_trait]
impl CompletionProvider for OpenAiCompatibleClient {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let body = serde_json::to_value(self.build_request(request))?;
        let (status, response_text) = self.post_json(&body).await?;

        if !status.is_success() {
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: response_text,
            });
        }

        let completions_response: ChatCompletionsResponse = serde_json::from_str(&response_text)
            .map_err(|e| {
                let preview: String = response_text.chars().take(500).collect();
                ProviderError::InvalidFormat(format!(
                    "Failed to parse OpenAI-compatible response: {e}\nBody preview: {preview}"
                ))
            })?;
        Ok(Self::convert_response(completions_response))
    }

    async fn forward_raw(&self, body: Value) -> Result<Value, ProviderError> {
        let (status, response_text) = self.post_json(&body).await?;
        if !status.is_success() {
            debug!(status = status.as_u16(), "relaying upstream error body");
        }
        Ok(serde_json::from_str(&response_text)?)
    }
}
