pub mod openai_compatible;
pub mod provider;
pub mod query_dump;

pub use provider::{
    CompletionProvider, CompletionRequest, CompletionResponse, ProviderError, ToolDefinition,
    ToolInvocation,
};
