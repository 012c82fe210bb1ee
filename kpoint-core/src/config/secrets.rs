//! Secrets loaded from environment variables only.
//!
//! API keys never live in the TOML settings file.

use std::env;

/// Env var holding the key for the upstream completions API.
pub const LLM_API_KEY_ENV: &str = "SILICONFLOW_API_KEY";

/// Env var holding the optional bearer token for the remote tool store.
pub const REMOTE_STORE_TOKEN_ENV: &str = "REMOTE_STORE_TOKEN";

/// Secrets loaded exclusively from environment variables.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    /// Upstream LLM API key (env: SILICONFLOW_API_KEY)
    pub llm_api_key: Option<String>,

    /// Remote tool store token (env: REMOTE_STORE_TOKEN)
    pub remote_store_token: Option<String>,
}

/// Errors that can occur when loading secrets
#[derive(Debug, thiserror::Error)]
pub enum SecretsError {
    #[error("Secret {0} is set but empty")]
    EmptySecret(&'static str),
}

impl Secrets {
    /// Load secrets from environment variables, reading `.env` first if present.
    pub fn from_env() -> Result<Self, SecretsError> {
        let _ = dotenvy::dotenv();

        Self::from_env_inner()
    }

    /// Load from the process environment without touching `.env`.
    pub(crate) fn from_env_inner() -> Result<Self, SecretsError> {
        Ok(Self {
            llm_api_key: read_secret(LLM_API_KEY_ENV)?,
            remote_store_token: read_secret(REMOTE_STORE_TOKEN_ENV)?,
        })
    }

    /// Whether the upstream LLM can be called with credentials.
    pub fn has_llm_key(&self) -> bool {
        self.llm_api_key.is_some()
    }
}

fn read_secret(name: &'static str) -> Result<Option<String>, SecretsError> {
    match env::var(name) {
        Ok(value) if value.trim().is_empty() => Err(SecretsError::EmptySecret(name)),
        Ok(value) => Ok(Some(value)),
        Err(_) => Ok(None),
    }
}
