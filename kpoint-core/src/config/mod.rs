//! Configuration management for kpoint.
//!
//! Secrets come from environment variables, settings from a TOML file.
//!
//! # Configuration Sources
//!
//! ## Secrets (Environment Variables)
//! - `SILICONFLOW_API_KEY` - upstream completions API key
//! - `REMOTE_STORE_TOKEN` - bearer token for the remote tool store
//!
//! ## Settings (TOML File)
//! Located at `~/.config/kpoint/config.toml`:
//! ```toml
//! [llm]
//! base_url = "https://api.siliconflow.cn/v1"
//! model = "Qwen/Qwen2.5-7B-Instruct"
//!
//! [gateway]
//! host = "127.0.0.1"
//! port = 3000
//!
//! [chat]
//! response_delay_ms = 1000
//! ```

mod secrets;
mod settings;

pub use secrets::{LLM_API_KEY_ENV, REMOTE_STORE_TOKEN_ENV, Secrets, SecretsError};
pub use settings::{
    ChatSettings, GatewaySettings, LlmSettings, LoggingSettings, RemoteStoreSettings, Settings,
    SettingsError, StorageSettings,
};

#[cfg(test)]
pub(crate) static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Combined configuration containing both secrets and settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Secrets loaded from environment variables
    pub secrets: Secrets,
    /// Settings loaded from TOML configuration file
    pub settings: Settings,
}

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Secrets error: {0}")]
    Secrets(#[from] SecretsError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Remote store is enabled but [remote_store].url is not set")]
    RemoteStoreUrlMissing,

    #[error("LLM base URL is empty")]
    LlmBaseUrlMissing,
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A secret is set to a blank value
    /// - The TOML file cannot be read or parsed
    /// - The remote store is enabled without a URL
    pub fn load() -> Result<Self, ConfigError> {
        let secrets = Secrets::from_env()?;
        let settings = Settings::load()?;
        Self::validated(secrets, settings)
    }

    /// Combine already-loaded parts, applying cross-field validation.
    pub fn validated(secrets: Secrets, settings: Settings) -> Result<Self, ConfigError> {
        if settings.llm.base_url.trim().is_empty() {
            return Err(ConfigError::LlmBaseUrlMissing);
        }

        if settings.remote_store.enabled
            && settings
                .remote_store
                .url
                .as_deref()
                .is_none_or(|url| url.trim().is_empty())
        {
            return Err(ConfigError::RemoteStoreUrlMissing);
        }

        if !secrets.has_llm_key() {
            tracing::warn!(
                "{} is not set; upstream requests are sent without authorization",
                LLM_API_KEY_ENV
            );
        }

        Ok(Self { secrets, settings })
    }

    /// Get the HTTP bind address.
    pub fn bind_addr(&self) -> String {
        self.settings.bind_addr()
    }

    /// Get the upstream LLM API key (if configured).
    pub fn llm_api_key(&self) -> Option<&str> {
        self.secrets.llm_api_key.as_deref()
    }

    /// Get the remote store token (if configured).
    pub fn remote_store_token(&self) -> Option<&str> {
        self.secrets.remote_store_token.as_deref()
    }

    /// Whether saved points are also dispatched to the remote tool store.
    pub fn remote_store_enabled(&self) -> bool {
        self.settings.remote_store.enabled
    }
}
