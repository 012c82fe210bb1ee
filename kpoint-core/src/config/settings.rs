//! Settings loaded from TOML files.
//!
//! Non-sensitive configuration stored in the XDG config directory
//! (~/.config/kpoint/config.toml).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default TOML configuration file content
const DEFAULT_CONFIG_TOML: &str = r#"# kpoint configuration file
# Located at: ~/.config/kpoint/config.toml
#
# This file contains non-sensitive configuration.
# Secrets are loaded from environment variables:
#   - SILICONFLOW_API_KEY  (upstream completions API)
#   - REMOTE_STORE_TOKEN   (optional, remote tool store)

[llm]
base_url = "https://api.siliconflow.cn/v1"
model = "Qwen/Qwen2.5-7B-Instruct"
temperature = 0.7
max_tokens = 2000
timeout_seconds = 60

[gateway]
host = "127.0.0.1"
port = 3000

[storage]
# db_path = "/var/lib/kpoint/kpoint.sqlite3"  # Defaults to the XDG data dir

[chat]
response_delay_ms = 1000

[logging]
level = "info"
dump_queries = false

[remote_store]
enabled = false
# url = "https://example.com/knowledge"
tool_name = "save_knowledge_point"
"#;

/// Settings loaded from the TOML configuration file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    /// Upstream completions API
    #[serde(default)]
    pub llm: LlmSettings,

    /// Gateway server configuration
    #[serde(default)]
    pub gateway: GatewaySettings,

    /// Persistence configuration
    #[serde(default)]
    pub storage: StorageSettings,

    /// Chat assistant configuration
    #[serde(default)]
    pub chat: ChatSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Best-effort remote tool store
    #[serde(default)]
    pub remote_store: RemoteStoreSettings,
}

/// Upstream OpenAI-compatible completions API.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmSettings {
    /// Base URL; `/chat/completions` is appended
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model identifier sent with every request
    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_llm_temperature")]
    pub temperature: f64,

    /// Token budget cap for extraction responses
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Gateway server settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewaySettings {
    /// Host to bind to
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

/// Persistence settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageSettings {
    /// Override for the SQLite file holding persisted collections
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
}

/// Chat assistant settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatSettings {
    /// Delay before the assistant reply is appended
    #[serde(default = "default_response_delay_ms")]
    pub response_delay_ms: u64,
}

/// Logging settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Dump raw LLM request/response JSON to ./logs/queries/
    #[serde(default)]
    pub dump_queries: bool,
}

/// Remote tool store settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteStoreSettings {
    #[serde(default)]
    pub enabled: bool,

    /// Endpoint receiving tool-call arguments as JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Function name offered to the model
    #[serde(default = "default_remote_tool_name")]
    pub tool_name: String,
}

// Default value functions

fn default_llm_base_url() -> String {
    "https://api.siliconflow.cn/v1".to_string()
}

fn default_llm_model() -> String {
    "Qwen/Qwen2.5-7B-Instruct".to_string()
}

fn default_llm_temperature() -> f64 {
    0.7
}

fn default_llm_max_tokens() -> u32 {
    2000
}

fn default_llm_timeout_seconds() -> u64 {
    60
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}

fn default_response_delay_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_remote_tool_name() -> String {
    "save_knowledge_point".to_string()
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            temperature: default_llm_temperature(),
            max_tokens: default_llm_max_tokens(),
            timeout_seconds: default_llm_timeout_seconds(),
        }
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            response_delay_ms: default_response_delay_ms(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dump_queries: false,
        }
    }
}

impl Default for RemoteStoreSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            tool_name: default_remote_tool_name(),
        }
    }
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error("Data directory not found")]
    DataDirNotFound,
}

impl Settings {
    /// Load settings from the TOML configuration file.
    ///
    /// If the config file doesn't exist, creates it with default values.
    pub fn load() -> Result<Self, SettingsError> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::info!("Creating default configuration at {:?}", config_path);
            Self::create_default_config(&config_path)?;
        }

        let content = fs::read_to_string(&config_path)?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML content.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(content)?;
        Ok(settings)
    }

    /// Get the configuration file path.
    ///
    /// Uses `KPOINT_CONFIG_DIR` when set, else `~/.config/kpoint/config.toml`.
    pub fn config_path() -> Result<PathBuf, SettingsError> {
        if let Ok(override_dir) = std::env::var("KPOINT_CONFIG_DIR") {
            let dir = PathBuf::from(override_dir);
            return Ok(dir.join("config.toml"));
        }

        let config_dir = dirs::config_dir()
            .ok_or(SettingsError::ConfigDirNotFound)?
            .join("kpoint");

        Ok(config_dir.join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, DEFAULT_CONFIG_TOML)?;

        Ok(())
    }

    /// Get the HTTP bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.gateway.host, self.gateway.port)
    }

    /// Resolve the SQLite file for persisted collections.
    pub fn db_path(&self) -> Result<PathBuf, SettingsError> {
        if let Some(path) = &self.storage.db_path {
            return Ok(path.clone());
        }

        let data_dir = dirs::data_dir().ok_or(SettingsError::DataDirNotFound)?;
        Ok(data_dir.join("kpoint").join("kpoint.sqlite3"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_MUTEX;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();

        assert_eq!(settings.llm.base_url, "https://api.siliconflow.cn/v1");
        assert_eq!(settings.llm.temperature, 0.7);
        assert_eq!(settings.llm.max_tokens, 2000);
        assert_eq!(settings.gateway.host, "127.0.0.1");
        assert_eq!(settings.gateway.port, 3000);
        assert_eq!(settings.chat.response_delay_ms, 1000);
        assert_eq!(settings.logging.level, "info");
        assert!(!settings.logging.dump_queries);
        assert!(!settings.remote_store.enabled);
        assert_eq!(settings.remote_store.tool_name, "save_knowledge_point");
        assert!(settings.storage.db_path.is_none());
    }

    #[test]
    fn test_default_file_matches_default_struct() {
        let parsed = Settings::from_toml(DEFAULT_CONFIG_TOML).unwrap();
        let defaults = Settings::default();

        assert_eq!(parsed.llm.base_url, defaults.llm.base_url);
        assert_eq!(parsed.llm.model, defaults.llm.model);
        assert_eq!(parsed.llm.max_tokens, defaults.llm.max_tokens);
        assert_eq!(parsed.bind_addr(), defaults.bind_addr());
        assert_eq!(parsed.chat.response_delay_ms, defaults.chat.response_delay_ms);
        assert_eq!(parsed.remote_store.tool_name, defaults.remote_store.tool_name);
    }

    #[test]
    fn test_bind_addr() {
        let settings = Settings::default();
        assert_eq!(settings.bind_addr(), "127.0.0.1:3000");
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
[llm]
base_url = "http://127.0.0.1:8080/v1"
model = "llama3.1"
max_tokens = 512

[gateway]
host = "0.0.0.0"
port = 8080

[storage]
db_path = "/tmp/kpoint-test.sqlite3"

[chat]
response_delay_ms = 10

[logging]
level = "debug"
dump_queries = true

[remote_store]
enabled = true
url = "https://store.example.com/points"
"#;

        let settings = Settings::from_toml(toml).unwrap();

        assert_eq!(settings.llm.base_url, "http://127.0.0.1:8080/v1");
        assert_eq!(settings.llm.model, "llama3.1");
        assert_eq!(settings.llm.max_tokens, 512);
        assert_eq!(settings.llm.temperature, 0.7);
        assert_eq!(settings.bind_addr(), "0.0.0.0:8080");
        assert_eq!(
            settings.db_path().unwrap(),
            PathBuf::from("/tmp/kpoint-test.sqlite3")
        );
        assert_eq!(settings.chat.response_delay_ms, 10);
        assert_eq!(settings.logging.level, "debug");
        assert!(settings.logging.dump_queries);
        assert!(settings.remote_store.enabled);
        assert_eq!(
            settings.remote_store.url.as_deref(),
            Some("https://store.example.com/points")
        );
        assert_eq!(settings.remote_store.tool_name, "save_knowledge_point");
    }

    #[test]
    fn test_from_toml_partial() {
        let toml = r#"
[gateway]
port = 4100
"#;
        let settings = Settings::from_toml(toml).unwrap();

        assert_eq!(settings.gateway.host, "127.0.0.1");
        assert_eq!(settings.gateway.port, 4100);
        assert_eq!(settings.llm.model, "Qwen/Qwen2.5-7B-Instruct");
    }

    #[test]
    fn test_load_creates_default_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();

        // SAFETY: test-scoped env mutation.
        unsafe { std::env::set_var("KPOINT_CONFIG_DIR", dir.path()) };
        let path = Settings::config_path().unwrap();
        let settings = Settings::load().unwrap();
        // SAFETY: test-scoped env mutation cleanup.
        unsafe { std::env::remove_var("KPOINT_CONFIG_DIR") };

        assert_eq!(path, dir.path().join("config.toml"));
        assert!(path.exists());
        assert_eq!(settings.gateway.port, 3000);
    }
}
