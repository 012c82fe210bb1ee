pub mod config;
pub mod message;
pub mod point;

// Config re-exports
pub use config::{
    ChatSettings, Config, ConfigError, GatewaySettings, LlmSettings, LoggingSettings,
    RemoteStoreSettings, Secrets, SecretsError, Settings, SettingsError, StorageSettings,
};

// Model re-exports
pub use message::ChatMessage;
pub use point::{KnowledgePoint, TITLE_ELLIPSIS, TITLE_MAX_CHARS, point_id, truncate_title};
