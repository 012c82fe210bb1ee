use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kpoint_db::PersistenceGateway;
use kpoint_gateway::server;
use kpoint_gateway::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Reads .env too. Loaded before tracing so the configured level applies
    let config = kpoint_core::Config::load()?;

    let default_level = config.settings.logging.level.clone();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_level.into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Configuration loaded (model: {} at {})",
        config.settings.llm.model, config.settings.llm.base_url
    );

    let db_path = config.settings.db_path()?;
    let persistence = PersistenceGateway::open(&db_path).await?;
    info!("Persistence initialized at {}", db_path.display());

    if config.remote_store_enabled() {
        info!("Remote tool store enabled");
    }

    let state = AppState::from_config(&config, persistence).await?;

    let bind_addr = config.bind_addr();
    server::run(state, &bind_addr).await
}
