//! Vault API Server
//!
//! Loads configuration from `VAULT_CONFIG` (TOML) when set, then applies
//! environment overrides.
//!
//! Author: hephaex@gmail.com

use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vault_api::{create_router, state::AppState};
use vault_core::{AppConfig, LoggingConfig};
use vault_store::RecordStore;

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", logging.level)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config() -> anyhow::Result<AppConfig> {
    let config = match std::env::var("VAULT_CONFIG") {
        Ok(path) => AppConfig::from_file(path)?.with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_tracing(&config.logging);

    let store = RecordStore::from_config(&config)?;
    tracing::info!(
        collection = %config.vector.collection,
        can_decrypt = store.can_decrypt(),
        "Record store configured"
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, store));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Vault API Server starting on http://{}", addr);
    tracing::info!("OpenAPI document at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
