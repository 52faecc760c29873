use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fartmap_api::{build_router, AppState};
use fartmap_common::Config;
use fartmap_store::JsonFileStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("fartmap=info".parse()?))
        .init();

    let config = Config::from_env()?;

    let store = Arc::new(JsonFileStore::new(&config.events_path));
    info!(path = %store.path().display(), "Using JSON event file");

    let state = Arc::new(AppState::from_config(store, &config));
    let app = build_router(state);

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("FartMap API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
