mod api_doc;
mod caller;
mod config;
mod error;
mod handlers;
mod models;
mod routes;
mod spanner;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use config::{Config, StoreBackend};
use spanner::SpannerLinkStore;
use state::AppState;
use store::{LinkStore, MemoryLinkStore};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("spanner-shortlink starting");

    let config = Config::from_env()?;
    config.log_startup();

    // One store client per process, shared by every request
    let store: Arc<dyn LinkStore> = match &config.store_backend {
        StoreBackend::Spanner(spanner) => Arc::new(SpannerLinkStore::from_config(spanner).await?),
        StoreBackend::Memory => Arc::new(MemoryLinkStore::new()),
    };

    let addr = format!("{}:{}", config.service_host, config.service_port);
    let state = AppState {
        store,
        config: Arc::new(config),
    };
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    tracing::info!("spanner-shortlink stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
