mod config;
mod error;
mod models;
mod routes;
mod services;
mod session;
mod utils;

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::Config;
use crate::routes::AppState;
use crate::services::llm::LLMClient;
use crate::session::SessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        "using {:?} backend at {} (model {})",
        config.llm.style,
        config.llm.api_url,
        config.llm.model
    );

    let sessions = Arc::new(SessionStore::new(config.session_ttl));
    spawn_session_sweeper(Arc::clone(&sessions));

    let app_state = AppState {
        generator: Arc::new(LLMClient::new(&config.llm)),
        sessions,
    };

    let app = routes::router(app_state, config.max_body_bytes);

    let listener = TcpListener::bind(config.bind).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Drops idle sessions even when no new ones are being created.
fn spawn_session_sweeper(sessions: Arc<SessionStore>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sessions.idle_ttl());
        loop {
            ticker.tick().await;
            sessions.evict_idle();
        }
    });
}
