use std::env;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use maharaja_backend::core::config::{settings, AppPaths};
use maharaja_backend::core::logging;
use maharaja_backend::server;
use maharaja_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let state = AppState::initialize(paths).await?;

    let host = env::var("BACKEND_HOST").unwrap_or_else(|_| settings::server_host(&state.config));
    let port = env::var("BACKEND_PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or_else(|| settings::server_port(&state.config));
    let bind_addr = format!("{}:{}", host, port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    let app: Router = server::router::router(state.clone());
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
