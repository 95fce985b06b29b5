use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::config::settings;
use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "environment": settings::environment(&state.config),
    }))
}

pub async fn ready(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ready",
        "message": "All services ready",
    }))
}

pub async fn root(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "message": "Welcome to Air India Assistant API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
