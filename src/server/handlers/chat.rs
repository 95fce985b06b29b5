use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    pub session_id: String,
    pub message: String,
}

fn validate(payload: &ChatRequestBody) -> Result<(), ApiError> {
    if payload.session_id.trim().is_empty() {
        return Err(ApiError::BadRequest("session_id must not be empty".to_string()));
    }
    if payload.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }
    Ok(())
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    validate(&payload)?;
    tracing::info!("Received chat request for session {}", payload.session_id);

    let reply = state
        .chat
        .process_message(&payload.session_id, &payload.message)
        .await?;

    Ok(Json(json!({
        "session_id": payload.session_id,
        "message": reply.message,
        "metadata": {
            "role": "assistant",
            "provider": reply.provider,
            "language": reply.language,
        },
    })))
}

pub async fn chat_stream(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    validate(&payload)?;
    tracing::info!(
        "Received streaming chat request for session {}",
        payload.session_id
    );

    let mut chunks = state
        .chat
        .stream_message(&payload.session_id, &payload.message)
        .await?;

    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(32);
    tokio::spawn(async move {
        loop {
            match chunks.recv().await {
                Some(Ok(chunk)) => {
                    let event = Event::default().data(chunk_frame(&chunk));
                    if tx.send(Ok(event)).await.is_err() {
                        return;
                    }
                }
                Some(Err(err)) => {
                    let event = Event::default().data(error_frame(&err));
                    let _ = tx.send(Ok(event)).await;
                    return;
                }
                None => {
                    let event = Event::default().data(done_frame());
                    let _ = tx.send(Ok(event)).await;
                    return;
                }
            }
        }
    });

    Ok(Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default()))
}

pub async fn clear_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state.chat.clear_session(&session_id).await;
    if !removed {
        return Err(ApiError::NotFound(format!("Session {} not found", session_id)));
    }
    Ok(Json(json!({"session_id": session_id, "cleared": true})))
}

fn chunk_frame(chunk: &str) -> String {
    json!({"chunk": chunk}).to_string()
}

fn done_frame() -> String {
    json!({"done": true}).to_string()
}

fn error_frame(err: &ApiError) -> String {
    json!({"error": err.to_string()}).to_string()
}
