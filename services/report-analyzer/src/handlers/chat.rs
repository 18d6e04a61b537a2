use axum::{
    extract::{Path, State},
    response::Json,
};
use brandlens_models::ChatMessage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ApiError;
use crate::presentation::render_markdown;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// The assistant's reply with its markdown already rendered for the page
#[derive(Debug, Serialize)]
pub struct ChatReply {
    #[serde(flatten)]
    pub message: ChatMessage,
    pub html: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: ChatReply,
    pub transcript: Vec<ChatMessage>,
    /// The reply is the fixed failure message
    pub failed: bool,
}

pub async fn get_transcript(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    Ok(Json(state.service.transcript(id).await?))
}

pub async fn send_chat_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let turn = state.service.chat(id, &request.message).await?;

    Ok(Json(ChatResponse {
        reply: ChatReply {
            html: render_markdown(&turn.reply.content),
            message: turn.reply,
        },
        transcript: turn.transcript,
        failed: turn.failed,
    }))
}
