//! Chat message ingestion
//!
//! Lets the dashboard's chat box feed the same pipeline as the messaging
//! channel. The reply that would have gone out over the channel is returned
//! in the response body instead.

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use tally_core::TransactionSource;

use crate::channel::InboundMessage;
use crate::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    pub owner_id: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
}

/// POST /api/messages - Ingest a chat message
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatMessage>,
) -> Result<Json<ChatReply>, AppError> {
    if body.text.trim().is_empty() {
        return Err(AppError::bad_request("Message text cannot be empty"));
    }

    let message = InboundMessage {
        sender_id: body.owner_id,
        text: body.text,
        occurred_at: Utc::now(),
        media_type: Default::default(),
    };
    let reply = state
        .pipeline
        .handle_message(&message, TransactionSource::Chat)
        .await?;

    Ok(Json(ChatReply { reply }))
}
