//! Channel session handlers
//!
//! Status and lifecycle controls for the dashboard, plus the webhook the
//! gateway process pushes events into.

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::channel::{ChannelEvent, ChannelStatus, InboundMessage};
use crate::{AppError, AppState, SuccessResponse};

/// GET /api/channel/status - Current session snapshot
pub async fn get_channel_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ChannelStatus>, AppError> {
    Ok(Json(state.manager.status()))
}

/// POST /api/channel/connect - Begin connecting (no-op when already in flight)
pub async fn connect_channel(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ChannelStatus>, AppError> {
    state
        .manager
        .start()
        .await
        .map_err(|e| AppError::bad_gateway(&e.to_string()))?;
    Ok(Json(state.manager.status()))
}

/// POST /api/channel/disconnect - Tear down and suppress auto-reconnect
pub async fn disconnect_channel(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ChannelStatus>, AppError> {
    state.manager.disconnect().await?;
    Ok(Json(state.manager.status()))
}

/// POST /api/channel/reconnect - Tear down and start a fresh session
pub async fn reconnect_channel(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ChannelStatus>, AppError> {
    state
        .manager
        .reconnect()
        .await
        .map_err(|e| AppError::bad_gateway(&e.to_string()))?;
    Ok(Json(state.manager.status()))
}

/// POST /api/channel/event - Gateway webhook for lifecycle and message events
pub async fn channel_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<ChannelEvent>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.manager.handle_event(event).await;
    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/channel/inbound - Direct inbound message injection
///
/// Same path as a gateway `message` event; useful for development and for
/// gateways that deliver messages on a dedicated endpoint.
pub async fn inbound_message(
    State(state): State<Arc<AppState>>,
    Json(message): Json<InboundMessage>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.manager.handle_event(ChannelEvent::Message(message)).await;
    Ok(Json(SuccessResponse { success: true }))
}
