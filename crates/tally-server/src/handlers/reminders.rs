//! Reminder handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use tally_core::{NewReminder, Reminder};

use crate::broadcast::WireEvent;
use crate::{AppError, AppState};

/// Query parameters for listing reminders
#[derive(Debug, Deserialize)]
pub struct ReminderQuery {
    pub owner: String,
    /// Include done and cancelled reminders
    #[serde(default)]
    pub include_terminal: bool,
}

/// GET /api/reminders - List reminders, soonest due first
pub async fn list_reminders(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReminderQuery>,
) -> Result<Json<Vec<Reminder>>, AppError> {
    let reminders = state
        .db
        .list_reminders(&params.owner, params.include_terminal)?;
    Ok(Json(reminders))
}

/// POST /api/reminders - Create a reminder
pub async fn create_reminder(
    State(state): State<Arc<AppState>>,
    Json(mut new): Json<NewReminder>,
) -> Result<Json<Reminder>, AppError> {
    if new.lead_days.is_none() {
        new.lead_days = Some(state.settings.default_lead_days);
    }
    let reminder = state.db.create_reminder(&new)?;
    Ok(Json(reminder))
}

/// Response for completing a reminder: the done reminder plus the forked
/// next occurrence when it recurs
#[derive(Debug, Serialize)]
pub struct CompleteResponse {
    pub completed: Reminder,
    pub next: Option<Reminder>,
}

/// POST /api/reminders/:id/complete - Mark done, forking the next occurrence
pub async fn complete_reminder(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<CompleteResponse>, AppError> {
    let (completed, next) = state.db.complete_reminder(id)?;

    if let Some(ref forked) = next {
        state
            .broadcaster
            .broadcast(
                &forked.owner_id,
                &WireEvent::new("reminder_created", serde_json::to_value(forked)?),
            )
            .await;
    }

    Ok(Json(CompleteResponse { completed, next }))
}

/// POST /api/reminders/:id/cancel - Cancel a reminder
pub async fn cancel_reminder(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Reminder>, AppError> {
    Ok(Json(state.db.cancel_reminder(id)?))
}
