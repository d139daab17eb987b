//! Alert handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use tally_core::Alert;

use crate::{AppError, AppState, SuccessResponse};

use super::OwnerQuery;

/// Query parameters for listing alerts
#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    pub owner: String,
    #[serde(default)]
    pub include_read: bool,
}

/// GET /api/alerts - List alerts, newest first
pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AlertQuery>,
) -> Result<Json<Vec<Alert>>, AppError> {
    let alerts = state.db.list_alerts(&params.owner, params.include_read)?;
    Ok(Json(alerts))
}

/// POST /api/alerts/:id/read - Mark an alert as read (one-way)
pub async fn mark_alert_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(params): Query<OwnerQuery>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.mark_alert_read(&params.owner, id)?;
    Ok(Json(SuccessResponse { success: true }))
}
