//! Transaction and summary handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use tally_core::{MonthlySummary, NewTransaction, Transaction, RECENT_WINDOW};

use crate::broadcast::WireEvent;
use crate::{AppError, AppState, SuccessResponse, MAX_PAGE_LIMIT};

use super::OwnerQuery;

/// Query parameters for listing transactions
#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    pub owner: String,
    pub limit: Option<i64>,
}

/// GET /api/transactions - Recent transactions, newest first
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TransactionQuery>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let limit = params.limit.unwrap_or(RECENT_WINDOW);
    if limit <= 0 || limit > MAX_PAGE_LIMIT {
        return Err(AppError::bad_request(&format!(
            "limit must be between 1 and {}",
            MAX_PAGE_LIMIT
        )));
    }

    let transactions = state.db.list_recent_transactions(&params.owner, limit)?;
    Ok(Json(transactions))
}

/// POST /api/transactions - Record a transaction directly (manual entry)
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    Json(new): Json<ManualTransaction>,
) -> Result<Json<Transaction>, AppError> {
    let transaction = state.db.create_transaction(&new.into_new())?;

    state
        .broadcaster
        .broadcast(
            &transaction.owner_id,
            &WireEvent::new("new_transaction", serde_json::to_value(&transaction)?),
        )
        .await;

    Ok(Json(transaction))
}

/// Manual entry body; occurred_at defaults to now
#[derive(Debug, Deserialize)]
pub struct ManualTransaction {
    pub owner_id: String,
    pub kind: tally_core::TransactionKind,
    pub amount: f64,
    #[serde(default = "default_category")]
    pub category: String,
    pub description: String,
    pub occurred_at: Option<chrono::DateTime<chrono::Utc>>,
}

fn default_category() -> String {
    "Other".to_string()
}

impl ManualTransaction {
    fn into_new(self) -> NewTransaction {
        NewTransaction {
            owner_id: self.owner_id,
            kind: self.kind,
            amount: self.amount,
            category: self.category,
            description: self.description,
            occurred_at: self.occurred_at.unwrap_or_else(chrono::Utc::now),
            source: tally_core::TransactionSource::Manual,
            raw_text: None,
        }
    }
}

/// DELETE /api/transactions/:id - Remove a transaction
pub async fn delete_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(params): Query<OwnerQuery>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_transaction(&params.owner, id)?;

    state
        .broadcaster
        .broadcast(
            &params.owner,
            &WireEvent::new("transaction_deleted", serde_json::json!({ "id": id })),
        )
        .await;

    Ok(Json(SuccessResponse { success: true }))
}

/// DELETE /api/transactions - Clear all of an owner's transactions
pub async fn clear_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OwnerQuery>,
) -> Result<Json<SuccessResponse>, AppError> {
    let removed = state.db.clear_transactions(&params.owner)?;

    state
        .broadcaster
        .broadcast(
            &params.owner,
            &WireEvent::new(
                "transactions_cleared",
                serde_json::json!({ "removed": removed }),
            ),
        )
        .await;

    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/summary - Current-month income/expense/balance
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OwnerQuery>,
) -> Result<Json<MonthlySummary>, AppError> {
    Ok(Json(state.db.monthly_summary(&params.owner)?))
}
