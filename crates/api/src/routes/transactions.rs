//! Transaction batch listing routes.

use std::str::FromStr;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use curafin_core::ledger::{BatchCategory, BatchFilter, BatchStatus};
use curafin_shared::types::{BatchId, PageRequest};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{error_response, ledger_error};
use crate::AppState;

/// Creates the transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions))
        .route("/transactions/{batch_id}", get(get_transaction))
}

/// Query parameters for listing batches.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// Filter by category (e.g. WALLET_TOPUP).
    pub category: Option<String>,
    /// Filter by status (posted, failed, reversed).
    pub status: Option<String>,
    /// Only batches created at or after this instant.
    pub from: Option<DateTime<Utc>>,
    /// Only batches created at or before this instant.
    pub to: Option<DateTime<Utc>>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Batches per page.
    pub limit: Option<u32>,
}

/// GET `/finance/transactions` - List batches newest-first.
async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<ListTransactionsQuery>,
) -> impl IntoResponse {
    let category = match query.category.as_deref().map(BatchCategory::from_str) {
        None => None,
        Some(Ok(parsed)) => Some(parsed),
        Some(Err(message)) => return error_response(400, "VALIDATION_ERROR", message),
    };

    let status = match query.status.as_deref() {
        None => None,
        Some("pending") => Some(BatchStatus::Pending),
        Some("posted") => Some(BatchStatus::Posted),
        Some("failed") => Some(BatchStatus::Failed),
        Some("reversed") => Some(BatchStatus::Reversed),
        Some(other) => {
            return error_response(
                400,
                "VALIDATION_ERROR",
                format!("Unknown batch status: {other}"),
            );
        }
    };

    let filter = BatchFilter {
        category,
        status,
        from: query.from,
        to: query.to,
    };
    let page = PageRequest {
        page: query.page.unwrap_or(1),
        per_page: query.limit.unwrap_or(20),
    };

    Json(state.engine.list_batches(&filter, page)).into_response()
}

/// GET `/finance/transactions/{batch_id}` - One batch with its entries.
async fn get_transaction(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.engine.get_batch(BatchId::from_uuid(batch_id)) {
        Ok(batch) => Json(json!({ "transaction": batch })).into_response(),
        Err(e) => ledger_error(&e),
    }
}
