//! Raw ledger entry listing route.

use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use curafin_shared::types::PageRequest;
use serde::Deserialize;

use crate::AppState;

/// Creates the ledger routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/ledger", get(list_entries))
}

/// Query parameters for listing ledger entries.
#[derive(Debug, Deserialize)]
pub struct ListEntriesQuery {
    /// Restrict to one account code.
    pub account: Option<String>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Entries per page.
    pub limit: Option<u32>,
}

/// GET `/finance/ledger` - List posted entries newest-first.
async fn list_entries(
    State(state): State<AppState>,
    Query(query): Query<ListEntriesQuery>,
) -> impl IntoResponse {
    let page = PageRequest {
        page: query.page.unwrap_or(1),
        per_page: query.limit.unwrap_or(50),
    };

    Json(state.engine.list_entries(query.account.as_deref(), page))
}
