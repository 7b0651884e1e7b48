//! Reporting routes: trial balance, reconciliation, revenue.

use std::str::FromStr;

use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use curafin_core::wallet::types::OwnerType;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::{error_response, report_error};
use crate::AppState;

/// Creates the report routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reports/trial-balance", get(trial_balance))
        .route("/reports/reconciliation", get(reconciliation))
        .route("/reports/revenue", get(revenue))
}

/// Query parameters for the trial balance.
#[derive(Debug, Deserialize)]
pub struct TrialBalanceQuery {
    /// Point in time to balance at (defaults to now).
    pub as_of: Option<DateTime<Utc>>,
}

/// GET `/finance/reports/trial-balance` - Prove the books balance.
async fn trial_balance(
    State(state): State<AppState>,
    Query(query): Query<TrialBalanceQuery>,
) -> impl IntoResponse {
    match state.reports.trial_balance(query.as_of) {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to build trial balance");
            report_error(&e)
        }
    }
}

/// Query parameters for reconciliation.
#[derive(Debug, Deserialize)]
pub struct ReconciliationQuery {
    /// Restrict to one owner type; all mapped types otherwise.
    pub owner_type: Option<String>,
}

/// GET `/finance/reports/reconciliation` - Prove wallets sum to their
/// backing liability accounts.
async fn reconciliation(
    State(state): State<AppState>,
    Query(query): Query<ReconciliationQuery>,
) -> impl IntoResponse {
    match query.owner_type.as_deref().map(OwnerType::from_str) {
        None => match state.reports.reconcile_all_wallets() {
            Ok(reports) => Json(json!({ "reconciliations": reports })).into_response(),
            Err(e) => report_error(&e),
        },
        Some(Ok(owner_type)) => match state.reports.reconcile_wallets(owner_type) {
            Ok(report) => Json(report).into_response(),
            Err(e) => report_error(&e),
        },
        Some(Err(message)) => error_response(400, "VALIDATION_ERROR", message),
    }
}

/// Query parameters for the revenue report.
#[derive(Debug, Deserialize)]
pub struct RevenueQuery {
    /// Period start (inclusive).
    pub from: Option<DateTime<Utc>>,
    /// Period end (inclusive).
    pub to: Option<DateTime<Utc>>,
}

/// GET `/finance/reports/revenue` - Revenue accounts and posted
/// activity by category.
async fn revenue(
    State(state): State<AppState>,
    Query(query): Query<RevenueQuery>,
) -> impl IntoResponse {
    match state.reports.revenue_report(query.from, query.to) {
        Ok(report) => Json(report).into_response(),
        Err(e) => report_error(&e),
    }
}
