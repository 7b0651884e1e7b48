//! Chart of accounts routes.

use std::str::FromStr;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use curafin_core::accounts::types::{AccountFilter, AccountType, CreateAccountInput};
use curafin_shared::types::{Money, PageRequest};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::{account_error, error_response, report_error};
use crate::AppState;

/// Creates the account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts))
        .route("/accounts", post(create_account))
        .route("/accounts/{code}", get(get_account))
        .route("/accounts/{code}/deactivate", post(deactivate_account))
        .route("/accounts/{code}/reactivate", post(reactivate_account))
        .route("/accounts/{code}/statement", get(account_statement))
}

/// Query parameters for listing accounts.
#[derive(Debug, Deserialize)]
pub struct ListAccountsQuery {
    /// Filter by account type.
    #[serde(rename = "type")]
    pub account_type: Option<String>,
    /// Filter by active status.
    pub active: Option<bool>,
}

/// GET `/finance/accounts` - List accounts with live balances.
async fn list_accounts(
    State(state): State<AppState>,
    Query(query): Query<ListAccountsQuery>,
) -> impl IntoResponse {
    let account_type = match query.account_type.as_deref().map(AccountType::from_str) {
        None => None,
        Some(Ok(parsed)) => Some(parsed),
        Some(Err(message)) => return error_response(400, "VALIDATION_ERROR", message),
    };

    let accounts = state.engine.chart().list_accounts(AccountFilter {
        account_type,
        is_active: query.active,
    });
    Json(json!({ "accounts": accounts })).into_response()
}

/// Request body for creating an account.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// Account code (must be unique).
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type: asset, liability, equity, revenue, expense.
    #[serde(rename = "type")]
    pub account_type: String,
    /// Optional minimum balance in minor units.
    pub floor: Option<i64>,
}

/// POST `/finance/accounts` - Create an account.
async fn create_account(
    State(state): State<AppState>,
    Json(payload): Json<CreateAccountRequest>,
) -> impl IntoResponse {
    let account_type = match AccountType::from_str(&payload.account_type) {
        Ok(parsed) => parsed,
        Err(message) => return error_response(400, "VALIDATION_ERROR", message),
    };

    let input = CreateAccountInput {
        code: payload.code,
        name: payload.name,
        account_type,
        floor: payload.floor.map(Money::from_minor_units),
    };

    match state.engine.chart().create_account(input) {
        Ok(account) => {
            info!(code = %account.code, "Account created via API");
            (StatusCode::CREATED, Json(json!({ "account": account }))).into_response()
        }
        Err(e) => account_error(&e),
    }
}

/// GET `/finance/accounts/{code}` - One account with its live balance.
async fn get_account(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> impl IntoResponse {
    match state.engine.chart().get_account(&code) {
        Ok(account) => Json(json!({ "account": account })).into_response(),
        Err(e) => account_error(&e),
    }
}

/// POST `/finance/accounts/{code}/deactivate` - Soft-disable an
/// account. Always allowed; the response carries an activity warning.
async fn deactivate_account(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> impl IntoResponse {
    match state.engine.chart().deactivate_account(&code) {
        Ok(outcome) => Json(json!({
            "account": outcome.account,
            "warning": outcome
                .had_activity
                .then_some("ACCOUNT_HAS_ACTIVITY_WARNING"),
        }))
        .into_response(),
        Err(e) => account_error(&e),
    }
}

/// POST `/finance/accounts/{code}/reactivate` - Re-enable postings to
/// a deactivated account.
async fn reactivate_account(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> impl IntoResponse {
    match state.engine.chart().reactivate_account(&code) {
        Ok(account) => Json(json!({ "account": account })).into_response(),
        Err(e) => account_error(&e),
    }
}

/// Query parameters for an account statement.
#[derive(Debug, Deserialize)]
pub struct StatementQuery {
    /// Period start (inclusive).
    pub from: Option<DateTime<Utc>>,
    /// Period end (inclusive).
    pub to: Option<DateTime<Utc>>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Entries per page.
    pub limit: Option<u32>,
}

/// GET `/finance/accounts/{code}/statement` - Chronological entries
/// with running balances plus period totals.
async fn account_statement(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<StatementQuery>,
) -> impl IntoResponse {
    let page = PageRequest {
        page: query.page.unwrap_or(1),
        per_page: query.limit.unwrap_or(50),
    };

    match state
        .reports
        .account_statement(&code, query.from, query.to, page)
    {
        Ok(statement) => Json(statement).into_response(),
        Err(e) => report_error(&e),
    }
}
