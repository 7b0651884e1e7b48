//! API route definitions.

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::AppState;

pub mod accounts;
pub mod dashboard;
pub mod health;
pub mod journal;
pub mod ledger;
pub mod reports;
pub mod transactions;
pub mod wallets;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    let finance = Router::new()
        .merge(dashboard::routes())
        .merge(wallets::routes())
        .merge(transactions::routes())
        .merge(ledger::routes())
        .merge(accounts::routes())
        .merge(reports::routes())
        .merge(journal::routes());

    Router::new()
        .merge(health::routes())
        .nest("/finance", finance)
}

/// Builds the standard JSON error envelope.
pub(crate) fn error_response(status: u16, code: &str, message: String) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message,
        })),
    )
        .into_response()
}

/// Maps a ledger error to the standard envelope.
pub(crate) fn ledger_error(err: &curafin_core::ledger::LedgerError) -> Response {
    error_response(err.http_status_code(), err.error_code(), err.to_string())
}

/// Maps a wallet error to the standard envelope.
pub(crate) fn wallet_error(err: &curafin_core::wallet::WalletError) -> Response {
    error_response(err.http_status_code(), err.error_code(), err.to_string())
}

/// Maps a report error to the standard envelope.
pub(crate) fn report_error(err: &curafin_core::reports::ReportError) -> Response {
    error_response(err.http_status_code(), err.error_code(), err.to_string())
}

/// Maps an account error to the standard envelope.
pub(crate) fn account_error(err: &curafin_core::accounts::AccountError) -> Response {
    error_response(err.http_status_code(), err.error_code(), err.to_string())
}
