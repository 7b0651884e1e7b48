//! Manual posting routes: admin journal entries and operating-fund
//! top-ups.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use curafin_core::ledger::{BatchCategory, EntryInput, EntryType, PostBatchInput};
use curafin_shared::AppError;
use curafin_shared::types::Money;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use super::{error_response, ledger_error, wallet_error};
use crate::AppState;

/// Creates the manual posting routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/journal-entry", post(journal_entry))
        .route("/fund-operating-account", post(fund_operating_account))
}

/// One line of a manual journal entry.
#[derive(Debug, Deserialize)]
pub struct JournalLine {
    /// Account code to post to.
    pub account_code: String,
    /// "debit" or "credit".
    #[serde(rename = "type")]
    pub entry_type: String,
    /// Amount in minor units (must be positive).
    pub amount: i64,
    /// Optional line description.
    pub description: Option<String>,
}

/// Request body for a manual journal entry.
#[derive(Debug, Deserialize)]
pub struct JournalEntryRequest {
    /// Description of the adjustment.
    pub description: String,
    /// The balanced entries (at least 2).
    pub entries: Vec<JournalLine>,
    /// Optional idempotency key.
    pub idempotency_key: Option<String>,
}

/// POST `/finance/journal-entry` - Post an admin-initiated batch.
async fn journal_entry(
    State(state): State<AppState>,
    Json(payload): Json<JournalEntryRequest>,
) -> impl IntoResponse {
    let mut entries = Vec::with_capacity(payload.entries.len());
    for line in payload.entries {
        let entry_type = match line.entry_type.to_lowercase().as_str() {
            "debit" => EntryType::Debit,
            "credit" => EntryType::Credit,
            other => {
                return error_response(
                    400,
                    "VALIDATION_ERROR",
                    format!("Entry type must be debit or credit, got: {other}"),
                );
            }
        };
        entries.push(EntryInput {
            account_code: line.account_code,
            entry_type,
            amount: Money::from_minor_units(line.amount),
            description: line.description,
        });
    }

    let mut input = PostBatchInput::new(BatchCategory::Journal, payload.description, entries);
    input.idempotency_key = payload.idempotency_key;

    match state.engine.post_batch(input) {
        Ok(posted) => {
            info!(
                batch_id = %posted.batch.batch_id,
                replayed = posted.replayed,
                "Manual journal entry posted"
            );
            (
                StatusCode::CREATED,
                Json(json!({
                    "transaction": posted.batch,
                    "replayed": posted.replayed,
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Manual journal entry rejected");
            ledger_error(&e)
        }
    }
}

/// Request body for funding the platform's operating wallet.
#[derive(Debug, Deserialize)]
pub struct FundOperatingRequest {
    /// Amount in minor units (must be positive).
    pub amount: i64,
    /// Optional idempotency key.
    pub idempotency_key: Option<String>,
}

/// POST `/finance/fund-operating-account` - Credit the platform's
/// operating wallet from the operating cash account.
async fn fund_operating_account(
    State(state): State<AppState>,
    Json(payload): Json<FundOperatingRequest>,
) -> impl IntoResponse {
    let (Some(wallet_id), Some(operating_account)) = (
        state.platform.wallet_id,
        state.platform.operating_account.clone(),
    ) else {
        let err = AppError::Configuration(
            "Platform wallet or operating account is not configured".to_string(),
        );
        return error_response(err.status_code(), err.error_code(), err.to_string());
    };

    match state.wallets.credit(
        wallet_id,
        Money::from_minor_units(payload.amount),
        BatchCategory::OperatingFund,
        &operating_account,
        payload.idempotency_key,
    ) {
        Ok(receipt) => {
            info!(
                %wallet_id,
                batch_id = %receipt.batch_id,
                new_balance = %receipt.new_balance,
                "Operating wallet funded"
            );
            (
                StatusCode::CREATED,
                Json(json!({
                    "new_balance": receipt.new_balance,
                    "batch_id": receipt.batch_id,
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Operating fund top-up rejected");
            wallet_error(&e)
        }
    }
}
