//! Wallet listing and detail routes.

use std::str::FromStr;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use curafin_core::wallet::types::{OwnerType, WalletFilter, WalletStatus};
use curafin_shared::types::{PageRequest, WalletId};
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use super::{error_response, wallet_error};
use crate::AppState;

/// Creates the wallet routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/wallets", get(list_wallets))
        .route("/wallets/{wallet_id}", get(get_wallet))
}

/// Query parameters for listing wallets.
#[derive(Debug, Deserialize)]
pub struct ListWalletsQuery {
    /// Filter by owner type (patient, specialist, pharmacy, platform).
    pub owner_type: Option<String>,
    /// Filter by status (active, frozen, closed).
    pub status: Option<String>,
}

/// GET `/finance/wallets` - List wallets with balances.
async fn list_wallets(
    State(state): State<AppState>,
    Query(query): Query<ListWalletsQuery>,
) -> impl IntoResponse {
    let owner_type = match query.owner_type.as_deref().map(OwnerType::from_str) {
        None => None,
        Some(Ok(parsed)) => Some(parsed),
        Some(Err(message)) => return error_response(400, "VALIDATION_ERROR", message),
    };

    let status = match query.status.as_deref() {
        None => None,
        Some("active") => Some(WalletStatus::Active),
        Some("frozen") => Some(WalletStatus::Frozen),
        Some("closed") => Some(WalletStatus::Closed),
        Some(other) => {
            return error_response(
                400,
                "VALIDATION_ERROR",
                format!("Unknown wallet status: {other}"),
            );
        }
    };

    let wallets = state.wallets.list_wallets(WalletFilter { owner_type, status });
    Json(json!({ "wallets": wallets })).into_response()
}

/// Query parameters for wallet history.
#[derive(Debug, Deserialize)]
pub struct WalletDetailQuery {
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Batches per page.
    pub limit: Option<u32>,
}

/// GET `/finance/wallets/{wallet_id}` - Wallet detail with its batch
/// history.
async fn get_wallet(
    State(state): State<AppState>,
    Path(wallet_id): Path<Uuid>,
    Query(query): Query<WalletDetailQuery>,
) -> impl IntoResponse {
    let wallet_id = WalletId::from_uuid(wallet_id);

    let wallet = match state.wallets.get_wallet(wallet_id) {
        Ok(wallet) => wallet,
        Err(e) => return wallet_error(&e),
    };

    let page = PageRequest {
        page: query.page.unwrap_or(1),
        per_page: query.limit.unwrap_or(20),
    };
    match state.wallets.get_transaction_history(wallet_id, page) {
        Ok(history) => Json(json!({
            "wallet": wallet,
            "transactions": history,
        }))
        .into_response(),
        Err(e) => {
            error!(error = %e, %wallet_id, "Failed to load wallet history");
            wallet_error(&e)
        }
    }
}
