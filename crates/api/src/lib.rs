//! HTTP API layer with Axum routes.
//!
//! This crate exposes the finance reporting surface consumed by admin
//! dashboards, plus the manual journal-entry and operating-fund
//! endpoints. All financial semantics live in `curafin-core`; handlers
//! only translate between HTTP and the engine.

pub mod routes;

use std::sync::Arc;

use axum::Router;
use curafin_core::ledger::LedgerEngine;
use curafin_core::reports::Reports;
use curafin_core::wallet::WalletService;
use curafin_shared::types::WalletId;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Platform-level accounts wired at bootstrap.
#[derive(Clone, Default)]
pub struct PlatformAccounts {
    /// The platform's own operating wallet.
    pub wallet_id: Option<WalletId>,
    /// The operating cash account funding flows draw from.
    pub operating_account: Option<String>,
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The posting engine and chart of accounts.
    pub engine: Arc<LedgerEngine>,
    /// The wallet service.
    pub wallets: Arc<WalletService>,
    /// Report generator.
    pub reports: Arc<Reports>,
    /// Platform bootstrap accounts.
    pub platform: PlatformAccounts,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
