//! Finance dashboard route.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use tracing::error;

use super::report_error;
use crate::AppState;

/// Creates the dashboard routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

/// GET `/finance/dashboard` - Wallet totals, batch counts, and the
/// live trial-balance flag.
async fn dashboard(State(state): State<AppState>) -> impl IntoResponse {
    match state.reports.dashboard_summary() {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to build dashboard summary");
            report_error(&e)
        }
    }
}
