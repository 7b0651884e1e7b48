//! Reconciliation and reporting: trial balance, wallet reconciliation,
//! account statements, revenue, and the finance dashboard.

pub mod error;
pub mod service;
pub mod types;

pub use error::ReportError;
pub use service::Reports;
pub use types::{
    AccountStatement, BatchStatusCounts, CategoryActivity, DashboardSummary,
    ReconciliationReport, RevenueLine, RevenueReport, TrialBalanceReport, TrialBalanceRow,
    TrialBalanceTotals, WalletGroupSummary,
};
