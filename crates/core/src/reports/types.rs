//! Report data types.

use chrono::{DateTime, Utc};
use curafin_shared::types::{Money, PageResponse};
use serde::{Deserialize, Serialize};

use crate::accounts::types::AccountType;
use crate::ledger::batch::{BatchCategory, BatchStatus};
use crate::ledger::entry::LedgerEntry;
use crate::wallet::types::OwnerType;

/// One account row in a trial balance.
///
/// A positive normal-sense balance lands in the account's normal
/// column; a negative one lands in the opposite column, per standard
/// trial-balance presentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Debit-column amount.
    pub debit: Money,
    /// Credit-column amount.
    pub credit: Money,
}

/// Trial balance totals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrialBalanceTotals {
    /// Sum of the debit column.
    pub debits_total: Money,
    /// Sum of the credit column.
    pub credits_total: Money,
    /// Whether the books balance. A `false` here is an engine defect,
    /// not a caller error.
    pub is_balanced: bool,
}

/// Trial balance report across the whole chart of accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialBalanceReport {
    /// Point in time the balances are taken at (`None` = now).
    pub as_of: Option<DateTime<Utc>>,
    /// Per-account rows, sorted by code.
    pub rows: Vec<TrialBalanceRow>,
    /// Column totals.
    pub totals: TrialBalanceTotals,
}

/// Wallet-vs-liability reconciliation for one owner type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// The owner type reconciled.
    pub owner_type: OwnerType,
    /// Number of wallets included (active and frozen).
    pub wallet_count: usize,
    /// Sum of available + held + pending across those wallets.
    pub wallet_total: Money,
    /// The backing liability account.
    pub liability_account: String,
    /// The liability account's live balance.
    pub liability_balance: Money,
    /// `wallet_total - liability_balance`.
    pub difference: Money,
    /// True when the difference is zero. A nonzero difference is
    /// surfaced, never silently corrected.
    pub is_reconciled: bool,
}

/// Paginated account statement with running balances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountStatement {
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Period start (inclusive), if bounded.
    pub from: Option<DateTime<Utc>>,
    /// Period end (inclusive), if bounded.
    pub to: Option<DateTime<Utc>>,
    /// Balance entering the period.
    pub opening_balance: Money,
    /// Sum of debit entries in the period.
    pub total_debits: Money,
    /// Sum of credit entries in the period.
    pub total_credits: Money,
    /// Balance leaving the period.
    pub closing_balance: Money,
    /// Chronological entries; each carries its running balance in
    /// `balance_after`.
    pub lines: PageResponse<LedgerEntry>,
}

/// Revenue recognized against one revenue account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueLine {
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Net revenue (credits minus debits) in the period.
    pub amount: Money,
}

/// Posted activity grouped by batch category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryActivity {
    /// Batch category.
    pub category: BatchCategory,
    /// Number of posted batches.
    pub batch_count: usize,
    /// Sum of batch totals (debit side).
    pub amount: Money,
}

/// Revenue report over a period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueReport {
    /// Period start (inclusive), if bounded.
    pub from: Option<DateTime<Utc>>,
    /// Period end (inclusive), if bounded.
    pub to: Option<DateTime<Utc>>,
    /// Per-account revenue lines.
    pub lines: Vec<RevenueLine>,
    /// Total net revenue in the period.
    pub total_revenue: Money,
    /// Posted activity by batch category.
    pub by_category: Vec<CategoryActivity>,
}

/// Wallet totals for one owner type on the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletGroupSummary {
    /// The owner type.
    pub owner_type: OwnerType,
    /// Number of wallets (all statuses).
    pub wallet_count: usize,
    /// Sum of available balances.
    pub available_total: Money,
    /// Sum of held balances.
    pub held_total: Money,
    /// Sum of pending balances.
    pub pending_total: Money,
    /// The backing liability account, when mapped.
    pub liability_account: Option<String>,
    /// The liability account's live balance, when mapped.
    pub liability_balance: Option<Money>,
}

/// Batch counts by status.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BatchStatusCounts {
    /// Batches currently posted.
    pub posted: usize,
    /// Batches that were posted and later reversed.
    pub reversed: usize,
    /// Batches rejected with no entries created.
    pub failed: usize,
    /// Total batches accepted or rejected.
    pub total: usize,
}

impl BatchStatusCounts {
    /// Adds one batch of the given status to the counts.
    pub fn record(&mut self, status: BatchStatus) {
        match status {
            BatchStatus::Posted => self.posted += 1,
            BatchStatus::Reversed => self.reversed += 1,
            BatchStatus::Failed => self.failed += 1,
            BatchStatus::Pending => {}
        }
        self.total += 1;
    }
}

/// Finance dashboard summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    /// Wallet totals per owner type.
    pub wallets: Vec<WalletGroupSummary>,
    /// Batch counts by status.
    pub batches: BatchStatusCounts,
    /// Number of accounts in the chart.
    pub account_count: usize,
    /// Number of posted ledger entries.
    pub entry_count: usize,
    /// Whether the trial balance currently balances.
    pub trial_balance_ok: bool,
}
