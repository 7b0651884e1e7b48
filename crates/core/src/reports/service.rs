//! Reconciliation and reporting over committed ledger state.
//!
//! Reports take no exclusive locks; they read committed snapshots, so
//! they never block the posting path.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use curafin_shared::types::{Money, PageRequest, PageResponse};
use tracing::error;

use crate::accounts::types::{AccountFilter, AccountType, NormalBalance};
use crate::ledger::{LedgerEngine, LedgerEntry};
use crate::wallet::WalletService;
use crate::wallet::types::{OwnerType, WalletFilter, WalletStatus};

use super::error::ReportError;
use super::types::{
    AccountStatement, BatchStatusCounts, CategoryActivity, DashboardSummary,
    ReconciliationReport, RevenueLine, RevenueReport, TrialBalanceReport, TrialBalanceRow,
    TrialBalanceTotals, WalletGroupSummary,
};

/// Report generator over the engine and wallet service.
pub struct Reports {
    engine: Arc<LedgerEngine>,
    wallets: Arc<WalletService>,
}

impl Reports {
    /// Creates a report generator.
    #[must_use]
    pub fn new(engine: Arc<LedgerEngine>, wallets: Arc<WalletService>) -> Self {
        Self { engine, wallets }
    }

    /// Generates a trial balance across the whole chart of accounts.
    ///
    /// With `as_of`, balances come from the latest entry snapshot at or
    /// before that instant; otherwise live balances are used. A report
    /// with `is_balanced == false` indicates an engine defect and is
    /// logged at ERROR.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::AmountOverflow` if totals overflow.
    pub fn trial_balance(
        &self,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<TrialBalanceReport, ReportError> {
        let accounts = self.engine.chart().list_accounts(AccountFilter::default());

        // Balances as of the cutoff, from the entry snapshots.
        let historical: Option<HashMap<String, Money>> = as_of.map(|cutoff| {
            let log = self.engine.entries_log();
            let mut balances = HashMap::new();
            for entry in log.iter().filter(|entry| entry.created_at <= cutoff) {
                balances.insert(entry.account_code.clone(), entry.balance_after);
            }
            balances
        });

        let mut rows = Vec::with_capacity(accounts.len());
        let mut debits_total = Money::ZERO;
        let mut credits_total = Money::ZERO;

        for account in accounts {
            let balance = match &historical {
                Some(balances) => balances
                    .get(&account.code)
                    .copied()
                    .unwrap_or(Money::ZERO),
                None => account.current_balance,
            };

            let (debit, credit) = columns_for(account.normal_balance, balance)?;
            debits_total = debits_total
                .checked_add(debit)
                .ok_or(ReportError::AmountOverflow)?;
            credits_total = credits_total
                .checked_add(credit)
                .ok_or(ReportError::AmountOverflow)?;

            rows.push(TrialBalanceRow {
                code: account.code,
                name: account.name,
                account_type: account.account_type,
                debit,
                credit,
            });
        }

        let is_balanced = debits_total == credits_total;
        if !is_balanced {
            error!(
                debits = %debits_total,
                credits = %credits_total,
                "Trial balance mismatch, books are out of balance"
            );
        }

        Ok(TrialBalanceReport {
            as_of,
            rows,
            totals: TrialBalanceTotals {
                debits_total,
                credits_total,
                is_balanced,
            },
        })
    }

    /// Reconciles all active and frozen wallets of one owner type
    /// against their backing liability account.
    ///
    /// A nonzero difference is logged at ERROR and surfaced in the
    /// report; it is never silently corrected.
    ///
    /// # Errors
    ///
    /// `LiabilityAccountUnmapped` when no liability account is mapped
    /// for the owner type; `AccountNotFound` when the mapped account is
    /// missing from the chart.
    pub fn reconcile_wallets(
        &self,
        owner_type: OwnerType,
    ) -> Result<ReconciliationReport, ReportError> {
        let liability_account = self
            .wallets
            .liability_account_for(owner_type)
            .ok_or(ReportError::LiabilityAccountUnmapped(owner_type))?
            .to_string();

        let liability_balance = self
            .engine
            .chart()
            .get_account(&liability_account)
            .map_err(|_| ReportError::AccountNotFound(liability_account.clone()))?
            .current_balance;

        let included: Vec<_> = self
            .wallets
            .list_wallets(WalletFilter {
                owner_type: Some(owner_type),
                status: None,
            })
            .into_iter()
            .filter(|wallet| wallet.status != WalletStatus::Closed)
            .collect();

        let mut wallet_total = Money::ZERO;
        for wallet in &included {
            for amount in [
                wallet.available_balance,
                wallet.held_balance,
                wallet.pending_balance,
            ] {
                wallet_total = wallet_total
                    .checked_add(amount)
                    .ok_or(ReportError::AmountOverflow)?;
            }
        }

        let difference = wallet_total
            .checked_sub(liability_balance)
            .ok_or(ReportError::AmountOverflow)?;
        let is_reconciled = difference.is_zero();

        if !is_reconciled {
            error!(
                owner_type = %owner_type,
                wallet_total = %wallet_total,
                liability_balance = %liability_balance,
                difference = %difference,
                "Wallet reconciliation mismatch"
            );
        }

        Ok(ReconciliationReport {
            owner_type,
            wallet_count: included.len(),
            wallet_total,
            liability_account,
            liability_balance,
            difference,
            is_reconciled,
        })
    }

    /// Reconciles every owner type that has a mapped liability account.
    ///
    /// # Errors
    ///
    /// Propagates the first reconciliation failure.
    pub fn reconcile_all_wallets(&self) -> Result<Vec<ReconciliationReport>, ReportError> {
        let mut reports = Vec::new();
        for owner_type in OwnerType::ALL {
            if self.wallets.liability_account_for(owner_type).is_some() {
                reports.push(self.reconcile_wallets(owner_type)?);
            }
        }
        Ok(reports)
    }

    /// Builds a paginated, chronological statement for one account.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` for unknown codes; `AmountOverflow` if period
    /// totals overflow.
    pub fn account_statement(
        &self,
        code: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        page: PageRequest,
    ) -> Result<AccountStatement, ReportError> {
        let account = self
            .engine
            .chart()
            .get_account(code)
            .map_err(|_| ReportError::AccountNotFound(code.to_string()))?;

        let all_entries = self.engine.entries_for_account(code);

        let opening_balance = match from {
            Some(from_ts) => all_entries
                .iter()
                .take_while(|entry| entry.created_at < from_ts)
                .last()
                .map_or(Money::ZERO, |entry| entry.balance_after),
            None => Money::ZERO,
        };

        let in_period: Vec<LedgerEntry> = all_entries
            .into_iter()
            .filter(|entry| {
                from.is_none_or(|from_ts| entry.created_at >= from_ts)
                    && to.is_none_or(|to_ts| entry.created_at <= to_ts)
            })
            .collect();

        let mut total_debits = Money::ZERO;
        let mut total_credits = Money::ZERO;
        for entry in &in_period {
            total_debits = total_debits
                .checked_add(entry.debit_amount())
                .ok_or(ReportError::AmountOverflow)?;
            total_credits = total_credits
                .checked_add(entry.credit_amount())
                .ok_or(ReportError::AmountOverflow)?;
        }

        let closing_balance = in_period
            .last()
            .map_or(opening_balance, |entry| entry.balance_after);

        let page = page.normalized();
        let total = in_period.len() as u64;
        let data: Vec<LedgerEntry> = in_period
            .into_iter()
            .skip(page.offset())
            .take(page.limit())
            .collect();

        Ok(AccountStatement {
            code: account.code,
            name: account.name,
            from,
            to,
            opening_balance,
            total_debits,
            total_credits,
            closing_balance,
            lines: PageResponse::new(data, page.page, page.per_page, total),
        })
    }

    /// Summarizes revenue-account activity and posted batch activity
    /// over a period.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::AmountOverflow` if totals overflow.
    pub fn revenue_report(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<RevenueReport, ReportError> {
        let revenue_accounts = self.engine.chart().list_accounts(AccountFilter {
            account_type: Some(AccountType::Revenue),
            is_active: None,
        });

        let mut lines = Vec::with_capacity(revenue_accounts.len());
        let mut total_revenue = Money::ZERO;

        for account in revenue_accounts {
            let mut net = Money::ZERO;
            for entry in self
                .engine
                .entries_for_account(&account.code)
                .iter()
                .filter(|entry| {
                    from.is_none_or(|from_ts| entry.created_at >= from_ts)
                        && to.is_none_or(|to_ts| entry.created_at <= to_ts)
                })
            {
                // Revenue accounts are credit-normal.
                net = net
                    .checked_add(entry.credit_amount())
                    .and_then(|n| n.checked_sub(entry.debit_amount()))
                    .ok_or(ReportError::AmountOverflow)?;
            }

            total_revenue = total_revenue
                .checked_add(net)
                .ok_or(ReportError::AmountOverflow)?;
            lines.push(RevenueLine {
                code: account.code,
                name: account.name,
                amount: net,
            });
        }

        let mut by_category: HashMap<_, CategoryActivity> = HashMap::new();
        for batch in self.engine.batch_store().iter() {
            if !batch.status.is_posted() {
                continue;
            }
            let posted_in_period = batch.posted_at.is_some_and(|posted_at| {
                from.is_none_or(|from_ts| posted_at >= from_ts)
                    && to.is_none_or(|to_ts| posted_at <= to_ts)
            });
            if !posted_in_period {
                continue;
            }

            let activity = by_category
                .entry(batch.category)
                .or_insert_with(|| CategoryActivity {
                    category: batch.category,
                    batch_count: 0,
                    amount: Money::ZERO,
                });
            activity.batch_count += 1;
            activity.amount = activity
                .amount
                .checked_add(batch.total_debits)
                .ok_or(ReportError::AmountOverflow)?;
        }

        let mut by_category: Vec<CategoryActivity> = by_category.into_values().collect();
        by_category.sort_by_key(|activity| activity.category.to_string());

        Ok(RevenueReport {
            from,
            to,
            lines,
            total_revenue,
            by_category,
        })
    }

    /// Builds the finance dashboard summary.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::AmountOverflow` if totals overflow.
    pub fn dashboard_summary(&self) -> Result<DashboardSummary, ReportError> {
        let mut groups = Vec::with_capacity(OwnerType::ALL.len());

        for owner_type in OwnerType::ALL {
            let wallets = self.wallets.list_wallets(WalletFilter {
                owner_type: Some(owner_type),
                status: None,
            });

            let mut available_total = Money::ZERO;
            let mut held_total = Money::ZERO;
            let mut pending_total = Money::ZERO;
            for wallet in &wallets {
                available_total = available_total
                    .checked_add(wallet.available_balance)
                    .ok_or(ReportError::AmountOverflow)?;
                held_total = held_total
                    .checked_add(wallet.held_balance)
                    .ok_or(ReportError::AmountOverflow)?;
                pending_total = pending_total
                    .checked_add(wallet.pending_balance)
                    .ok_or(ReportError::AmountOverflow)?;
            }

            let liability_account = self
                .wallets
                .liability_account_for(owner_type)
                .map(str::to_string);
            let liability_balance = liability_account.as_ref().and_then(|code| {
                self.engine
                    .chart()
                    .get_account(code)
                    .ok()
                    .map(|account| account.current_balance)
            });

            groups.push(WalletGroupSummary {
                owner_type,
                wallet_count: wallets.len(),
                available_total,
                held_total,
                pending_total,
                liability_account,
                liability_balance,
            });
        }

        let mut batches = BatchStatusCounts::default();
        for batch in self.engine.batch_store().iter() {
            batches.record(batch.status);
        }

        let trial = self.trial_balance(None)?;

        Ok(DashboardSummary {
            wallets: groups,
            batches,
            account_count: self.engine.chart().account_count(),
            entry_count: self.engine.entry_count(),
            trial_balance_ok: trial.totals.is_balanced,
        })
    }
}

/// Places a normal-sense balance into trial-balance columns.
fn columns_for(normal: NormalBalance, balance: Money) -> Result<(Money, Money), ReportError> {
    if balance.is_negative() {
        let magnitude = balance.checked_neg().ok_or(ReportError::AmountOverflow)?;
        Ok(match normal {
            NormalBalance::Debit => (Money::ZERO, magnitude),
            NormalBalance::Credit => (magnitude, Money::ZERO),
        })
    } else {
        Ok(match normal {
            NormalBalance::Debit => (balance, Money::ZERO),
            NormalBalance::Credit => (Money::ZERO, balance),
        })
    }
}
