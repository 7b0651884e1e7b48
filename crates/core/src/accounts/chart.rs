//! Chart of accounts registry.
//!
//! Accounts are rows in a concurrent arena keyed by code. Balance cells
//! are mutated exclusively by the batch engine's locked posting path;
//! this module only creates, lists, and soft-disables accounts.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use curafin_shared::types::Money;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use super::error::AccountError;
use super::types::{Account, AccountFilter, AccountType, CreateAccountInput, Deactivated};

/// Mutable balance state of one account.
///
/// Guarded by a `parking_lot::Mutex` so the posting engine can take
/// bounded-wait exclusive locks in account-code order.
#[derive(Debug)]
pub(crate) struct BalanceState {
    /// Live balance in the account's normal-balance sense.
    pub balance: Money,
    /// Number of entries ever posted against the account.
    pub entry_count: i64,
}

/// Administrative metadata of one account.
#[derive(Debug, Clone)]
pub(crate) struct AccountMeta {
    pub name: String,
    pub account_type: AccountType,
    pub is_active: bool,
    pub floor: Option<Money>,
    pub created_at: DateTime<Utc>,
}

/// One account's storage cell.
///
/// Lock discipline: `meta` and `balance` are never held at the same
/// time. Readers copy `meta` out, drop the guard, then lock `balance`.
#[derive(Debug)]
pub(crate) struct AccountCell {
    pub code: String,
    pub meta: RwLock<AccountMeta>,
    pub balance: Mutex<BalanceState>,
}

impl AccountCell {
    /// Takes a point-in-time snapshot of the account.
    pub(crate) fn snapshot(&self) -> Account {
        let meta = self.meta.read().clone();
        let (balance, entry_count) = {
            let state = self.balance.lock();
            (state.balance, state.entry_count)
        };

        Account {
            code: self.code.clone(),
            name: meta.name,
            account_type: meta.account_type,
            normal_balance: meta.account_type.normal_balance(),
            current_balance: balance,
            entry_count,
            is_active: meta.is_active,
            floor: meta.floor,
            created_at: meta.created_at,
        }
    }
}

/// The chart of accounts: the registry of all financial accounts.
///
/// Accounts are never physically deleted; historical entries reference
/// them by code, so the only removal is deactivation.
#[derive(Default)]
pub struct ChartOfAccounts {
    accounts: DashMap<String, Arc<AccountCell>>,
}

impl ChartOfAccounts {
    /// Creates an empty chart of accounts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new account.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::DuplicateCode` if the code is already taken.
    pub fn create_account(&self, input: CreateAccountInput) -> Result<Account, AccountError> {
        match self.accounts.entry(input.code.clone()) {
            Entry::Occupied(_) => Err(AccountError::DuplicateCode(input.code)),
            Entry::Vacant(vacant) => {
                let cell = Arc::new(AccountCell {
                    code: input.code.clone(),
                    meta: RwLock::new(AccountMeta {
                        name: input.name,
                        account_type: input.account_type,
                        is_active: true,
                        floor: input.floor,
                        created_at: Utc::now(),
                    }),
                    balance: Mutex::new(BalanceState {
                        balance: Money::ZERO,
                        entry_count: 0,
                    }),
                });
                let snapshot = cell.snapshot();
                vacant.insert(cell);

                info!(
                    code = %snapshot.code,
                    account_type = %snapshot.account_type,
                    "Account created"
                );
                Ok(snapshot)
            }
        }
    }

    /// Gets an account snapshot by code.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::NotFound` for unknown codes.
    pub fn get_account(&self, code: &str) -> Result<Account, AccountError> {
        self.accounts
            .get(code)
            .map(|cell| cell.snapshot())
            .ok_or_else(|| AccountError::NotFound(code.to_string()))
    }

    /// Deactivates an account.
    ///
    /// Always allowed: deactivation only blocks new postings, history is
    /// retained. Returns a warning flag when the account has activity.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::NotFound` for unknown codes.
    pub fn deactivate_account(&self, code: &str) -> Result<Deactivated, AccountError> {
        let cell = self
            .accounts
            .get(code)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| AccountError::NotFound(code.to_string()))?;

        cell.meta.write().is_active = false;
        let account = cell.snapshot();
        let had_activity = account.entry_count > 0;

        if had_activity {
            warn!(code = %code, entries = account.entry_count, "Deactivated account with posted activity");
        } else {
            info!(code = %code, "Account deactivated");
        }

        Ok(Deactivated {
            account,
            had_activity,
        })
    }

    /// Reactivates a previously deactivated account.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::NotFound` for unknown codes.
    pub fn reactivate_account(&self, code: &str) -> Result<Account, AccountError> {
        let cell = self
            .accounts
            .get(code)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| AccountError::NotFound(code.to_string()))?;

        cell.meta.write().is_active = true;
        info!(code = %code, "Account reactivated");
        Ok(cell.snapshot())
    }

    /// Lists accounts with their live balances, sorted by code.
    #[must_use]
    pub fn list_accounts(&self, filter: AccountFilter) -> Vec<Account> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .map(|entry| entry.value().snapshot())
            .filter(|account| {
                filter
                    .account_type
                    .is_none_or(|t| account.account_type == t)
                    && filter.is_active.is_none_or(|a| account.is_active == a)
            })
            .collect();

        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        accounts
    }

    /// Returns the number of accounts in the chart.
    #[must_use]
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Looks up the storage cell for an account code.
    pub(crate) fn cell(&self, code: &str) -> Option<Arc<AccountCell>> {
        self.accounts
            .get(code)
            .map(|entry| Arc::clone(entry.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset_input(code: &str) -> CreateAccountInput {
        CreateAccountInput {
            code: code.to_string(),
            name: format!("Test {code}"),
            account_type: AccountType::Asset,
            floor: None,
        }
    }

    #[test]
    fn test_create_account() {
        let chart = ChartOfAccounts::new();
        let account = chart.create_account(asset_input("1000-CASH")).unwrap();

        assert_eq!(account.code, "1000-CASH");
        assert_eq!(account.current_balance, Money::ZERO);
        assert!(account.is_active);
        assert_eq!(account.normal_balance, super::super::types::NormalBalance::Debit);
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let chart = ChartOfAccounts::new();
        chart.create_account(asset_input("1000-CASH")).unwrap();

        let result = chart.create_account(asset_input("1000-CASH"));
        assert!(matches!(result, Err(AccountError::DuplicateCode(_))));
    }

    #[test]
    fn test_get_account_not_found() {
        let chart = ChartOfAccounts::new();
        assert!(matches!(
            chart.get_account("9999-NOPE"),
            Err(AccountError::NotFound(_))
        ));
    }

    #[test]
    fn test_deactivate_and_reactivate() {
        let chart = ChartOfAccounts::new();
        chart.create_account(asset_input("1000-CASH")).unwrap();

        let deactivated = chart.deactivate_account("1000-CASH").unwrap();
        assert!(!deactivated.account.is_active);
        assert!(!deactivated.had_activity);

        let reactivated = chart.reactivate_account("1000-CASH").unwrap();
        assert!(reactivated.is_active);
    }

    #[test]
    fn test_list_accounts_sorted_and_filtered() {
        let chart = ChartOfAccounts::new();
        chart.create_account(asset_input("1100-CLEARING")).unwrap();
        chart.create_account(asset_input("1000-CASH")).unwrap();
        chart
            .create_account(CreateAccountInput {
                code: "2100-PATIENT-WALLETS".to_string(),
                name: "Patient wallets".to_string(),
                account_type: AccountType::Liability,
                floor: Some(Money::ZERO),
            })
            .unwrap();

        let all = chart.list_accounts(AccountFilter::default());
        let codes: Vec<&str> = all.iter().map(|a| a.code.as_str()).collect();
        assert_eq!(codes, ["1000-CASH", "1100-CLEARING", "2100-PATIENT-WALLETS"]);

        let liabilities = chart.list_accounts(AccountFilter {
            account_type: Some(AccountType::Liability),
            is_active: None,
        });
        assert_eq!(liabilities.len(), 1);
        assert_eq!(liabilities[0].code, "2100-PATIENT-WALLETS");
    }

    #[test]
    fn test_list_accounts_active_filter() {
        let chart = ChartOfAccounts::new();
        chart.create_account(asset_input("1000-CASH")).unwrap();
        chart.create_account(asset_input("1100-CLEARING")).unwrap();
        chart.deactivate_account("1100-CLEARING").unwrap();

        let active = chart.list_accounts(AccountFilter {
            account_type: None,
            is_active: Some(true),
        });
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].code, "1000-CASH");
    }
}
