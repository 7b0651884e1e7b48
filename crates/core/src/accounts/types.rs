//! Chart of accounts domain types.

use chrono::{DateTime, Utc};
use curafin_shared::types::Money;
use serde::{Deserialize, Serialize};

/// Account classification in the chart of accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Asset account (cash, clearing, receivables).
    Asset,
    /// Liability account (wallet roll-ups, payables).
    Liability,
    /// Equity account.
    Equity,
    /// Revenue account.
    Revenue,
    /// Expense account.
    Expense,
}

impl AccountType {
    /// Returns the normal balance side for this account type.
    ///
    /// Asset/Expense accounts are debit-normal; Liability/Equity/Revenue
    /// accounts are credit-normal.
    #[must_use]
    pub const fn normal_balance(self) -> NormalBalance {
        match self {
            Self::Asset | Self::Expense => NormalBalance::Debit,
            Self::Liability | Self::Equity | Self::Revenue => NormalBalance::Credit,
        }
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asset" => Ok(Self::Asset),
            "liability" => Ok(Self::Liability),
            "equity" => Ok(Self::Equity),
            "revenue" => Ok(Self::Revenue),
            "expense" => Ok(Self::Expense),
            _ => Err(format!("Unknown account type: {s}")),
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asset => write!(f, "asset"),
            Self::Liability => write!(f, "liability"),
            Self::Equity => write!(f, "equity"),
            Self::Revenue => write!(f, "revenue"),
            Self::Expense => write!(f, "expense"),
        }
    }
}

/// The side on which an account's balance normally sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalBalance {
    /// Debit-normal (Asset, Expense).
    Debit,
    /// Credit-normal (Liability, Equity, Revenue).
    Credit,
}

impl NormalBalance {
    /// Calculates the signed balance change a debit/credit pair causes
    /// on an account with this normal side.
    ///
    /// Debit-normal: balance += debit - credit.
    /// Credit-normal: balance += credit - debit.
    #[must_use]
    pub fn balance_change(self, debit: Money, credit: Money) -> Option<Money> {
        match self {
            Self::Debit => debit.checked_sub(credit),
            Self::Credit => credit.checked_sub(debit),
        }
    }
}

/// A snapshot of one account in the chart of accounts.
///
/// `current_balance` is signed in the account's normal-balance sense and
/// always equals the sum of all posted entries against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique, human-assigned code, e.g. `"1000-CASH"`.
    pub code: String,
    /// Human-readable name.
    pub name: String,
    /// Account classification.
    pub account_type: AccountType,
    /// Normal balance side (derived from the type).
    pub normal_balance: NormalBalance,
    /// Live balance in the normal-balance sense.
    pub current_balance: Money,
    /// Number of entries ever posted against this account.
    pub entry_count: i64,
    /// Soft-disable flag; inactive accounts reject new postings.
    pub is_active: bool,
    /// Optional minimum balance the account may not cross.
    pub floor: Option<Money>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new account.
#[derive(Debug, Clone)]
pub struct CreateAccountInput {
    /// Unique account code.
    pub code: String,
    /// Human-readable name.
    pub name: String,
    /// Account classification.
    pub account_type: AccountType,
    /// Optional minimum balance in the normal-balance sense.
    pub floor: Option<Money>,
}

/// Filter options for listing accounts.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccountFilter {
    /// Filter by account type.
    pub account_type: Option<AccountType>,
    /// Filter by active status.
    pub is_active: Option<bool>,
}

/// Result of deactivating an account.
///
/// Deactivation is always allowed; `had_activity` is a warning signal
/// for the caller, not a failure.
#[derive(Debug, Clone)]
pub struct Deactivated {
    /// The account after deactivation.
    pub account: Account,
    /// True if the account has posted entries.
    pub had_activity: bool,
}
