//! Ledger entry domain types.
//!
//! A ledger entry is one immutable debit or credit posting against a
//! single account. Entries are created only by the batch engine.

use chrono::{DateTime, Utc};
use curafin_shared::types::{BatchId, EntryId, Money};
use serde::{Deserialize, Serialize};

/// Type of ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Debit entry (increases asset/expense balances, decreases
    /// liability/equity/revenue balances).
    Debit,
    /// Credit entry (decreases asset/expense balances, increases
    /// liability/equity/revenue balances).
    Credit,
}

impl EntryType {
    /// Returns the opposite side.
    #[must_use]
    pub const fn mirrored(self) -> Self {
        match self {
            Self::Debit => Self::Credit,
            Self::Credit => Self::Debit,
        }
    }
}

/// Status of a posted ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Entry is posted and in effect.
    Posted,
    /// Entry has been cancelled out by a reversal batch. The flag is a
    /// pointer for reporting; the entry itself is never altered.
    Reversed,
}

/// Input for a single ledger entry in a batch.
#[derive(Debug, Clone)]
pub struct EntryInput {
    /// The account to post to.
    pub account_code: String,
    /// Whether this is a debit or credit entry.
    pub entry_type: EntryType,
    /// The amount in minor units (must be positive).
    pub amount: Money,
    /// Optional line-item description.
    pub description: Option<String>,
}

impl EntryInput {
    /// Convenience constructor for a debit line.
    #[must_use]
    pub fn debit(account_code: impl Into<String>, amount: Money) -> Self {
        Self {
            account_code: account_code.into(),
            entry_type: EntryType::Debit,
            amount,
            description: None,
        }
    }

    /// Convenience constructor for a credit line.
    #[must_use]
    pub fn credit(account_code: impl Into<String>, amount: Money) -> Self {
        Self {
            account_code: account_code.into(),
            entry_type: EntryType::Credit,
            amount,
            description: None,
        }
    }

    /// The debit portion of this entry (zero for credits).
    #[must_use]
    pub fn debit_amount(&self) -> Money {
        match self.entry_type {
            EntryType::Debit => self.amount,
            EntryType::Credit => Money::ZERO,
        }
    }

    /// The credit portion of this entry (zero for debits).
    #[must_use]
    pub fn credit_amount(&self) -> Money {
        match self.entry_type {
            EntryType::Credit => self.amount,
            EntryType::Debit => Money::ZERO,
        }
    }
}

/// An immutable posted ledger entry.
///
/// `balance_before`/`balance_after` snapshot the account balance at
/// posting time, in the account's normal-balance sense; the snapshots
/// chain without gaps for entries against the same account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier.
    pub entry_id: EntryId,
    /// The batch this entry was posted in.
    pub batch_id: BatchId,
    /// The account affected.
    pub account_code: String,
    /// Debit or credit.
    pub entry_type: EntryType,
    /// Positive amount in minor units.
    pub amount: Money,
    /// Account balance before this entry.
    pub balance_before: Money,
    /// Account balance after this entry.
    pub balance_after: Money,
    /// Line-item description.
    pub description: String,
    /// Posted or reversed.
    pub status: EntryStatus,
    /// When the entry was posted.
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// The debit portion of this entry (zero for credits).
    #[must_use]
    pub fn debit_amount(&self) -> Money {
        match self.entry_type {
            EntryType::Debit => self.amount,
            EntryType::Credit => Money::ZERO,
        }
    }

    /// The credit portion of this entry (zero for debits).
    #[must_use]
    pub fn credit_amount(&self) -> Money {
        match self.entry_type {
            EntryType::Credit => self.amount,
            EntryType::Debit => Money::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirrored() {
        assert_eq!(EntryType::Debit.mirrored(), EntryType::Credit);
        assert_eq!(EntryType::Credit.mirrored(), EntryType::Debit);
    }

    #[test]
    fn test_entry_input_sides() {
        let debit = EntryInput::debit("1000-CASH", Money::from_minor_units(500));
        assert_eq!(debit.debit_amount(), Money::from_minor_units(500));
        assert_eq!(debit.credit_amount(), Money::ZERO);

        let credit = EntryInput::credit("2100-PATIENT-WALLETS", Money::from_minor_units(500));
        assert_eq!(credit.credit_amount(), Money::from_minor_units(500));
        assert_eq!(credit.debit_amount(), Money::ZERO);
    }
}
