//! Batch validation rules.
//!
//! All validation happens before any state mutation, so a failed batch
//! leaves no observable trace.

use curafin_shared::types::Money;

use super::entry::{EntryInput, EntryType};
use super::error::LedgerError;

/// Validated batch totals.
#[derive(Debug, Clone, Copy)]
pub struct BatchTotals {
    /// Sum of debit amounts.
    pub total_debits: Money,
    /// Sum of credit amounts.
    pub total_credits: Money,
}

/// Validates the structural rules of a batch and computes its totals.
///
/// Rules:
/// - at least 2 entries
/// - every amount strictly positive
/// - both a debit and a credit side present
/// - total debits equal total credits
///
/// # Errors
///
/// Returns the first violated rule as a `LedgerError`.
pub fn validate_entries(entries: &[EntryInput]) -> Result<BatchTotals, LedgerError> {
    if entries.len() < 2 {
        return Err(LedgerError::InsufficientEntries);
    }

    let mut total_debits = Money::ZERO;
    let mut total_credits = Money::ZERO;
    let mut has_debit = false;
    let mut has_credit = false;

    for entry in entries {
        if !entry.amount.is_positive() {
            return Err(LedgerError::NonPositiveAmount);
        }

        match entry.entry_type {
            EntryType::Debit => {
                total_debits = total_debits
                    .checked_add(entry.amount)
                    .ok_or(LedgerError::AmountOverflow)?;
                has_debit = true;
            }
            EntryType::Credit => {
                total_credits = total_credits
                    .checked_add(entry.amount)
                    .ok_or(LedgerError::AmountOverflow)?;
                has_credit = true;
            }
        }
    }

    if !has_debit || !has_credit {
        return Err(LedgerError::SingleSidedBatch);
    }

    if total_debits != total_credits {
        return Err(LedgerError::UnbalancedBatch {
            debits: total_debits,
            credits: total_credits,
        });
    }

    Ok(BatchTotals {
        total_debits,
        total_credits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::entry::EntryInput;

    fn money(units: i64) -> Money {
        Money::from_minor_units(units)
    }

    #[test]
    fn test_balanced_batch() {
        let entries = vec![
            EntryInput::debit("1000-CASH", money(10_000)),
            EntryInput::credit("2100-PATIENT-WALLETS", money(10_000)),
        ];
        let totals = validate_entries(&entries).unwrap();
        assert_eq!(totals.total_debits, money(10_000));
        assert_eq!(totals.total_credits, money(10_000));
    }

    #[test]
    fn test_unbalanced_batch() {
        let entries = vec![
            EntryInput::debit("1000-CASH", money(10_000)),
            EntryInput::credit("2100-PATIENT-WALLETS", money(5_000)),
        ];
        assert!(matches!(
            validate_entries(&entries),
            Err(LedgerError::UnbalancedBatch { .. })
        ));
    }

    #[test]
    fn test_insufficient_entries() {
        let entries = vec![EntryInput::debit("1000-CASH", money(10_000))];
        assert!(matches!(
            validate_entries(&entries),
            Err(LedgerError::InsufficientEntries)
        ));

        assert!(matches!(
            validate_entries(&[]),
            Err(LedgerError::InsufficientEntries)
        ));
    }

    #[rstest::rstest]
    #[case(0)]
    #[case(-1)]
    #[case(-10_000)]
    fn test_non_positive_amounts_rejected(#[case] amount: i64) {
        let entries = vec![
            EntryInput::debit("1000-CASH", money(amount)),
            EntryInput::credit("2100-PATIENT-WALLETS", money(amount)),
        ];
        assert!(matches!(
            validate_entries(&entries),
            Err(LedgerError::NonPositiveAmount)
        ));
    }

    #[test]
    fn test_single_sided() {
        let entries = vec![
            EntryInput::debit("1000-CASH", money(5_000)),
            EntryInput::debit("1100-CLEARING", money(5_000)),
        ];
        assert!(matches!(
            validate_entries(&entries),
            Err(LedgerError::SingleSidedBatch)
        ));
    }

    #[test]
    fn test_multi_entry_balanced() {
        let entries = vec![
            EntryInput::debit("1000-CASH", money(3_000)),
            EntryInput::debit("1100-CLEARING", money(7_000)),
            EntryInput::credit("2100-PATIENT-WALLETS", money(10_000)),
        ];
        let totals = validate_entries(&entries).unwrap();
        assert_eq!(totals.total_debits, money(10_000));
        assert_eq!(totals.total_credits, money(10_000));
    }

    #[test]
    fn test_overflowing_totals() {
        let entries = vec![
            EntryInput::debit("1000-CASH", money(i64::MAX)),
            EntryInput::debit("1100-CLEARING", money(1)),
            EntryInput::credit("2100-PATIENT-WALLETS", money(1)),
        ];
        assert!(matches!(
            validate_entries(&entries),
            Err(LedgerError::AmountOverflow)
        ));
    }
}
