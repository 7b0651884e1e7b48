//! Property tests for the posting engine.

use proptest::prelude::*;

use curafin_shared::types::Money;

use crate::accounts::types::{AccountType, CreateAccountInput, NormalBalance};
use crate::ledger::batch::{BatchCategory, PostBatchInput};
use crate::ledger::engine::LedgerEngine;
use crate::ledger::entry::EntryInput;

const CODES: [&str; 4] = [
    "1000-CASH",
    "1100-CLEARING",
    "2100-PATIENT-WALLETS",
    "4000-PHARMACY-REVENUE",
];

fn engine_with_chart() -> LedgerEngine {
    let engine = LedgerEngine::default();
    let types = [
        AccountType::Asset,
        AccountType::Asset,
        AccountType::Liability,
        AccountType::Revenue,
    ];
    for (code, account_type) in CODES.iter().zip(types) {
        engine
            .chart()
            .create_account(CreateAccountInput {
                code: (*code).to_string(),
                name: (*code).to_string(),
                account_type,
                floor: None,
            })
            .unwrap();
    }
    engine
}

/// A generated two-leg balanced batch: (debit account, credit account,
/// amount in minor units).
fn batch_strategy() -> impl Strategy<Value = (usize, usize, i64)> {
    (0..CODES.len(), 0..CODES.len(), 1i64..1_000_000i64)
}

/// Signed debit-sense balance of an account: debit-normal balances
/// count positive, credit-normal balances negative.
fn debit_sense_total(engine: &LedgerEngine) -> i64 {
    CODES
        .iter()
        .map(|code| {
            let account = engine.chart().get_account(code).unwrap();
            let balance = account.current_balance.minor_units();
            match account.normal_balance {
                NormalBalance::Debit => balance,
                NormalBalance::Credit => -balance,
            }
        })
        .sum()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Any sequence of balanced batches keeps the books balanced: the
    /// debit-sense sum across the whole chart stays zero.
    #[test]
    fn prop_posted_batches_keep_books_balanced(
        batches in prop::collection::vec(batch_strategy(), 1..30),
    ) {
        let engine = engine_with_chart();

        for (debit_idx, credit_idx, amount) in batches {
            let input = PostBatchInput::new(
                BatchCategory::Journal,
                "Generated batch",
                vec![
                    EntryInput::debit(CODES[debit_idx], Money::from_minor_units(amount)),
                    EntryInput::credit(CODES[credit_idx], Money::from_minor_units(amount)),
                ],
            );
            engine.post_batch(input).unwrap();
        }

        prop_assert_eq!(debit_sense_total(&engine), 0);
    }

    /// Every posted batch reports equal debit and credit totals.
    #[test]
    fn prop_batch_totals_always_equal(
        batches in prop::collection::vec(batch_strategy(), 1..20),
    ) {
        let engine = engine_with_chart();

        for (debit_idx, credit_idx, amount) in batches {
            let posted = engine.post_batch(PostBatchInput::new(
                BatchCategory::Journal,
                "Generated batch",
                vec![
                    EntryInput::debit(CODES[debit_idx], Money::from_minor_units(amount)),
                    EntryInput::credit(CODES[credit_idx], Money::from_minor_units(amount)),
                ],
            )).unwrap();

            prop_assert_eq!(posted.batch.total_debits, posted.batch.total_credits);
        }
    }

    /// Balance snapshots chain without gaps per account, whatever the
    /// posting order.
    #[test]
    fn prop_balance_snapshots_chain(
        batches in prop::collection::vec(batch_strategy(), 1..30),
    ) {
        let engine = engine_with_chart();

        for (debit_idx, credit_idx, amount) in batches {
            engine.post_batch(PostBatchInput::new(
                BatchCategory::Journal,
                "Generated batch",
                vec![
                    EntryInput::debit(CODES[debit_idx], Money::from_minor_units(amount)),
                    EntryInput::credit(CODES[credit_idx], Money::from_minor_units(amount)),
                ],
            )).unwrap();
        }

        for code in CODES {
            let entries = engine.entries_for_account(code);
            let mut previous = Money::ZERO;
            for entry in entries {
                prop_assert_eq!(entry.balance_before, previous);
                previous = entry.balance_after;
            }
            prop_assert_eq!(
                previous,
                engine.chart().get_account(code).unwrap().current_balance
            );
        }
    }

    /// An unbalanced batch never leaves a trace, no matter the amounts.
    #[test]
    fn prop_failed_batches_leave_no_trace(
        debit_amount in 1i64..1_000_000i64,
        skew in 1i64..1_000i64,
    ) {
        let engine = engine_with_chart();

        let result = engine.post_batch(PostBatchInput::new(
            BatchCategory::Journal,
            "Unbalanced batch",
            vec![
                EntryInput::debit(CODES[0], Money::from_minor_units(debit_amount)),
                EntryInput::credit(CODES[2], Money::from_minor_units(debit_amount + skew)),
            ],
        ));

        prop_assert!(result.is_err());
        prop_assert_eq!(engine.entry_count(), 0);
        prop_assert_eq!(debit_sense_total(&engine), 0);
    }
}
