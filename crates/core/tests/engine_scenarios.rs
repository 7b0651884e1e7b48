//! End-to-end scenarios across the engine, wallet service, and reports.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use curafin_core::accounts::types::{AccountType, CreateAccountInput};
use curafin_core::ledger::{BatchCategory, EngineConfig, LedgerEngine};
use curafin_core::reports::Reports;
use curafin_core::wallet::types::OwnerType;
use curafin_core::wallet::{WalletError, WalletService};
use curafin_shared::types::{Currency, Money, OwnerId, PageRequest, WalletId};

fn money(units: i64) -> Money {
    Money::from_minor_units(units)
}

struct Harness {
    engine: Arc<LedgerEngine>,
    wallets: Arc<WalletService>,
    reports: Reports,
}

fn harness() -> Harness {
    let engine = Arc::new(LedgerEngine::new(EngineConfig::default()));
    for (code, name, account_type, floor) in [
        ("1000-CASH", "Operating cash", AccountType::Asset, None),
        (
            "1100-CLEARING",
            "Withdrawal clearing",
            AccountType::Asset,
            None,
        ),
        (
            "2100-PATIENT-WALLETS",
            "Patient wallet liability",
            AccountType::Liability,
            Some(Money::ZERO),
        ),
        (
            "2200-SPECIALIST-WALLETS",
            "Specialist wallet liability",
            AccountType::Liability,
            Some(Money::ZERO),
        ),
        (
            "4000-PHARMACY-REVENUE",
            "Pharmacy revenue",
            AccountType::Revenue,
            None,
        ),
    ] {
        engine
            .chart()
            .create_account(CreateAccountInput {
                code: code.to_string(),
                name: name.to_string(),
                account_type,
                floor,
            })
            .unwrap();
    }

    let wallets = Arc::new(WalletService::new(
        Arc::clone(&engine),
        Currency::Ngn,
        HashMap::from([
            (OwnerType::Patient, "2100-PATIENT-WALLETS".to_string()),
            (OwnerType::Specialist, "2200-SPECIALIST-WALLETS".to_string()),
        ]),
    ));
    let reports = Reports::new(Arc::clone(&engine), Arc::clone(&wallets));

    Harness {
        engine,
        wallets,
        reports,
    }
}

fn open_patient_wallet(harness: &Harness) -> WalletId {
    harness
        .wallets
        .open_wallet(OwnerId::new(), OwnerType::Patient)
        .unwrap()
        .wallet_id
}

#[test]
fn topup_credits_wallet_and_liability_and_keeps_trial_balance() {
    let harness = harness();
    let wallet_id = open_patient_wallet(&harness);

    let receipt = harness
        .wallets
        .credit(
            wallet_id,
            money(10_000),
            BatchCategory::WalletTopup,
            "1000-CASH",
            None,
        )
        .unwrap();

    assert_eq!(receipt.new_balance, money(10_000));
    assert_eq!(
        harness
            .engine
            .chart()
            .get_account("2100-PATIENT-WALLETS")
            .unwrap()
            .current_balance,
        money(10_000)
    );
    assert!(harness.reports.trial_balance(None).unwrap().totals.is_balanced);
}

#[test]
fn over_withdrawal_fails_cleanly() {
    let harness = harness();
    let wallet_id = open_patient_wallet(&harness);
    harness
        .wallets
        .credit(wallet_id, money(10_000), BatchCategory::WalletTopup, "1000-CASH", None)
        .unwrap();
    let entries_before = harness.engine.entry_count();

    let result = harness.wallets.debit(
        wallet_id,
        money(15_000),
        BatchCategory::Withdrawal,
        "1100-CLEARING",
        None,
    );

    assert!(matches!(result, Err(WalletError::InsufficientFunds { .. })));
    assert_eq!(
        harness.wallets.get_balance(wallet_id).unwrap().available,
        money(10_000)
    );
    assert_eq!(harness.engine.entry_count(), entries_before);
}

#[test]
fn purchase_debit_shows_on_revenue_statement() {
    let harness = harness();
    let wallet_id = open_patient_wallet(&harness);
    harness
        .wallets
        .credit(wallet_id, money(10_000), BatchCategory::WalletTopup, "1000-CASH", None)
        .unwrap();

    let receipt = harness
        .wallets
        .debit(
            wallet_id,
            money(4_000),
            BatchCategory::PharmacyPurchase,
            "4000-PHARMACY-REVENUE",
            None,
        )
        .unwrap();
    assert_eq!(receipt.new_balance, money(6_000));

    let statement = harness
        .reports
        .account_statement("4000-PHARMACY-REVENUE", None, None, PageRequest::default())
        .unwrap();
    assert_eq!(statement.lines.meta.total, 1);
    assert_eq!(statement.lines.data[0].credit_amount(), money(4_000));
    assert_eq!(statement.closing_balance, money(4_000));
}

#[test]
fn concurrent_debits_serialize_to_exactly_one_winner() {
    let harness = harness();
    let wallet_id = open_patient_wallet(&harness);
    harness
        .wallets
        .credit(wallet_id, money(6_000), BatchCategory::WalletTopup, "1000-CASH", None)
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..2 {
        let wallets = Arc::clone(&harness.wallets);
        handles.push(thread::spawn(move || {
            wallets.debit(
                wallet_id,
                money(6_000),
                BatchCategory::Withdrawal,
                "1100-CLEARING",
                None,
            )
        }));
    }

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    let successes = results.iter().filter(|result| result.is_ok()).count();
    let insufficient = results
        .iter()
        .filter(|result| matches!(result, Err(WalletError::InsufficientFunds { .. })))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(insufficient, 1);
    assert_eq!(
        harness.wallets.get_balance(wallet_id).unwrap().available,
        Money::ZERO
    );
    assert!(harness.reports.trial_balance(None).unwrap().totals.is_balanced);
}

#[test]
fn random_activity_across_many_wallets_stays_reconciled() {
    let harness = harness();

    let wallet_ids: Vec<WalletId> = (0..50).map(|_| open_patient_wallet(&harness)).collect();

    // Small deterministic PRNG; no external crates needed.
    let mut seed: u64 = 0x00c0_ffee;
    let mut next = move || {
        seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        (seed >> 33) as usize
    };

    for _ in 0..1_000 {
        let wallet_id = wallet_ids[next() % wallet_ids.len()];
        let amount = money((next() % 9_900 + 100) as i64);
        if next() % 2 == 0 {
            harness
                .wallets
                .credit(wallet_id, amount, BatchCategory::WalletTopup, "1000-CASH", None)
                .unwrap();
        } else {
            // Debits may legitimately fail on insufficient funds.
            match harness.wallets.debit(
                wallet_id,
                amount,
                BatchCategory::PharmacyPurchase,
                "4000-PHARMACY-REVENUE",
                None,
            ) {
                Ok(_) | Err(WalletError::InsufficientFunds { .. }) => {}
                Err(other) => panic!("unexpected debit failure: {other}"),
            }
        }
    }

    let reconciliation = harness.reports.reconcile_wallets(OwnerType::Patient).unwrap();
    assert!(reconciliation.is_reconciled, "difference: {}", reconciliation.difference);
    assert!(harness.reports.trial_balance(None).unwrap().totals.is_balanced);
}

#[test]
fn concurrent_mixed_activity_stays_reconciled() {
    let harness = harness();
    let wallet_ids: Vec<WalletId> = (0..10).map(|_| open_patient_wallet(&harness)).collect();
    let wallet_ids = Arc::new(wallet_ids);

    let mut handles = Vec::new();
    for worker in 0..8u64 {
        let wallets = Arc::clone(&harness.wallets);
        let ids = Arc::clone(&wallet_ids);
        handles.push(thread::spawn(move || {
            let mut seed = worker.wrapping_mul(0x9e37_79b9) + 17;
            let mut next = move || {
                seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
                (seed >> 33) as usize
            };

            for _ in 0..50 {
                let wallet_id = ids[next() % ids.len()];
                let amount = money((next() % 4_900 + 100) as i64);
                if next() % 2 == 0 {
                    wallets
                        .credit(wallet_id, amount, BatchCategory::WalletTopup, "1000-CASH", None)
                        .unwrap();
                } else {
                    match wallets.debit(
                        wallet_id,
                        amount,
                        BatchCategory::Withdrawal,
                        "1100-CLEARING",
                        None,
                    ) {
                        Ok(_) | Err(WalletError::InsufficientFunds { .. }) => {}
                        Err(other) => panic!("unexpected debit failure: {other}"),
                    }
                }
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let reconciliation = harness.reports.reconcile_wallets(OwnerType::Patient).unwrap();
    assert!(reconciliation.is_reconciled);
    assert!(harness.reports.trial_balance(None).unwrap().totals.is_balanced);
}

#[test]
fn reversal_restores_wallet_and_counter_account() {
    let harness = harness();
    let wallet_id = open_patient_wallet(&harness);
    harness
        .wallets
        .credit(wallet_id, money(10_000), BatchCategory::WalletTopup, "1000-CASH", None)
        .unwrap();
    let purchase = harness
        .wallets
        .debit(
            wallet_id,
            money(4_000),
            BatchCategory::PharmacyPurchase,
            "4000-PHARMACY-REVENUE",
            None,
        )
        .unwrap();

    let trial_before = harness.reports.trial_balance(None).unwrap();
    harness
        .wallets
        .reverse_batch(purchase.batch_id, "Order cancelled")
        .unwrap();

    assert_eq!(
        harness.wallets.get_balance(wallet_id).unwrap().available,
        money(10_000)
    );
    assert_eq!(
        harness
            .engine
            .chart()
            .get_account("4000-PHARMACY-REVENUE")
            .unwrap()
            .current_balance,
        Money::ZERO
    );

    // Account balances match the state before the reversed batch.
    let trial_after = harness.reports.trial_balance(None).unwrap();
    assert!(trial_after.totals.is_balanced);
    assert!(trial_before.totals.is_balanced);
    assert_eq!(
        harness
            .engine
            .chart()
            .get_account("2100-PATIENT-WALLETS")
            .unwrap()
            .current_balance,
        money(10_000)
    );
}

#[test]
fn idempotent_retry_has_single_effect_under_concurrency() {
    let harness = harness();
    let wallet_id = open_patient_wallet(&harness);

    let mut handles = Vec::new();
    for _ in 0..4 {
        let wallets = Arc::clone(&harness.wallets);
        handles.push(thread::spawn(move || {
            wallets.credit(
                wallet_id,
                money(10_000),
                BatchCategory::WalletTopup,
                "1000-CASH",
                Some("gateway-ref-777".to_string()),
            )
        }));
    }

    let receipts: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap().unwrap())
        .collect();

    let first_batch = receipts[0].batch_id;
    assert!(receipts.iter().all(|receipt| receipt.batch_id == first_batch));
    assert_eq!(
        harness.wallets.get_balance(wallet_id).unwrap().available,
        money(10_000)
    );
    assert_eq!(
        harness
            .engine
            .chart()
            .get_account("1000-CASH")
            .unwrap()
            .current_balance,
        money(10_000)
    );
}

#[test]
fn withdrawal_lifecycle_keeps_reconciliation_at_every_step() {
    let harness = harness();
    let wallet_id = open_patient_wallet(&harness);
    harness
        .wallets
        .credit(wallet_id, money(10_000), BatchCategory::WalletTopup, "1000-CASH", None)
        .unwrap();

    let withdrawal = harness
        .wallets
        .begin_withdrawal(wallet_id, money(6_000), "1100-CLEARING")
        .unwrap();
    assert!(
        harness
            .reports
            .reconcile_wallets(OwnerType::Patient)
            .unwrap()
            .is_reconciled
    );

    harness
        .wallets
        .confirm_withdrawal(withdrawal.withdrawal_id)
        .unwrap();
    let report = harness.reports.reconcile_wallets(OwnerType::Patient).unwrap();
    assert!(report.is_reconciled);
    assert_eq!(report.wallet_total, money(4_000));

    // A second withdrawal that fails externally releases its funds.
    let failed = harness
        .wallets
        .begin_withdrawal(wallet_id, money(1_500), "1100-CLEARING")
        .unwrap();
    harness.wallets.fail_withdrawal(failed.withdrawal_id).unwrap();

    let report = harness.reports.reconcile_wallets(OwnerType::Patient).unwrap();
    assert!(report.is_reconciled);
    assert_eq!(
        harness.wallets.get_balance(wallet_id).unwrap().available,
        money(4_000)
    );
    assert!(harness.reports.trial_balance(None).unwrap().totals.is_balanced);
}
