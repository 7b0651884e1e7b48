//! Wallet service: owner-scoped balances built entirely on top of the
//! batch engine.
//!
//! Every cash movement constructs a balanced batch and posts it while
//! the wallet's own lock is held, so the wallet row update and the
//! ledger posting succeed or fail together. The wallet service never
//! writes an account balance directly.
//!
//! Lock hierarchy: the wallet lock is always taken before any account
//! lock (the engine takes those, in account-code order), and no
//! operation ever locks two wallets.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use curafin_shared::types::{
    BatchId, Currency, Money, OwnerId, PageRequest, PageResponse, WalletId, WithdrawalId,
};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::{Mutex, MutexGuard};
use tracing::info;

use crate::ledger::{
    BatchCategory, EntryInput, EntryType, LedgerEngine, PostBatchInput, TransactionBatch,
    WalletEffect,
};

use super::error::WalletError;
use super::types::{
    OwnerType, PendingWithdrawal, Wallet, WalletBalances, WalletFilter, WalletReceipt,
    WalletStatus, WithdrawalStatus,
};

/// Mutable state of one wallet, guarded by the wallet lock.
#[derive(Debug)]
struct WalletState {
    owner_id: OwnerId,
    owner_type: OwnerType,
    currency: Currency,
    available: Money,
    held: Money,
    pending: Money,
    status: WalletStatus,
    total_credited: Money,
    total_debited: Money,
    last_transaction_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

/// One wallet's storage cell.
#[derive(Debug)]
struct WalletCell {
    wallet_id: WalletId,
    state: Mutex<WalletState>,
}

impl WalletCell {
    fn new(wallet_id: WalletId, owner_id: OwnerId, owner_type: OwnerType, currency: Currency) -> Self {
        Self {
            wallet_id,
            state: Mutex::new(WalletState {
                owner_id,
                owner_type,
                currency,
                available: Money::ZERO,
                held: Money::ZERO,
                pending: Money::ZERO,
                status: WalletStatus::Active,
                total_credited: Money::ZERO,
                total_debited: Money::ZERO,
                last_transaction_at: None,
                created_at: Utc::now(),
            }),
        }
    }

    fn snapshot(&self) -> Wallet {
        let state = self.state.lock();
        Wallet {
            wallet_id: self.wallet_id,
            owner_id: state.owner_id,
            owner_type: state.owner_type,
            currency: state.currency,
            available_balance: state.available,
            held_balance: state.held,
            pending_balance: state.pending,
            status: state.status,
            total_credited: state.total_credited,
            total_debited: state.total_debited,
            last_transaction_at: state.last_transaction_at,
            created_at: state.created_at,
        }
    }

    fn snapshot_locked(&self, state: &WalletState) -> Wallet {
        Wallet {
            wallet_id: self.wallet_id,
            owner_id: state.owner_id,
            owner_type: state.owner_type,
            currency: state.currency,
            available_balance: state.available,
            held_balance: state.held,
            pending_balance: state.pending,
            status: state.status,
            total_credited: state.total_credited,
            total_debited: state.total_debited,
            last_transaction_at: state.last_transaction_at,
            created_at: state.created_at,
        }
    }
}

/// Owner-scoped wallet balances backed by liability accounts.
pub struct WalletService {
    engine: Arc<LedgerEngine>,
    wallets: DashMap<WalletId, Arc<WalletCell>>,
    by_owner: DashMap<(OwnerId, OwnerType), WalletId>,
    withdrawals: DashMap<WithdrawalId, PendingWithdrawal>,
    liability_accounts: HashMap<OwnerType, String>,
    currency: Currency,
}

impl WalletService {
    /// Creates a wallet service over an engine.
    ///
    /// `liability_accounts` maps each owner type to the liability
    /// account its wallets roll up into.
    #[must_use]
    pub fn new(
        engine: Arc<LedgerEngine>,
        currency: Currency,
        liability_accounts: HashMap<OwnerType, String>,
    ) -> Self {
        Self {
            engine,
            wallets: DashMap::new(),
            by_owner: DashMap::new(),
            withdrawals: DashMap::new(),
            liability_accounts,
            currency,
        }
    }

    /// The underlying ledger engine.
    #[must_use]
    pub fn engine(&self) -> &LedgerEngine {
        &self.engine
    }

    /// The liability account code wallets of this owner type roll up
    /// into.
    #[must_use]
    pub fn liability_account_for(&self, owner_type: OwnerType) -> Option<&str> {
        self.liability_accounts.get(&owner_type).map(String::as_str)
    }

    /// Opens (or returns) the wallet for an owner. One wallet per
    /// `(owner, owner_type)`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the wallet registry is inconsistent.
    pub fn open_wallet(
        &self,
        owner_id: OwnerId,
        owner_type: OwnerType,
    ) -> Result<Wallet, WalletError> {
        match self.by_owner.entry((owner_id, owner_type)) {
            Entry::Occupied(occupied) => {
                let wallet_id = *occupied.get();
                drop(occupied);
                self.get_wallet(wallet_id)
            }
            Entry::Vacant(vacant) => {
                let wallet_id = WalletId::new();
                let cell = Arc::new(WalletCell::new(wallet_id, owner_id, owner_type, self.currency));
                let snapshot = cell.snapshot();
                self.wallets.insert(wallet_id, cell);
                vacant.insert(wallet_id);

                info!(%wallet_id, %owner_id, %owner_type, "Wallet opened");
                Ok(snapshot)
            }
        }
    }

    /// Gets a wallet snapshot.
    ///
    /// # Errors
    ///
    /// Returns `WalletError::NotFound` for unknown IDs.
    pub fn get_wallet(&self, wallet_id: WalletId) -> Result<Wallet, WalletError> {
        self.wallets
            .get(&wallet_id)
            .map(|cell| cell.snapshot())
            .ok_or(WalletError::NotFound(wallet_id))
    }

    /// Gets a wallet's three balances.
    ///
    /// # Errors
    ///
    /// Returns `WalletError::NotFound` for unknown IDs.
    pub fn get_balance(&self, wallet_id: WalletId) -> Result<WalletBalances, WalletError> {
        let wallet = self.get_wallet(wallet_id)?;
        Ok(WalletBalances {
            available: wallet.available_balance,
            held: wallet.held_balance,
            pending: wallet.pending_balance,
        })
    }

    /// Lists wallet snapshots, oldest first.
    #[must_use]
    pub fn list_wallets(&self, filter: WalletFilter) -> Vec<Wallet> {
        let mut wallets: Vec<Wallet> = self
            .wallets
            .iter()
            .map(|entry| entry.value().snapshot())
            .filter(|wallet| {
                filter.owner_type.is_none_or(|t| wallet.owner_type == t)
                    && filter.status.is_none_or(|s| wallet.status == s)
            })
            .collect();

        wallets.sort_by_key(|wallet| (wallet.created_at, wallet.wallet_id.into_inner()));
        wallets
    }

    /// Pages through the batches that moved a wallet's funds,
    /// newest first.
    ///
    /// # Errors
    ///
    /// Returns `WalletError::NotFound` for unknown IDs.
    pub fn get_transaction_history(
        &self,
        wallet_id: WalletId,
        page: PageRequest,
    ) -> Result<PageResponse<TransactionBatch>, WalletError> {
        if !self.wallets.contains_key(&wallet_id) {
            return Err(WalletError::NotFound(wallet_id));
        }
        Ok(self.engine.batches_for_wallet(wallet_id, page))
    }

    /// Credits a wallet: posts `{DEBIT source / CREDIT liability}` and
    /// applies the balance in the same atomic unit.
    ///
    /// # Errors
    ///
    /// `WalletFrozen`/`WalletClosed` when the wallet is not active, plus
    /// any posting failure; a failed call leaves both the wallet and
    /// the ledger untouched.
    pub fn credit(
        &self,
        wallet_id: WalletId,
        amount: Money,
        reason: BatchCategory,
        source_account: &str,
        idempotency_key: Option<String>,
    ) -> Result<WalletReceipt, WalletError> {
        if !amount.is_positive() {
            return Err(WalletError::NonPositiveAmount);
        }

        let cell = self.cell(wallet_id)?;
        let mut state = self.lock_wallet(&cell)?;
        self.require_active(wallet_id, &state)?;

        let liability = self.liability_account(state.owner_type)?;
        let new_available = state
            .available
            .checked_add(amount)
            .ok_or(WalletError::AmountOverflow)?;
        let new_total_credited = state
            .total_credited
            .checked_add(amount)
            .ok_or(WalletError::AmountOverflow)?;

        let posted = self.engine.post_batch(PostBatchInput {
            category: reason,
            description: format!("{reason} credit to wallet {wallet_id}"),
            entries: vec![
                EntryInput::debit(source_account, amount),
                EntryInput::credit(liability, amount),
            ],
            idempotency_key,
            from_user: None,
            to_user: Some(state.owner_id),
            wallet_effect: Some(WalletEffect {
                wallet_id,
                direction: EntryType::Credit,
                amount,
            }),
            reversal_of: None,
        })?;

        if posted.replayed {
            return Ok(WalletReceipt {
                new_balance: state.available,
                batch_id: posted.batch.batch_id,
            });
        }

        state.available = new_available;
        state.total_credited = new_total_credited;
        state.last_transaction_at = Some(Utc::now());

        info!(
            %wallet_id,
            amount = %amount,
            reason = %reason,
            batch_id = %posted.batch.batch_id,
            new_balance = %new_available,
            "Wallet credited"
        );

        Ok(WalletReceipt {
            new_balance: new_available,
            batch_id: posted.batch.batch_id,
        })
    }

    /// Debits a wallet: posts `{DEBIT liability / CREDIT destination}`.
    /// The single path for withdrawals and purchase debits; callers
    /// differ only in `reason` and `destination_account`.
    ///
    /// # Errors
    ///
    /// `InsufficientFunds` when `amount` exceeds the available balance;
    /// `WalletFrozen`/`WalletClosed` when the wallet is not active.
    /// No partial debit ever occurs.
    pub fn debit(
        &self,
        wallet_id: WalletId,
        amount: Money,
        reason: BatchCategory,
        destination_account: &str,
        idempotency_key: Option<String>,
    ) -> Result<WalletReceipt, WalletError> {
        if !amount.is_positive() {
            return Err(WalletError::NonPositiveAmount);
        }

        let cell = self.cell(wallet_id)?;
        let mut state = self.lock_wallet(&cell)?;
        self.require_active(wallet_id, &state)?;

        if state.available < amount {
            return Err(WalletError::InsufficientFunds {
                available: state.available,
                requested: amount,
            });
        }

        let liability = self.liability_account(state.owner_type)?;
        let new_available = state
            .available
            .checked_sub(amount)
            .ok_or(WalletError::AmountOverflow)?;
        let new_total_debited = state
            .total_debited
            .checked_add(amount)
            .ok_or(WalletError::AmountOverflow)?;

        let posted = self.engine.post_batch(PostBatchInput {
            category: reason,
            description: format!("{reason} debit from wallet {wallet_id}"),
            entries: vec![
                EntryInput::debit(liability, amount),
                EntryInput::credit(destination_account, amount),
            ],
            idempotency_key,
            from_user: Some(state.owner_id),
            to_user: None,
            wallet_effect: Some(WalletEffect {
                wallet_id,
                direction: EntryType::Debit,
                amount,
            }),
            reversal_of: None,
        })?;

        if posted.replayed {
            return Ok(WalletReceipt {
                new_balance: state.available,
                batch_id: posted.batch.batch_id,
            });
        }

        state.available = new_available;
        state.total_debited = new_total_debited;
        state.last_transaction_at = Some(Utc::now());

        info!(
            %wallet_id,
            amount = %amount,
            reason = %reason,
            batch_id = %posted.batch.batch_id,
            new_balance = %new_available,
            "Wallet debited"
        );

        Ok(WalletReceipt {
            new_balance: new_available,
            batch_id: posted.batch.batch_id,
        })
    }

    /// Earmarks available funds as held. No ledger effect: no cash
    /// moves until the hold is captured via `debit` or released.
    ///
    /// # Errors
    ///
    /// `InsufficientAvailableBalance` when `amount` exceeds the
    /// available balance.
    pub fn hold(&self, wallet_id: WalletId, amount: Money) -> Result<WalletBalances, WalletError> {
        if !amount.is_positive() {
            return Err(WalletError::NonPositiveAmount);
        }

        let cell = self.cell(wallet_id)?;
        let mut state = self.lock_wallet(&cell)?;
        self.require_active(wallet_id, &state)?;

        if state.available < amount {
            return Err(WalletError::InsufficientAvailableBalance {
                available: state.available,
                requested: amount,
            });
        }

        state.available = state
            .available
            .checked_sub(amount)
            .ok_or(WalletError::AmountOverflow)?;
        state.held = state
            .held
            .checked_add(amount)
            .ok_or(WalletError::AmountOverflow)?;

        Ok(WalletBalances {
            available: state.available,
            held: state.held,
            pending: state.pending,
        })
    }

    /// Releases held funds back to available. No ledger effect.
    ///
    /// # Errors
    ///
    /// `InsufficientHeldBalance` when `amount` exceeds the held
    /// balance.
    pub fn release(
        &self,
        wallet_id: WalletId,
        amount: Money,
    ) -> Result<WalletBalances, WalletError> {
        if !amount.is_positive() {
            return Err(WalletError::NonPositiveAmount);
        }

        let cell = self.cell(wallet_id)?;
        let mut state = self.lock_wallet(&cell)?;
        self.require_active(wallet_id, &state)?;

        if state.held < amount {
            return Err(WalletError::InsufficientHeldBalance {
                held: state.held,
                requested: amount,
            });
        }

        state.held = state
            .held
            .checked_sub(amount)
            .ok_or(WalletError::AmountOverflow)?;
        state.available = state
            .available
            .checked_add(amount)
            .ok_or(WalletError::AmountOverflow)?;

        Ok(WalletBalances {
            available: state.available,
            held: state.held,
            pending: state.pending,
        })
    }

    /// Freezes a wallet; balances are retained, new activity rejects.
    ///
    /// # Errors
    ///
    /// `WalletClosed` when the wallet is already closed.
    pub fn freeze_wallet(&self, wallet_id: WalletId) -> Result<Wallet, WalletError> {
        let cell = self.cell(wallet_id)?;
        let mut state = self.lock_wallet(&cell)?;

        if state.status == WalletStatus::Closed {
            return Err(WalletError::Closed(wallet_id));
        }
        state.status = WalletStatus::Frozen;

        info!(%wallet_id, "Wallet frozen");
        Ok(cell.snapshot_locked(&state))
    }

    /// Unfreezes a frozen wallet.
    ///
    /// # Errors
    ///
    /// `WalletClosed` when the wallet is closed.
    pub fn unfreeze_wallet(&self, wallet_id: WalletId) -> Result<Wallet, WalletError> {
        let cell = self.cell(wallet_id)?;
        let mut state = self.lock_wallet(&cell)?;

        if state.status == WalletStatus::Closed {
            return Err(WalletError::Closed(wallet_id));
        }
        state.status = WalletStatus::Active;

        info!(%wallet_id, "Wallet unfrozen");
        Ok(cell.snapshot_locked(&state))
    }

    /// Closes a wallet. Closed is terminal; all three balances must be
    /// zero.
    ///
    /// # Errors
    ///
    /// `WalletNotEmpty` while any balance is nonzero; `WalletClosed`
    /// when already closed.
    pub fn close_wallet(&self, wallet_id: WalletId) -> Result<Wallet, WalletError> {
        let cell = self.cell(wallet_id)?;
        let mut state = self.lock_wallet(&cell)?;

        if state.status == WalletStatus::Closed {
            return Err(WalletError::Closed(wallet_id));
        }
        if !state.available.is_zero() || !state.held.is_zero() || !state.pending.is_zero() {
            return Err(WalletError::NotEmpty(wallet_id));
        }
        state.status = WalletStatus::Closed;

        info!(%wallet_id, "Wallet closed");
        Ok(cell.snapshot_locked(&state))
    }

    /// Begins a withdrawal: earmarks available funds as pending while
    /// the external transfer is in flight. The ledger debit is
    /// provisional and posts only on confirmation, so pending funds
    /// stay backed by the liability account.
    ///
    /// # Errors
    ///
    /// `InsufficientAvailableBalance` when `amount` exceeds the
    /// available balance.
    pub fn begin_withdrawal(
        &self,
        wallet_id: WalletId,
        amount: Money,
        clearing_account: &str,
    ) -> Result<PendingWithdrawal, WalletError> {
        if !amount.is_positive() {
            return Err(WalletError::NonPositiveAmount);
        }

        let cell = self.cell(wallet_id)?;
        let mut state = self.lock_wallet(&cell)?;
        self.require_active(wallet_id, &state)?;

        if state.available < amount {
            return Err(WalletError::InsufficientAvailableBalance {
                available: state.available,
                requested: amount,
            });
        }

        state.available = state
            .available
            .checked_sub(amount)
            .ok_or(WalletError::AmountOverflow)?;
        state.pending = state
            .pending
            .checked_add(amount)
            .ok_or(WalletError::AmountOverflow)?;

        let withdrawal = PendingWithdrawal {
            withdrawal_id: WithdrawalId::new(),
            wallet_id,
            amount,
            clearing_account: clearing_account.to_string(),
            status: WithdrawalStatus::Pending,
            requested_at: Utc::now(),
            settled_at: None,
            batch_id: None,
        };
        self.withdrawals
            .insert(withdrawal.withdrawal_id, withdrawal.clone());

        info!(
            %wallet_id,
            withdrawal_id = %withdrawal.withdrawal_id,
            amount = %amount,
            "Withdrawal initiated, funds moved to pending"
        );
        Ok(withdrawal)
    }

    /// Confirms a withdrawal after the external transfer succeeded:
    /// posts the ledger debit and clears the pending earmark.
    ///
    /// The settlement batch uses an idempotency key derived from the
    /// withdrawal ID, so a retried confirmation settles at most once;
    /// confirming an already-confirmed withdrawal replays the original
    /// receipt.
    ///
    /// # Errors
    ///
    /// `WithdrawalNotFound` for unknown IDs, `WithdrawalNotPending`
    /// when the withdrawal already failed.
    pub fn confirm_withdrawal(
        &self,
        withdrawal_id: WithdrawalId,
    ) -> Result<WalletReceipt, WalletError> {
        let record = self
            .withdrawals
            .get(&withdrawal_id)
            .map(|entry| entry.clone())
            .ok_or(WalletError::WithdrawalNotFound(withdrawal_id))?;

        let cell = self.cell(record.wallet_id)?;
        let mut state = self.lock_wallet(&cell)?;

        // Withdrawal records only change under their wallet's lock, so
        // this re-read is race-free.
        let current = self
            .withdrawals
            .get(&withdrawal_id)
            .map(|entry| entry.clone())
            .ok_or(WalletError::WithdrawalNotFound(withdrawal_id))?;
        match current.status {
            WithdrawalStatus::Pending => {}
            // A retried confirmation replays the original settlement.
            WithdrawalStatus::Confirmed => {
                let batch_id = current
                    .batch_id
                    .ok_or(WalletError::WithdrawalNotPending(withdrawal_id))?;
                return Ok(WalletReceipt {
                    new_balance: state.available,
                    batch_id,
                });
            }
            WithdrawalStatus::Failed => {
                return Err(WalletError::WithdrawalNotPending(withdrawal_id));
            }
        }

        let liability = self.liability_account(state.owner_type)?;
        let new_pending = state
            .pending
            .checked_sub(record.amount)
            .ok_or(WalletError::AmountOverflow)?;
        let new_total_debited = state
            .total_debited
            .checked_add(record.amount)
            .ok_or(WalletError::AmountOverflow)?;

        let posted = self.engine.post_batch(PostBatchInput {
            category: BatchCategory::Withdrawal,
            description: format!("Withdrawal {withdrawal_id} settled from wallet {}", record.wallet_id),
            entries: vec![
                EntryInput::debit(liability, record.amount),
                EntryInput::credit(record.clearing_account.as_str(), record.amount),
            ],
            idempotency_key: Some(format!("withdrawal-{withdrawal_id}")),
            from_user: Some(state.owner_id),
            to_user: None,
            wallet_effect: Some(WalletEffect {
                wallet_id: record.wallet_id,
                direction: EntryType::Debit,
                amount: record.amount,
            }),
            reversal_of: None,
        })?;

        if !posted.replayed {
            state.pending = new_pending;
            state.total_debited = new_total_debited;
            state.last_transaction_at = Some(Utc::now());
        }

        if let Some(mut entry) = self.withdrawals.get_mut(&withdrawal_id) {
            entry.status = WithdrawalStatus::Confirmed;
            entry.settled_at = Some(Utc::now());
            entry.batch_id = Some(posted.batch.batch_id);
        }

        info!(
            wallet_id = %record.wallet_id,
            %withdrawal_id,
            batch_id = %posted.batch.batch_id,
            "Withdrawal confirmed and settled"
        );

        Ok(WalletReceipt {
            new_balance: state.available,
            batch_id: posted.batch.batch_id,
        })
    }

    /// Fails a withdrawal after the external transfer failed: the
    /// earmarked funds return to available with no ledger effect.
    ///
    /// # Errors
    ///
    /// `WithdrawalNotFound` / `WithdrawalNotPending` for unknown or
    /// already-settled withdrawals.
    pub fn fail_withdrawal(&self, withdrawal_id: WithdrawalId) -> Result<Wallet, WalletError> {
        let record = self
            .withdrawals
            .get(&withdrawal_id)
            .map(|entry| entry.clone())
            .ok_or(WalletError::WithdrawalNotFound(withdrawal_id))?;

        let cell = self.cell(record.wallet_id)?;
        let mut state = self.lock_wallet(&cell)?;

        let current_status = self
            .withdrawals
            .get(&withdrawal_id)
            .map(|entry| entry.status)
            .ok_or(WalletError::WithdrawalNotFound(withdrawal_id))?;
        if current_status != WithdrawalStatus::Pending {
            return Err(WalletError::WithdrawalNotPending(withdrawal_id));
        }

        state.pending = state
            .pending
            .checked_sub(record.amount)
            .ok_or(WalletError::AmountOverflow)?;
        state.available = state
            .available
            .checked_add(record.amount)
            .ok_or(WalletError::AmountOverflow)?;

        if let Some(mut entry) = self.withdrawals.get_mut(&withdrawal_id) {
            entry.status = WithdrawalStatus::Failed;
            entry.settled_at = Some(Utc::now());
        }

        info!(
            wallet_id = %record.wallet_id,
            %withdrawal_id,
            amount = %record.amount,
            "Withdrawal failed, funds returned to available"
        );
        Ok(cell.snapshot_locked(&state))
    }

    /// Gets a withdrawal record.
    ///
    /// # Errors
    ///
    /// Returns `WalletError::WithdrawalNotFound` for unknown IDs.
    pub fn get_withdrawal(
        &self,
        withdrawal_id: WithdrawalId,
    ) -> Result<PendingWithdrawal, WalletError> {
        self.withdrawals
            .get(&withdrawal_id)
            .map(|entry| entry.clone())
            .ok_or(WalletError::WithdrawalNotFound(withdrawal_id))
    }

    /// Reverses a posted batch, keeping any wallet it touched in sync
    /// with the ledger.
    ///
    /// Lifetime counters are gross and are not rewound by reversals.
    ///
    /// # Errors
    ///
    /// Any engine reversal failure; `InsufficientFunds` when reversing
    /// a credit whose funds the wallet has already spent.
    pub fn reverse_batch(
        &self,
        batch_id: BatchId,
        reason: &str,
    ) -> Result<TransactionBatch, WalletError> {
        let original = self.engine.get_batch(batch_id)?;

        let Some(effect) = original.wallet_effect else {
            // No wallet involved: a plain ledger reversal.
            return Ok(self.engine.reverse_batch(batch_id, reason)?.batch);
        };

        let cell = self.cell(effect.wallet_id)?;
        let mut state = self.lock_wallet(&cell)?;

        let new_available = match effect.direction {
            // The original credited the wallet; the reversal takes the
            // funds back and must not drive available negative.
            EntryType::Credit => {
                if state.available < effect.amount {
                    return Err(WalletError::InsufficientFunds {
                        available: state.available,
                        requested: effect.amount,
                    });
                }
                state
                    .available
                    .checked_sub(effect.amount)
                    .ok_or(WalletError::AmountOverflow)?
            }
            // The original debited the wallet; the reversal restores
            // the funds.
            EntryType::Debit => state
                .available
                .checked_add(effect.amount)
                .ok_or(WalletError::AmountOverflow)?,
        };

        let reversal = self.engine.reverse_batch(batch_id, reason)?;
        state.available = new_available;
        state.last_transaction_at = Some(Utc::now());

        info!(
            wallet_id = %effect.wallet_id,
            original = %batch_id,
            reversal = %reversal.batch.batch_id,
            "Wallet batch reversed"
        );
        Ok(reversal.batch)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn cell(&self, wallet_id: WalletId) -> Result<Arc<WalletCell>, WalletError> {
        self.wallets
            .get(&wallet_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(WalletError::NotFound(wallet_id))
    }

    fn lock_wallet<'a>(
        &self,
        cell: &'a WalletCell,
    ) -> Result<MutexGuard<'a, WalletState>, WalletError> {
        cell.state
            .try_lock_for(self.engine.config().lock_wait)
            .ok_or(WalletError::LockTimeout)
    }

    fn require_active(&self, wallet_id: WalletId, state: &WalletState) -> Result<(), WalletError> {
        match state.status {
            WalletStatus::Active => Ok(()),
            WalletStatus::Frozen => Err(WalletError::Frozen(wallet_id)),
            WalletStatus::Closed => Err(WalletError::Closed(wallet_id)),
        }
    }

    fn liability_account(&self, owner_type: OwnerType) -> Result<String, WalletError> {
        self.liability_accounts
            .get(&owner_type)
            .cloned()
            .ok_or(WalletError::LiabilityAccountUnmapped(owner_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::types::{AccountType, CreateAccountInput};
    use crate::ledger::EngineConfig;

    fn money(units: i64) -> Money {
        Money::from_minor_units(units)
    }

    fn service() -> WalletService {
        let engine = Arc::new(LedgerEngine::new(EngineConfig::default()));
        for (code, name, account_type, floor) in [
            ("1000-CASH", "Operating cash", AccountType::Asset, None),
            ("1100-CLEARING", "Withdrawal clearing", AccountType::Asset, None),
            (
                "2100-PATIENT-WALLETS",
                "Patient wallet liability",
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

        let liability_accounts = HashMap::from([(
            OwnerType::Patient,
            "2100-PATIENT-WALLETS".to_string(),
        )]);
        WalletService::new(engine, Currency::Ngn, liability_accounts)
    }

    fn patient_wallet(service: &WalletService) -> WalletId {
        service
            .open_wallet(OwnerId::new(), OwnerType::Patient)
            .unwrap()
            .wallet_id
    }

    #[test]
    fn test_open_wallet_is_idempotent_per_owner() {
        let service = service();
        let owner = OwnerId::new();

        let first = service.open_wallet(owner, OwnerType::Patient).unwrap();
        let second = service.open_wallet(owner, OwnerType::Patient).unwrap();
        assert_eq!(first.wallet_id, second.wallet_id);
    }

    #[test]
    fn test_credit_updates_wallet_and_liability() {
        let service = service();
        let wallet_id = patient_wallet(&service);

        let receipt = service
            .credit(
                wallet_id,
                money(10_000),
                BatchCategory::WalletTopup,
                "1000-CASH",
                None,
            )
            .unwrap();
        assert_eq!(receipt.new_balance, money(10_000));

        let wallet = service.get_wallet(wallet_id).unwrap();
        assert_eq!(wallet.available_balance, money(10_000));
        assert_eq!(wallet.total_credited, money(10_000));
        assert!(wallet.last_transaction_at.is_some());

        let liability = service
            .engine()
            .chart()
            .get_account("2100-PATIENT-WALLETS")
            .unwrap();
        assert_eq!(liability.current_balance, money(10_000));
    }

    #[test]
    fn test_debit_moves_funds_to_destination() {
        let service = service();
        let wallet_id = patient_wallet(&service);
        service
            .credit(wallet_id, money(10_000), BatchCategory::WalletTopup, "1000-CASH", None)
            .unwrap();

        let receipt = service
            .debit(
                wallet_id,
                money(4_000),
                BatchCategory::PharmacyPurchase,
                "4000-PHARMACY-REVENUE",
                None,
            )
            .unwrap();
        assert_eq!(receipt.new_balance, money(6_000));

        let revenue = service
            .engine()
            .chart()
            .get_account("4000-PHARMACY-REVENUE")
            .unwrap();
        assert_eq!(revenue.current_balance, money(4_000));

        let wallet = service.get_wallet(wallet_id).unwrap();
        assert_eq!(wallet.total_debited, money(4_000));
    }

    #[test]
    fn test_debit_insufficient_funds_has_no_side_effect() {
        let service = service();
        let wallet_id = patient_wallet(&service);
        service
            .credit(wallet_id, money(10_000), BatchCategory::WalletTopup, "1000-CASH", None)
            .unwrap();
        let entries_before = service.engine().entry_count();

        let result = service.debit(
            wallet_id,
            money(15_000),
            BatchCategory::Withdrawal,
            "1100-CLEARING",
            None,
        );

        assert!(matches!(
            result,
            Err(WalletError::InsufficientFunds { .. })
        ));
        assert_eq!(
            service.get_wallet(wallet_id).unwrap().available_balance,
            money(10_000)
        );
        assert_eq!(service.engine().entry_count(), entries_before);
    }

    #[test]
    fn test_frozen_wallet_rejects_activity() {
        let service = service();
        let wallet_id = patient_wallet(&service);
        service
            .credit(wallet_id, money(5_000), BatchCategory::WalletTopup, "1000-CASH", None)
            .unwrap();
        service.freeze_wallet(wallet_id).unwrap();

        let credit = service.credit(
            wallet_id,
            money(1_000),
            BatchCategory::WalletTopup,
            "1000-CASH",
            None,
        );
        assert!(matches!(credit, Err(WalletError::Frozen(_))));

        let debit = service.debit(
            wallet_id,
            money(1_000),
            BatchCategory::Withdrawal,
            "1100-CLEARING",
            None,
        );
        assert!(matches!(debit, Err(WalletError::Frozen(_))));

        service.unfreeze_wallet(wallet_id).unwrap();
        assert!(
            service
                .credit(wallet_id, money(1_000), BatchCategory::WalletTopup, "1000-CASH", None)
                .is_ok()
        );
    }

    #[test]
    fn test_close_requires_zero_balances() {
        let service = service();
        let wallet_id = patient_wallet(&service);
        service
            .credit(wallet_id, money(5_000), BatchCategory::WalletTopup, "1000-CASH", None)
            .unwrap();

        assert!(matches!(
            service.close_wallet(wallet_id),
            Err(WalletError::NotEmpty(_))
        ));

        service
            .debit(wallet_id, money(5_000), BatchCategory::Withdrawal, "1100-CLEARING", None)
            .unwrap();
        let closed = service.close_wallet(wallet_id).unwrap();
        assert_eq!(closed.status, WalletStatus::Closed);

        // Closed is terminal.
        assert!(matches!(
            service.freeze_wallet(wallet_id),
            Err(WalletError::Closed(_))
        ));
    }

    #[test]
    fn test_hold_and_release() {
        let service = service();
        let wallet_id = patient_wallet(&service);
        service
            .credit(wallet_id, money(10_000), BatchCategory::WalletTopup, "1000-CASH", None)
            .unwrap();
        let entries_before = service.engine().entry_count();

        let balances = service.hold(wallet_id, money(4_000)).unwrap();
        assert_eq!(balances.available, money(6_000));
        assert_eq!(balances.held, money(4_000));

        // Held funds are not available for debit.
        assert!(matches!(
            service.debit(wallet_id, money(7_000), BatchCategory::Withdrawal, "1100-CLEARING", None),
            Err(WalletError::InsufficientFunds { .. })
        ));

        let balances = service.release(wallet_id, money(4_000)).unwrap();
        assert_eq!(balances.available, money(10_000));
        assert_eq!(balances.held, Money::ZERO);

        assert!(matches!(
            service.release(wallet_id, money(1)),
            Err(WalletError::InsufficientHeldBalance { .. })
        ));

        // Holds and releases never touch the ledger.
        assert_eq!(service.engine().entry_count(), entries_before);
    }

    #[test]
    fn test_wallet_level_idempotent_replay() {
        let service = service();
        let wallet_id = patient_wallet(&service);

        let first = service
            .credit(
                wallet_id,
                money(10_000),
                BatchCategory::WalletTopup,
                "1000-CASH",
                Some("topup-42".to_string()),
            )
            .unwrap();
        let second = service
            .credit(
                wallet_id,
                money(10_000),
                BatchCategory::WalletTopup,
                "1000-CASH",
                Some("topup-42".to_string()),
            )
            .unwrap();

        assert_eq!(first.batch_id, second.batch_id);
        assert_eq!(second.new_balance, money(10_000));
        assert_eq!(
            service.get_wallet(wallet_id).unwrap().available_balance,
            money(10_000)
        );
        assert_eq!(
            service.get_wallet(wallet_id).unwrap().total_credited,
            money(10_000)
        );
    }

    #[test]
    fn test_withdrawal_lifecycle_confirm() {
        let service = service();
        let wallet_id = patient_wallet(&service);
        service
            .credit(wallet_id, money(10_000), BatchCategory::WalletTopup, "1000-CASH", None)
            .unwrap();

        let withdrawal = service
            .begin_withdrawal(wallet_id, money(6_000), "1100-CLEARING")
            .unwrap();
        let balances = service.get_balance(wallet_id).unwrap();
        assert_eq!(balances.available, money(4_000));
        assert_eq!(balances.pending, money(6_000));

        // The earmark posts nothing: liability still backs the funds.
        let liability = service
            .engine()
            .chart()
            .get_account("2100-PATIENT-WALLETS")
            .unwrap();
        assert_eq!(liability.current_balance, money(10_000));

        let receipt = service
            .confirm_withdrawal(withdrawal.withdrawal_id)
            .unwrap();
        let balances = service.get_balance(wallet_id).unwrap();
        assert_eq!(balances.available, money(4_000));
        assert_eq!(balances.pending, Money::ZERO);
        assert_eq!(receipt.new_balance, money(4_000));

        let liability = service
            .engine()
            .chart()
            .get_account("2100-PATIENT-WALLETS")
            .unwrap();
        assert_eq!(liability.current_balance, money(4_000));

        // A retried confirmation replays the settlement: same batch,
        // no second debit.
        let replay = service
            .confirm_withdrawal(withdrawal.withdrawal_id)
            .unwrap();
        assert_eq!(replay.batch_id, receipt.batch_id);
        let liability = service
            .engine()
            .chart()
            .get_account("2100-PATIENT-WALLETS")
            .unwrap();
        assert_eq!(liability.current_balance, money(4_000));

        // A failed withdrawal cannot be confirmed.
        let other = service
            .begin_withdrawal(wallet_id, money(1_000), "1100-CLEARING")
            .unwrap();
        service.fail_withdrawal(other.withdrawal_id).unwrap();
        assert!(matches!(
            service.confirm_withdrawal(other.withdrawal_id),
            Err(WalletError::WithdrawalNotPending(_))
        ));
    }

    #[test]
    fn test_withdrawal_lifecycle_fail() {
        let service = service();
        let wallet_id = patient_wallet(&service);
        service
            .credit(wallet_id, money(10_000), BatchCategory::WalletTopup, "1000-CASH", None)
            .unwrap();
        let entries_before = service.engine().entry_count();

        let withdrawal = service
            .begin_withdrawal(wallet_id, money(6_000), "1100-CLEARING")
            .unwrap();
        let wallet = service.fail_withdrawal(withdrawal.withdrawal_id).unwrap();

        assert_eq!(wallet.available_balance, money(10_000));
        assert_eq!(wallet.pending_balance, Money::ZERO);
        // A failed transfer leaves no ledger trace.
        assert_eq!(service.engine().entry_count(), entries_before);

        let record = service.get_withdrawal(withdrawal.withdrawal_id).unwrap();
        assert_eq!(record.status, WithdrawalStatus::Failed);
    }

    #[test]
    fn test_reverse_wallet_debit_restores_balance() {
        let service = service();
        let wallet_id = patient_wallet(&service);
        service
            .credit(wallet_id, money(10_000), BatchCategory::WalletTopup, "1000-CASH", None)
            .unwrap();
        let receipt = service
            .debit(
                wallet_id,
                money(4_000),
                BatchCategory::PharmacyPurchase,
                "4000-PHARMACY-REVENUE",
                None,
            )
            .unwrap();

        let reversal = service.reverse_batch(receipt.batch_id, "Refund").unwrap();
        assert_eq!(reversal.reversal_of, Some(receipt.batch_id));

        assert_eq!(
            service.get_wallet(wallet_id).unwrap().available_balance,
            money(10_000)
        );
        let revenue = service
            .engine()
            .chart()
            .get_account("4000-PHARMACY-REVENUE")
            .unwrap();
        assert_eq!(revenue.current_balance, Money::ZERO);
    }

    #[test]
    fn test_reverse_credit_requires_unspent_funds() {
        let service = service();
        let wallet_id = patient_wallet(&service);
        let topup = service
            .credit(wallet_id, money(10_000), BatchCategory::WalletTopup, "1000-CASH", None)
            .unwrap();
        service
            .debit(wallet_id, money(8_000), BatchCategory::PharmacyPurchase, "4000-PHARMACY-REVENUE", None)
            .unwrap();

        // Only 2000 left; the 10000 top-up cannot be clawed back.
        assert!(matches!(
            service.reverse_batch(topup.batch_id, "Chargeback"),
            Err(WalletError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn test_get_balance_unknown_wallet() {
        let service = service();
        assert!(matches!(
            service.get_balance(WalletId::new()),
            Err(WalletError::NotFound(_))
        ));
    }

    #[test]
    fn test_transaction_history_pages_newest_first() {
        let service = service();
        let wallet_id = patient_wallet(&service);
        service
            .credit(wallet_id, money(10_000), BatchCategory::WalletTopup, "1000-CASH", None)
            .unwrap();
        service
            .debit(wallet_id, money(2_500), BatchCategory::PharmacyPurchase, "4000-PHARMACY-REVENUE", None)
            .unwrap();

        let history = service
            .get_transaction_history(wallet_id, PageRequest::default())
            .unwrap();
        assert_eq!(history.meta.total, 2);
        assert_eq!(history.data[0].category, BatchCategory::PharmacyPurchase);
        assert_eq!(history.data[1].category, BatchCategory::WalletTopup);
    }
}
