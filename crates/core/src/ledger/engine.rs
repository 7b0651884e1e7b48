//! The transaction batch engine: the single write path for all
//! financial state change.
//!
//! Posting protocol:
//! 1. idempotent-replay fast path
//! 2. structural validation (balanced, positive, >= 2 entries)
//! 3. account resolution (exists, active) with metadata copied out
//! 4. balance locks acquired in account-code order with a bounded wait
//! 5. replay re-check under the locks
//! 6. the full posting plan is computed; any floor violation or
//!    overflow aborts with nothing written
//! 7. commit: balances, entry log, batch record, idempotency register
//!
//! Locks for a batch are always taken in account-code order, so two
//! concurrently-posting batches that share accounts in opposite order
//! cannot deadlock; they serialize on the first shared account.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use curafin_shared::types::{BatchId, EntryId, Money, PageRequest, PageResponse, WalletId};
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

use crate::accounts::chart::{AccountCell, BalanceState, ChartOfAccounts};
use crate::accounts::types::NormalBalance;
use crate::events::{EventBus, LedgerEvent};

use super::batch::{
    BatchCategory, BatchFilter, BatchStatus, PostBatchInput, PostedBatch, TransactionBatch,
    WalletEffect,
};
use super::entry::{EntryInput, EntryStatus, LedgerEntry};
use super::error::LedgerError;
use super::validation;

/// Tuning knobs for the posting engine.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Maximum time to wait for one account lock.
    pub lock_wait: Duration,
    /// Internal retries after a lock timeout before surfacing it.
    pub posting_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_wait: Duration::from_millis(2_000),
            posting_retries: 3,
        }
    }
}

/// Account data resolved ahead of locking.
struct ResolvedAccount {
    cell: Arc<AccountCell>,
    normal: NormalBalance,
    floor: Option<Money>,
}

/// Per-account running state while a posting plan is computed.
struct Running {
    balance: Money,
    entry_count: i64,
}

/// The ledger engine: chart of accounts, append-only entry log, batch
/// store, and idempotency register.
pub struct LedgerEngine {
    chart: ChartOfAccounts,
    entries: RwLock<Vec<LedgerEntry>>,
    batches: DashMap<BatchId, TransactionBatch>,
    batch_order: RwLock<Vec<BatchId>>,
    idempotency: DashMap<String, BatchId>,
    reversal_lock: Mutex<()>,
    config: EngineConfig,
    events: EventBus,
}

impl LedgerEngine {
    /// Creates an engine with an empty chart of accounts.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            chart: ChartOfAccounts::new(),
            entries: RwLock::new(Vec::new()),
            batches: DashMap::new(),
            batch_order: RwLock::new(Vec::new()),
            idempotency: DashMap::new(),
            reversal_lock: Mutex::new(()),
            config,
            events: EventBus::default(),
        }
    }

    /// The chart of accounts this engine posts against.
    #[must_use]
    pub fn chart(&self) -> &ChartOfAccounts {
        &self.chart
    }

    /// The event bus batches are announced on.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// The engine's tuning configuration.
    #[must_use]
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Validates and atomically posts a balanced batch.
    ///
    /// A lock timeout is retried internally a bounded number of times
    /// with the same idempotency key before surfacing to the caller.
    ///
    /// # Errors
    ///
    /// Returns a `LedgerError` on any validation or contention failure;
    /// a failed call leaves zero ledger entries for the batch.
    pub fn post_batch(&self, input: PostBatchInput) -> Result<PostedBatch, LedgerError> {
        let mut attempts: u32 = 0;
        loop {
            match self.try_post(&input) {
                Err(LedgerError::LockTimeout) if attempts < self.config.posting_retries => {
                    attempts += 1;
                    warn!(
                        attempt = attempts,
                        category = %input.category,
                        "Account lock contention, retrying batch post"
                    );
                }
                Err(err) if !err.is_retryable() => {
                    self.record_failed_batch(&input, &err);
                    return Err(err);
                }
                other => return other,
            }
        }
    }

    /// Records a failed batch for the audit surface. A failed batch
    /// carries zero entries and never registers its idempotency key,
    /// so a corrected retry can still post.
    fn record_failed_batch(&self, input: &PostBatchInput, err: &LedgerError) {
        let batch_id = BatchId::new();
        let now = Utc::now();
        let batch = TransactionBatch {
            batch_id,
            category: input.category,
            description: input.description.clone(),
            status: BatchStatus::Failed,
            entries: Vec::new(),
            total_debits: Money::ZERO,
            total_credits: Money::ZERO,
            from_user: input.from_user,
            to_user: input.to_user,
            idempotency_key: None,
            reversal_of: input.reversal_of,
            reversed_by: None,
            wallet_effect: input.wallet_effect,
            created_at: now,
            posted_at: None,
        };
        self.batches.insert(batch_id, batch);
        self.batch_order.write().push(batch_id);
        warn!(
            %batch_id,
            category = %input.category,
            error = %err,
            "Batch failed, no entries posted"
        );
    }

    /// One posting attempt. See the module docs for the protocol.
    fn try_post(&self, input: &PostBatchInput) -> Result<PostedBatch, LedgerError> {
        if let Some(key) = &input.idempotency_key {
            if let Some(replayed) = self.replayed(key) {
                return Ok(replayed);
            }
        }

        let totals = validation::validate_entries(&input.entries)?;

        // Resolve every referenced account. BTreeMap keys give the
        // deterministic code-ordered lock sequence.
        let mut resolved: BTreeMap<String, ResolvedAccount> = BTreeMap::new();
        for entry in &input.entries {
            if resolved.contains_key(&entry.account_code) {
                continue;
            }
            let cell = self
                .chart
                .cell(&entry.account_code)
                .ok_or_else(|| LedgerError::AccountNotFound(entry.account_code.clone()))?;
            let meta = cell.meta.read().clone();
            if !meta.is_active {
                return Err(LedgerError::AccountInactive(entry.account_code.clone()));
            }
            resolved.insert(
                entry.account_code.clone(),
                ResolvedAccount {
                    cell,
                    normal: meta.account_type.normal_balance(),
                    floor: meta.floor,
                },
            );
        }

        // Lock balances in code order with a bounded wait.
        let mut guards: BTreeMap<&str, MutexGuard<'_, BalanceState>> = BTreeMap::new();
        for (code, account) in &resolved {
            let guard = account
                .cell
                .balance
                .try_lock_for(self.config.lock_wait)
                .ok_or(LedgerError::LockTimeout)?;
            guards.insert(code.as_str(), guard);
        }

        // A retried request shares this batch's accounts, so a replay
        // that lost the fast-path race is caught here, serialized by
        // the account locks the original commit held.
        if let Some(key) = &input.idempotency_key {
            if let Some(replayed) = self.replayed(key) {
                return Ok(replayed);
            }
        }

        // Compute the full posting plan before writing anything.
        let batch_id = BatchId::new();
        let now = Utc::now();
        let mut running: BTreeMap<&str, Running> = guards
            .iter()
            .map(|(code, guard)| {
                (
                    *code,
                    Running {
                        balance: guard.balance,
                        entry_count: guard.entry_count,
                    },
                )
            })
            .collect();

        let mut planned_entries: Vec<LedgerEntry> = Vec::with_capacity(input.entries.len());
        for entry in &input.entries {
            let code = entry.account_code.as_str();
            let account = resolved
                .get(code)
                .ok_or_else(|| LedgerError::Internal(format!("unresolved account {code}")))?;
            let state = running
                .get_mut(code)
                .ok_or_else(|| LedgerError::Internal(format!("unlocked account {code}")))?;

            let change = account
                .normal
                .balance_change(entry.debit_amount(), entry.credit_amount())
                .ok_or(LedgerError::AmountOverflow)?;
            let balance_after = state
                .balance
                .checked_add(change)
                .ok_or(LedgerError::AmountOverflow)?;

            if let Some(floor) = account.floor {
                if balance_after < floor {
                    return Err(LedgerError::InsufficientFunds {
                        account_code: entry.account_code.clone(),
                    });
                }
            }

            planned_entries.push(LedgerEntry {
                entry_id: EntryId::new(),
                batch_id,
                account_code: entry.account_code.clone(),
                entry_type: entry.entry_type,
                amount: entry.amount,
                balance_before: state.balance,
                balance_after,
                description: entry
                    .description
                    .clone()
                    .unwrap_or_else(|| input.description.clone()),
                status: EntryStatus::Posted,
                created_at: now,
            });

            state.balance = balance_after;
            state.entry_count += 1;
        }

        // Commit. The account locks are still held, so readers observe
        // either none or all of the batch.
        for (code, state) in &running {
            if let Some(guard) = guards.get_mut(code) {
                guard.balance = state.balance;
                guard.entry_count = state.entry_count;
            }
        }

        let batch = TransactionBatch {
            batch_id,
            category: input.category,
            description: input.description.clone(),
            status: BatchStatus::Posted,
            entries: planned_entries.clone(),
            total_debits: totals.total_debits,
            total_credits: totals.total_credits,
            from_user: input.from_user,
            to_user: input.to_user,
            idempotency_key: input.idempotency_key.clone(),
            reversal_of: input.reversal_of,
            reversed_by: None,
            wallet_effect: input.wallet_effect,
            created_at: now,
            posted_at: Some(now),
        };

        self.entries.write().extend(planned_entries);
        self.batches.insert(batch_id, batch.clone());
        self.batch_order.write().push(batch_id);
        if let Some(key) = &input.idempotency_key {
            self.idempotency.insert(key.clone(), batch_id);
        }

        info!(
            batch_id = %batch_id,
            category = %batch.category,
            total = %batch.total_debits,
            entries = batch.entries.len(),
            "Batch posted"
        );
        self.events.publish(LedgerEvent::BatchPosted {
            batch_id,
            category: batch.category,
            total_amount: batch.total_debits,
        });

        Ok(PostedBatch {
            batch,
            replayed: false,
        })
    }

    /// Looks up a completed posting for an idempotency key.
    fn replayed(&self, key: &str) -> Option<PostedBatch> {
        let batch_id = *self.idempotency.get(key)?;
        let batch = self.batches.get(&batch_id)?.clone();
        debug!(%batch_id, key, "Idempotency key replayed, returning original batch");
        Some(PostedBatch {
            batch,
            replayed: true,
        })
    }

    /// Reverses a posted batch by posting a mirror-image batch and
    /// marking the original as reversed.
    ///
    /// # Errors
    ///
    /// `BatchNotFound`, `AlreadyReversed`, or `NotPosted` when the
    /// original is missing or not in a reversible state; any posting
    /// error from the mirror batch itself.
    pub fn reverse_batch(
        &self,
        batch_id: BatchId,
        reason: &str,
    ) -> Result<PostedBatch, LedgerError> {
        // Serializes reversals so the status check-and-mark is atomic.
        let _guard = self
            .reversal_lock
            .try_lock_for(self.config.lock_wait)
            .ok_or(LedgerError::LockTimeout)?;

        let original = self
            .batches
            .get(&batch_id)
            .map(|batch| batch.clone())
            .ok_or(LedgerError::BatchNotFound(batch_id))?;

        match original.status {
            BatchStatus::Reversed => return Err(LedgerError::AlreadyReversed(batch_id)),
            BatchStatus::Pending | BatchStatus::Failed => {
                return Err(LedgerError::NotPosted(batch_id));
            }
            BatchStatus::Posted => {}
        }

        let entries: Vec<EntryInput> = original
            .entries
            .iter()
            .map(|entry| EntryInput {
                account_code: entry.account_code.clone(),
                entry_type: entry.entry_type.mirrored(),
                amount: entry.amount,
                description: Some(format!("Reversal: {}", entry.description)),
            })
            .collect();

        let reversal_input = PostBatchInput {
            category: BatchCategory::Reversal,
            description: format!("Reversal of batch {batch_id}. Reason: {reason}"),
            entries,
            idempotency_key: None,
            from_user: original.to_user,
            to_user: original.from_user,
            wallet_effect: original.wallet_effect.map(|effect| WalletEffect {
                direction: effect.direction.mirrored(),
                ..effect
            }),
            reversal_of: Some(batch_id),
        };

        let reversal = self.post_batch(reversal_input)?;

        if let Some(mut original_batch) = self.batches.get_mut(&batch_id) {
            original_batch.status = BatchStatus::Reversed;
            original_batch.reversed_by = Some(reversal.batch.batch_id);
            for entry in &mut original_batch.entries {
                entry.status = EntryStatus::Reversed;
            }
        }
        {
            let mut log = self.entries.write();
            for entry in log.iter_mut().filter(|entry| entry.batch_id == batch_id) {
                entry.status = EntryStatus::Reversed;
            }
        }

        info!(
            original = %batch_id,
            reversal = %reversal.batch.batch_id,
            reason,
            "Batch reversed"
        );
        self.events.publish(LedgerEvent::BatchReversed {
            original_batch_id: batch_id,
            reversal_batch_id: reversal.batch.batch_id,
        });

        Ok(reversal)
    }

    // ========================================================================
    // Read surface
    // ========================================================================

    /// Gets a batch by ID.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::BatchNotFound` for unknown IDs.
    pub fn get_batch(&self, batch_id: BatchId) -> Result<TransactionBatch, LedgerError> {
        self.batches
            .get(&batch_id)
            .map(|batch| batch.clone())
            .ok_or(LedgerError::BatchNotFound(batch_id))
    }

    /// Lists batches newest-first with optional filters.
    #[must_use]
    pub fn list_batches(
        &self,
        filter: &BatchFilter,
        page: PageRequest,
    ) -> PageResponse<TransactionBatch> {
        let page = page.normalized();
        let order = self.batch_order.read();

        let matching: Vec<TransactionBatch> = order
            .iter()
            .rev()
            .filter_map(|id| self.batches.get(id).map(|batch| batch.clone()))
            .filter(|batch| {
                filter.category.is_none_or(|c| batch.category == c)
                    && filter.status.is_none_or(|s| batch.status == s)
                    && filter.from.is_none_or(|from| batch.created_at >= from)
                    && filter.to.is_none_or(|to| batch.created_at <= to)
            })
            .collect();

        let total = matching.len() as u64;
        let data = matching
            .into_iter()
            .skip(page.offset())
            .take(page.limit())
            .collect();
        PageResponse::new(data, page.page, page.per_page, total)
    }

    /// Lists the batches that moved a wallet's funds, newest-first.
    #[must_use]
    pub fn batches_for_wallet(
        &self,
        wallet_id: WalletId,
        page: PageRequest,
    ) -> PageResponse<TransactionBatch> {
        let page = page.normalized();
        let order = self.batch_order.read();

        let matching: Vec<TransactionBatch> = order
            .iter()
            .rev()
            .filter_map(|id| self.batches.get(id).map(|batch| batch.clone()))
            .filter(|batch| {
                batch.status.is_posted()
                    && batch
                        .wallet_effect
                        .is_some_and(|effect| effect.wallet_id == wallet_id)
            })
            .collect();

        let total = matching.len() as u64;
        let data = matching
            .into_iter()
            .skip(page.offset())
            .take(page.limit())
            .collect();
        PageResponse::new(data, page.page, page.per_page, total)
    }

    /// Lists ledger entries newest-first, optionally scoped to one
    /// account.
    #[must_use]
    pub fn list_entries(
        &self,
        account_code: Option<&str>,
        page: PageRequest,
    ) -> PageResponse<LedgerEntry> {
        let page = page.normalized();
        let log = self.entries.read();

        let matching: Vec<LedgerEntry> = log
            .iter()
            .rev()
            .filter(|entry| account_code.is_none_or(|code| entry.account_code == code))
            .cloned()
            .collect();

        let total = matching.len() as u64;
        let data = matching
            .into_iter()
            .skip(page.offset())
            .take(page.limit())
            .collect();
        PageResponse::new(data, page.page, page.per_page, total)
    }

    /// All entries for one account in posting order.
    #[must_use]
    pub fn entries_for_account(&self, account_code: &str) -> Vec<LedgerEntry> {
        self.entries
            .read()
            .iter()
            .filter(|entry| entry.account_code == account_code)
            .cloned()
            .collect()
    }

    /// Total number of posted entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.read().len()
    }

    /// Total number of batches ever accepted.
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Read guard over the full entry log, for in-crate reporting.
    pub(crate) fn entries_log(&self) -> RwLockReadGuard<'_, Vec<LedgerEntry>> {
        self.entries.read()
    }

    /// The batch store, for in-crate reporting.
    pub(crate) fn batch_store(&self) -> &DashMap<BatchId, TransactionBatch> {
        &self.batches
    }
}

impl Default for LedgerEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
