//! Transaction batch domain types.
//!
//! A batch is an atomic, balanced group of ledger entries posted as one
//! unit. Batches are the only path through which entries are created.

use chrono::{DateTime, Utc};
use curafin_shared::types::{BatchId, Money, OwnerId, WalletId};
use serde::{Deserialize, Serialize};

use super::entry::{EntryType, LedgerEntry};

/// Semantic reason for a batch, for reporting and audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchCategory {
    /// Wallet top-up from an external payment.
    WalletTopup,
    /// Withdrawal from a wallet to an external destination.
    Withdrawal,
    /// Pharmacy purchase paid from a wallet.
    PharmacyPurchase,
    /// Appointment payment captured from a wallet.
    AppointmentPayment,
    /// Referral reward granted to a wallet.
    ReferralReward,
    /// Manual journal entry posted by an administrator.
    Journal,
    /// Platform operating fund movement.
    OperatingFund,
    /// Reversal of a previously posted batch.
    Reversal,
}

impl std::fmt::Display for BatchCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::WalletTopup => "WALLET_TOPUP",
            Self::Withdrawal => "WITHDRAWAL",
            Self::PharmacyPurchase => "PHARMACY_PURCHASE",
            Self::AppointmentPayment => "APPOINTMENT_PAYMENT",
            Self::ReferralReward => "REFERRAL_REWARD",
            Self::Journal => "JOURNAL",
            Self::OperatingFund => "OPERATING_FUND",
            Self::Reversal => "REVERSAL",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for BatchCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "WALLET_TOPUP" => Ok(Self::WalletTopup),
            "WITHDRAWAL" => Ok(Self::Withdrawal),
            "PHARMACY_PURCHASE" => Ok(Self::PharmacyPurchase),
            "APPOINTMENT_PAYMENT" => Ok(Self::AppointmentPayment),
            "REFERRAL_REWARD" => Ok(Self::ReferralReward),
            "JOURNAL" => Ok(Self::Journal),
            "OPERATING_FUND" => Ok(Self::OperatingFund),
            "REVERSAL" => Ok(Self::Reversal),
            _ => Err(format!("Unknown batch category: {s}")),
        }
    }
}

/// Batch lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// Batch is being validated, nothing is visible yet.
    Pending,
    /// Batch was posted in full.
    Posted,
    /// Batch failed validation, no entries were created.
    Failed,
    /// Batch was posted and later reversed by a new batch.
    Reversed,
}

impl BatchStatus {
    /// Returns true if the batch reached the ledger.
    #[must_use]
    pub const fn is_posted(self) -> bool {
        matches!(self, Self::Posted | Self::Reversed)
    }
}

/// The wallet-side effect a batch carries, recorded so reversals and
/// wallet history can be tied back to the owning wallet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WalletEffect {
    /// The wallet affected.
    pub wallet_id: WalletId,
    /// `Credit` when the wallet balance increased, `Debit` when it
    /// decreased.
    pub direction: EntryType,
    /// The amount moved, in minor units.
    pub amount: Money,
}

/// An atomic, balanced group of ledger entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionBatch {
    /// Unique identifier.
    pub batch_id: BatchId,
    /// Semantic reason for the batch.
    pub category: BatchCategory,
    /// Human-readable description.
    pub description: String,
    /// Lifecycle status.
    pub status: BatchStatus,
    /// The posted entries (at least 2).
    pub entries: Vec<LedgerEntry>,
    /// Sum of debit amounts.
    pub total_debits: Money,
    /// Sum of credit amounts (equals `total_debits` when posted).
    pub total_credits: Money,
    /// Optional paying party, for reporting.
    pub from_user: Option<OwnerId>,
    /// Optional receiving party, for reporting.
    pub to_user: Option<OwnerId>,
    /// Idempotency key the batch was posted under, if any.
    pub idempotency_key: Option<String>,
    /// Set on reversal batches: the batch being reversed.
    pub reversal_of: Option<BatchId>,
    /// Set on reversed batches: the reversal batch.
    pub reversed_by: Option<BatchId>,
    /// Wallet-side effect, if the batch moved wallet funds.
    pub wallet_effect: Option<WalletEffect>,
    /// When the batch was created.
    pub created_at: DateTime<Utc>,
    /// When the batch was posted.
    pub posted_at: Option<DateTime<Utc>>,
}

/// Input for posting a new batch.
#[derive(Debug, Clone)]
pub struct PostBatchInput {
    /// Semantic reason for the batch.
    pub category: BatchCategory,
    /// Human-readable description.
    pub description: String,
    /// The entries to post (at least 2, balanced).
    pub entries: Vec<super::entry::EntryInput>,
    /// Caller-supplied token: at most one financial effect per key.
    pub idempotency_key: Option<String>,
    /// Optional paying party.
    pub from_user: Option<OwnerId>,
    /// Optional receiving party.
    pub to_user: Option<OwnerId>,
    /// Wallet-side effect carried by this batch (set by the wallet
    /// service, `None` for plain journal entries).
    pub wallet_effect: Option<WalletEffect>,
    /// Marks this batch as the reversal of another.
    pub reversal_of: Option<BatchId>,
}

impl PostBatchInput {
    /// Creates a plain batch input with no parties or wallet effect.
    #[must_use]
    pub fn new(
        category: BatchCategory,
        description: impl Into<String>,
        entries: Vec<super::entry::EntryInput>,
    ) -> Self {
        Self {
            category,
            description: description.into(),
            entries,
            idempotency_key: None,
            from_user: None,
            to_user: None,
            wallet_effect: None,
            reversal_of: None,
        }
    }

    /// Attaches an idempotency key.
    #[must_use]
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Result of a successful `post_batch` call.
#[derive(Debug, Clone)]
pub struct PostedBatch {
    /// The posted batch.
    pub batch: TransactionBatch,
    /// True if an idempotency key was replayed: the batch is the
    /// original one and no new financial effect occurred.
    pub replayed: bool,
}

/// Filter options for listing batches.
#[derive(Debug, Clone, Default)]
pub struct BatchFilter {
    /// Filter by category.
    pub category: Option<BatchCategory>,
    /// Filter by status.
    pub status: Option<BatchStatus>,
    /// Only batches created at or after this instant.
    pub from: Option<DateTime<Utc>>,
    /// Only batches created at or before this instant.
    pub to: Option<DateTime<Utc>>,
}
