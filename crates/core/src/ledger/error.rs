//! Ledger engine error types.

use curafin_shared::types::{BatchId, Money};
use thiserror::Error;

/// Errors that can occur during batch posting and reversal.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Batch must have at least 2 entries.
    #[error("Batch must have at least 2 entries")]
    InsufficientEntries,

    /// Batch is not balanced (debits != credits).
    #[error("Batch is not balanced. Debits: {debits}, Credits: {credits}")]
    UnbalancedBatch {
        /// Total debit amount in minor units.
        debits: Money,
        /// Total credit amount in minor units.
        credits: Money,
    },

    /// Entry amount must be positive.
    #[error("Entry amount must be positive")]
    NonPositiveAmount,

    /// Batch must have both debit and credit entries.
    #[error("Batch must have both debit and credit entries")]
    SingleSidedBatch,

    /// Amount arithmetic overflowed i64 minor units.
    #[error("Amount arithmetic overflowed")]
    AmountOverflow,

    // ========== Account Errors ==========
    /// Referenced account does not exist.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Referenced account is inactive.
    #[error("Account {0} is inactive")]
    AccountInactive(String),

    /// Posting would drive an account below its configured floor.
    #[error("Insufficient funds in account {account_code}")]
    InsufficientFunds {
        /// The account whose floor would be crossed.
        account_code: String,
    },

    // ========== Batch State Errors ==========
    /// Batch not found.
    #[error("Batch not found: {0}")]
    BatchNotFound(BatchId),

    /// Batch has already been reversed.
    #[error("Batch {0} has already been reversed")]
    AlreadyReversed(BatchId),

    /// Batch never reached posted status.
    #[error("Batch {0} is not posted")]
    NotPosted(BatchId),

    // ========== Concurrency Errors ==========
    /// Could not acquire an account lock within the configured wait.
    #[error("Timed out waiting for an account lock, please retry")]
    LockTimeout,

    // ========== Internal Errors ==========
    /// Internal engine error.
    #[error("Internal ledger error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientEntries => "INSUFFICIENT_ENTRIES",
            Self::UnbalancedBatch { .. } => "UNBALANCED_BATCH",
            Self::NonPositiveAmount => "NON_POSITIVE_AMOUNT",
            Self::SingleSidedBatch => "SINGLE_SIDED_BATCH",
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::BatchNotFound(_) => "BATCH_NOT_FOUND",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::NotPosted(_) => "NOT_POSTED",
            Self::LockTimeout => "LOCK_TIMEOUT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InsufficientEntries
            | Self::UnbalancedBatch { .. }
            | Self::NonPositiveAmount
            | Self::SingleSidedBatch
            | Self::AmountOverflow
            | Self::AccountInactive(_) => 400,

            // 404 Not Found
            Self::AccountNotFound(_) | Self::BatchNotFound(_) => 404,

            // 409 Conflict - state errors
            Self::AlreadyReversed(_) | Self::NotPosted(_) => 409,

            // 422 Unprocessable - business rule failures
            Self::InsufficientFunds { .. } => 422,

            // 503 Service Unavailable - retryable contention
            Self::LockTimeout => 503,

            // 500 Internal Server Error
            Self::Internal(_) => 500,
        }
    }

    /// Returns true if this error is retryable with the same
    /// idempotency key.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout)
    }
}
