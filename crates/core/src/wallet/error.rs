//! Wallet service error types.

use curafin_shared::types::{Money, WalletId, WithdrawalId};
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::wallet::types::OwnerType;

/// Errors that can occur in wallet operations.
#[derive(Debug, Error)]
pub enum WalletError {
    /// Wallet not found.
    #[error("Wallet not found: {0}")]
    NotFound(WalletId),

    /// Wallet is frozen and rejects new activity.
    #[error("Wallet {0} is frozen")]
    Frozen(WalletId),

    /// Wallet is closed; closed is terminal.
    #[error("Wallet {0} is closed")]
    Closed(WalletId),

    /// Debit exceeds the wallet's available balance.
    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// The available balance at the time of the request.
        available: Money,
        /// The amount requested.
        requested: Money,
    },

    /// Hold or earmark exceeds the available balance.
    #[error("Insufficient available balance: available {available}, requested {requested}")]
    InsufficientAvailableBalance {
        /// The available balance at the time of the request.
        available: Money,
        /// The amount requested.
        requested: Money,
    },

    /// Release exceeds the held balance.
    #[error("Insufficient held balance: held {held}, requested {requested}")]
    InsufficientHeldBalance {
        /// The held balance at the time of the request.
        held: Money,
        /// The amount requested.
        requested: Money,
    },

    /// Wallet cannot close while it still holds funds.
    #[error("Wallet {0} is not empty and cannot be closed")]
    NotEmpty(WalletId),

    /// Amount must be positive.
    #[error("Amount must be positive")]
    NonPositiveAmount,

    /// Amount arithmetic overflowed i64 minor units.
    #[error("Amount arithmetic overflowed")]
    AmountOverflow,

    /// Withdrawal not found.
    #[error("Withdrawal not found: {0}")]
    WithdrawalNotFound(WithdrawalId),

    /// Withdrawal has already settled.
    #[error("Withdrawal {0} is not pending")]
    WithdrawalNotPending(WithdrawalId),

    /// No liability account is mapped for the owner type.
    #[error("No liability account mapped for owner type {0}")]
    LiabilityAccountUnmapped(OwnerType),

    /// Could not acquire the wallet lock within the configured wait.
    #[error("Timed out waiting for the wallet lock, please retry")]
    LockTimeout,

    /// Underlying ledger failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl WalletError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Frozen(_) => "WALLET_FROZEN",
            Self::Closed(_) => "WALLET_CLOSED",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::InsufficientAvailableBalance { .. } => "INSUFFICIENT_AVAILABLE_BALANCE",
            Self::InsufficientHeldBalance { .. } => "INSUFFICIENT_HELD_BALANCE",
            Self::NotEmpty(_) => "WALLET_NOT_EMPTY",
            Self::NonPositiveAmount => "NON_POSITIVE_AMOUNT",
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
            Self::WithdrawalNotFound(_) => "WITHDRAWAL_NOT_FOUND",
            Self::WithdrawalNotPending(_) => "WITHDRAWAL_NOT_PENDING",
            Self::LiabilityAccountUnmapped(_) => "LIABILITY_ACCOUNT_UNMAPPED",
            Self::LockTimeout => "LOCK_TIMEOUT",
            Self::Ledger(inner) => inner.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::NonPositiveAmount => 400,
            Self::NotFound(_) | Self::WithdrawalNotFound(_) => 404,
            Self::WithdrawalNotPending(_) => 409,
            Self::Frozen(_)
            | Self::Closed(_)
            | Self::InsufficientFunds { .. }
            | Self::InsufficientAvailableBalance { .. }
            | Self::InsufficientHeldBalance { .. }
            | Self::NotEmpty(_) => 422,
            Self::AmountOverflow => 400,
            Self::LiabilityAccountUnmapped(_) => 500,
            Self::LockTimeout => 503,
            Self::Ledger(inner) => inner.http_status_code(),
        }
    }

    /// Returns true if this error is retryable with the same
    /// idempotency key.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::LockTimeout => true,
            Self::Ledger(inner) => inner.is_retryable(),
            _ => false,
        }
    }
}
