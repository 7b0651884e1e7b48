//! Reporting error types.

use thiserror::Error;

use crate::wallet::types::OwnerType;

/// Errors that can occur while generating reports.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Referenced account does not exist.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// No liability account is mapped for the owner type.
    #[error("No liability account mapped for owner type {0}")]
    LiabilityAccountUnmapped(OwnerType),

    /// Amount arithmetic overflowed while aggregating.
    #[error("Amount arithmetic overflowed")]
    AmountOverflow,
}

impl ReportError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) => "NOT_FOUND",
            Self::LiabilityAccountUnmapped(_) => "LIABILITY_ACCOUNT_UNMAPPED",
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::AccountNotFound(_) => 404,
            Self::LiabilityAccountUnmapped(_) | Self::AmountOverflow => 500,
        }
    }
}
