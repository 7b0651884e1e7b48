//! Chart of accounts error types.

use thiserror::Error;

/// Errors that can occur in chart of accounts operations.
#[derive(Debug, Error)]
pub enum AccountError {
    /// An account with this code already exists.
    #[error("Account code already exists: {0}")]
    DuplicateCode(String),

    /// Account not found.
    #[error("Account not found: {0}")]
    NotFound(String),
}

impl AccountError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateCode(_) => "DUPLICATE_CODE",
            Self::NotFound(_) => "NOT_FOUND",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::DuplicateCode(_) => 409,
            Self::NotFound(_) => 404,
        }
    }
}
