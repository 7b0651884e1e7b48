//! Chart of accounts: the registry of all financial accounts.
//!
//! Accounts carry a type, a derived normal-balance side, and a live
//! balance that only the batch engine may mutate.

pub mod chart;
pub mod error;
pub mod types;

pub use chart::ChartOfAccounts;
pub use error::AccountError;
pub use types::{
    Account, AccountFilter, AccountType, CreateAccountInput, Deactivated, NormalBalance,
};
