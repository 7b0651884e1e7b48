//! Wallet service: per-owner balances backed by liability accounts.
//!
//! Wallets never write ledger state directly; every cash movement is a
//! batch posted through the engine under the wallet's lock.

pub mod error;
pub mod service;
pub mod types;

pub use error::WalletError;
pub use service::WalletService;
pub use types::{
    OwnerType, PendingWithdrawal, Wallet, WalletBalances, WalletFilter, WalletReceipt,
    WalletStatus, WithdrawalStatus,
};
