//! Core ledger and wallet engine for Curafin.
//!
//! This crate contains the double-entry accounting engine behind the
//! platform's financial subsystem, with ZERO web dependencies:
//!
//! - `accounts` - chart of accounts with live balances
//! - `ledger` - immutable entries, atomic batches, the posting engine
//! - `wallet` - per-owner wallets built on top of the batch engine
//! - `reports` - trial balance, reconciliation, statements, dashboard
//! - `events` - BatchPosted/BatchReversed fan-out for audit consumers

pub mod accounts;
pub mod events;
pub mod ledger;
pub mod reports;
pub mod wallet;

pub use accounts::{Account, AccountError, AccountType, ChartOfAccounts, NormalBalance};
pub use events::{EventBus, LedgerEvent};
pub use ledger::{
    BatchCategory, BatchStatus, EngineConfig, EntryInput, EntryType, LedgerEngine, LedgerEntry,
    LedgerError, PostBatchInput, PostedBatch, TransactionBatch,
};
pub use reports::{ReportError, Reports};
pub use wallet::{OwnerType, Wallet, WalletError, WalletService, WalletStatus};
