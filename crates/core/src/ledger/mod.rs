//! Double-entry ledger: entries, batches, validation, and the posting
//! engine.
//!
//! - Ledger entries (immutable debit/credit postings)
//! - Transaction batches (atomic, balanced posting units)
//! - Structural validation rules
//! - Error types for ledger operations
//! - The batch engine: the single write path for financial state

pub mod batch;
pub mod engine;
pub mod entry;
pub mod error;
pub mod validation;

#[cfg(test)]
mod engine_props;

pub use batch::{
    BatchCategory, BatchFilter, BatchStatus, PostBatchInput, PostedBatch, TransactionBatch,
    WalletEffect,
};
pub use engine::{EngineConfig, LedgerEngine};
pub use entry::{EntryInput, EntryStatus, EntryType, LedgerEntry};
pub use error::LedgerError;
pub use validation::{BatchTotals, validate_entries};
