//! Ledger event fan-out.
//!
//! The engine emits `BatchPosted`/`BatchReversed` notifications for
//! audit-log and fraud-observation consumers. Subscribers receive
//! events over a broadcast channel: a slow or absent subscriber can
//! lag and drop events, but can never block or fail a posting.

use curafin_shared::types::{BatchId, Money};
use tokio::sync::broadcast;

use crate::ledger::batch::BatchCategory;

/// Notification emitted after a ledger state change commits.
#[derive(Debug, Clone)]
pub enum LedgerEvent {
    /// A batch was posted.
    BatchPosted {
        /// The posted batch.
        batch_id: BatchId,
        /// Semantic reason for the batch.
        category: BatchCategory,
        /// Batch total (debit side) in minor units.
        total_amount: Money,
    },
    /// A batch was reversed.
    BatchReversed {
        /// The batch that was reversed.
        original_batch_id: BatchId,
        /// The mirror-image batch that reversed it.
        reversal_batch_id: BatchId,
    },
}

/// Broadcast bus for ledger events.
pub struct EventBus {
    sender: broadcast::Sender<LedgerEvent>,
}

impl EventBus {
    /// Default per-subscriber buffer before lagging subscribers start
    /// dropping events.
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Creates a bus with the given per-subscriber buffer capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribes to future ledger events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event. Never blocks; an absent audience is fine.
    pub(crate) fn publish(&self, event: LedgerEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
