//! Wallet domain types.

use chrono::{DateTime, Utc};
use curafin_shared::types::{BatchId, Currency, Money, OwnerId, WalletId, WithdrawalId};
use serde::{Deserialize, Serialize};

/// The kind of owner a wallet belongs to.
///
/// All wallets of one owner type roll up into a single liability
/// account in the chart of accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerType {
    /// A patient on the platform.
    Patient,
    /// A medical specialist.
    Specialist,
    /// A pharmacy.
    Pharmacy,
    /// The platform's own operating fund.
    Platform,
}

impl OwnerType {
    /// All owner types, in reporting order.
    pub const ALL: [Self; 4] = [
        Self::Patient,
        Self::Specialist,
        Self::Pharmacy,
        Self::Platform,
    ];
}

impl std::fmt::Display for OwnerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Patient => write!(f, "patient"),
            Self::Specialist => write!(f, "specialist"),
            Self::Pharmacy => write!(f, "pharmacy"),
            Self::Platform => write!(f, "platform"),
        }
    }
}

impl std::str::FromStr for OwnerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "patient" => Ok(Self::Patient),
            "specialist" => Ok(Self::Specialist),
            "pharmacy" => Ok(Self::Pharmacy),
            "platform" => Ok(Self::Platform),
            _ => Err(format!("Unknown owner type: {s}")),
        }
    }
}

/// Wallet lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    /// Wallet accepts credits and debits.
    Active,
    /// Wallet rejects new activity; balances are retained.
    Frozen,
    /// Terminal state; requires zero balances to enter.
    Closed,
}

/// A point-in-time snapshot of one wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    /// Unique identifier.
    pub wallet_id: WalletId,
    /// The owner this wallet belongs to.
    pub owner_id: OwnerId,
    /// The kind of owner.
    pub owner_type: OwnerType,
    /// Currency all balances are denominated in.
    pub currency: Currency,
    /// Funds available for spending.
    pub available_balance: Money,
    /// Funds earmarked but not yet settled.
    pub held_balance: Money,
    /// Funds in flight awaiting external confirmation.
    pub pending_balance: Money,
    /// Lifecycle status.
    pub status: WalletStatus,
    /// Lifetime gross credits, denormalized for fast display.
    pub total_credited: Money,
    /// Lifetime gross debits, denormalized for fast display.
    pub total_debited: Money,
    /// When the wallet last moved funds.
    pub last_transaction_at: Option<DateTime<Utc>>,
    /// When the wallet was created.
    pub created_at: DateTime<Utc>,
}

/// The three balances of a wallet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WalletBalances {
    /// Funds available for spending.
    pub available: Money,
    /// Funds earmarked but not yet settled.
    pub held: Money,
    /// Funds in flight awaiting external confirmation.
    pub pending: Money,
}

/// Result of a wallet credit or debit.
#[derive(Debug, Clone, Copy)]
pub struct WalletReceipt {
    /// The wallet's available balance after the operation.
    pub new_balance: Money,
    /// The batch that carried the ledger effect.
    pub batch_id: BatchId,
}

/// Status of an in-flight withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    /// Funds are earmarked; the external transfer is in flight.
    Pending,
    /// The transfer succeeded and the ledger debit has posted.
    Confirmed,
    /// The transfer failed; the funds returned to available.
    Failed,
}

/// A withdrawal whose external transfer has not yet settled.
///
/// The ledger debit is provisional: it posts only on confirmation, so
/// pending funds stay backed by the liability account and wallet
/// reconciliation holds at every instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingWithdrawal {
    /// Unique identifier.
    pub withdrawal_id: WithdrawalId,
    /// The wallet being withdrawn from.
    pub wallet_id: WalletId,
    /// The amount earmarked.
    pub amount: Money,
    /// The clearing account the debit will settle into.
    pub clearing_account: String,
    /// Current status.
    pub status: WithdrawalStatus,
    /// When the withdrawal was requested.
    pub requested_at: DateTime<Utc>,
    /// When the withdrawal was confirmed or failed.
    pub settled_at: Option<DateTime<Utc>>,
    /// The batch that settled the withdrawal, once confirmed.
    pub batch_id: Option<BatchId>,
}

/// Filter options for listing wallets.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalletFilter {
    /// Filter by owner type.
    pub owner_type: Option<OwnerType>,
    /// Filter by status.
    pub status: Option<WalletStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_owner_type_roundtrip() {
        for owner_type in [
            OwnerType::Patient,
            OwnerType::Specialist,
            OwnerType::Pharmacy,
            OwnerType::Platform,
        ] {
            assert_eq!(
                OwnerType::from_str(&owner_type.to_string()).unwrap(),
                owner_type
            );
        }
    }

    #[test]
    fn test_owner_type_unknown() {
        assert!(OwnerType::from_str("insurer").is_err());
    }
}
