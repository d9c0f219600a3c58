use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{RequestId, UserId};

/// The two wallet currencies: `Gems` is the in-app points unit used to pay
/// for commissions, `Usd` is the real-money unit.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Gems,
    Usd,
}

impl Display for Currency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::Gems => f.write_str("gems"),
            Currency::Usd => f.write_str("usd"),
        }
    }
}

/// One row per user. Balances are maintained redundantly for O(1) reads;
/// the ledger remains the source of truth and every balance mutation is
/// paired with exactly one ledger entry in the same atomic unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: UserId,
    pub gems: Decimal,
    pub usd: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn empty(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            gems: Decimal::ZERO,
            usd: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn balance(&self, currency: Currency) -> Decimal {
        match currency {
            Currency::Gems => self.gems,
            Currency::Usd => self.usd,
        }
    }

    pub fn balance_mut(&mut self, currency: Currency) -> &mut Decimal {
        match currency {
            Currency::Gems => &mut self.gems,
            Currency::Usd => &mut self.usd,
        }
    }
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Plain credit, e.g. a gem top-up from outside the system.
    Credit,
    /// Plain debit with no more specific kind.
    Debit,
    /// Escrow hold debited from a requester at accept time.
    Purchase,
    /// Escrow released to a creator after a passing validation.
    Earning,
    /// Escrow returned to the requester (failed validation or expiry).
    Refund,
    /// One leg of a wallet-to-wallet transfer.
    Transfer,
    /// One leg of a currency conversion.
    Conversion,
}

/// Immutable ledger entry. Amounts are signed: debit legs are negative,
/// credit legs positive, so a per-currency sum audits conservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: u64,
    pub user_id: UserId,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub currency: Currency,
    pub description: String,
    pub reference: Option<RequestId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FundsDirection {
    Credit,
    Debit,
}

/// A single wallet mutation to commit atomically with a request transition.
#[derive(Debug, Clone)]
pub struct FundsOp {
    pub user_id: UserId,
    pub direction: FundsDirection,
    pub amount: Decimal,
    pub currency: Currency,
    pub kind: TransactionKind,
    pub description: String,
}
