use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{Currency, MarketError, UserId, Wallet, WalletTransaction};

/// WalletLedger owns per-user balances and the append-only transaction log.
///
/// Every operation is all-or-nothing: an error aborts the whole operation and
/// no partial balance update survives. Every balance mutation appends exactly
/// one ledger entry (two for transfers and conversions) in the same atomic
/// unit, so balances stay derivable from the log.
#[async_trait]
pub trait WalletLedger: Send + Sync {
    /// Idempotent: creates a zero-balance wallet on first call.
    async fn get_or_create_wallet(&self, user_id: &UserId) -> Result<Wallet, MarketError>;

    /// Credits `amount` (> 0) and appends one ledger entry.
    async fn add_funds(
        &self,
        user_id: &UserId,
        amount: Decimal,
        currency: Currency,
        description: &str,
    ) -> Result<(), MarketError>;

    /// Debits `amount` (> 0). The balance check happens under the same lock
    /// as the decrement, so no other caller can spend the funds in between.
    async fn deduct_funds(
        &self,
        user_id: &UserId,
        amount: Decimal,
        currency: Currency,
        description: &str,
    ) -> Result<(), MarketError>;

    /// Atomic two-leg move: debit sender, credit receiver, or neither.
    async fn transfer_funds(
        &self,
        from: &UserId,
        to: &UserId,
        amount: Decimal,
        currency: Currency,
        description: &str,
    ) -> Result<(), MarketError>;

    /// Debits the source currency and credits the destination at `rate`
    /// (destination units per source unit), atomically.
    async fn convert(
        &self,
        user_id: &UserId,
        amount: Decimal,
        from: Currency,
        to: Currency,
        rate: Decimal,
    ) -> Result<(), MarketError>;

    async fn balance(&self, user_id: &UserId, currency: Currency) -> Result<Decimal, MarketError>;

    async fn has_sufficient_funds(
        &self,
        user_id: &UserId,
        amount: Decimal,
        currency: Currency,
    ) -> Result<bool, MarketError>;

    /// The user's ledger entries, newest first.
    async fn transactions(&self, user_id: &UserId)
        -> Result<Vec<WalletTransaction>, MarketError>;
}
