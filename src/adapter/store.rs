use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, MutexGuard};

use crate::domain::{
    Currency, FundsDirection, FundsOp, InfraError, MarketError, Request, RequestError, RequestId,
    RequestStatus, TransactionKind, UserId, ValidationFeedback, Wallet, WalletError,
    WalletTransaction,
};
use crate::port::{RequestRepository, ShardRouter, WalletLedger};

/// Trivial single-shard routing, the production default.
pub struct SingleShardRouter;

impl ShardRouter for SingleShardRouter {
    fn shard_count(&self) -> usize {
        1
    }

    fn resolve(&self, _user_id: &UserId) -> usize {
        0
    }
}

/// Spreads users across a fixed number of shards by id bytes.
pub struct HashShardRouter {
    shards: usize,
}

impl HashShardRouter {
    pub fn new(shards: usize) -> Self {
        Self {
            shards: shards.max(1),
        }
    }
}

impl ShardRouter for HashShardRouter {
    fn shard_count(&self) -> usize {
        self.shards
    }

    fn resolve(&self, user_id: &UserId) -> usize {
        let sum: usize = user_id.as_str().bytes().map(usize::from).sum();
        sum % self.shards
    }
}

struct ShardData {
    wallets: HashMap<UserId, Wallet>,
    requests: HashMap<RequestId, Request>,
    ledger: Vec<WalletTransaction>,
    feedback: HashMap<RequestId, Vec<ValidationFeedback>>,
}

impl ShardData {
    fn new() -> Self {
        Self {
            wallets: HashMap::new(),
            requests: HashMap::new(),
            ledger: Vec::new(),
            feedback: HashMap::new(),
        }
    }
}

/// In-memory store implementing both the wallet ledger and the request
/// repository over the same sharded tables.
///
/// One mutex per shard is the serialization point: any read-check-then-write
/// sequence (balance check + debit, status check + transition) runs under a
/// single shard lock, and cross-shard operations take both locks in index
/// order. Requests live on the shard of their requester so a transition and
/// its requester-side fund movement share a lock.
pub struct MemoryStore {
    shards: Vec<Mutex<ShardData>>,
    router: Arc<dyn ShardRouter>,
    tx_ids: AtomicU64,
    request_home: RwLock<HashMap<RequestId, usize>>,
    transient_faults: AtomicU32,
}

impl MemoryStore {
    pub fn new(router: Arc<dyn ShardRouter>) -> Self {
        let shards = (0..router.shard_count())
            .map(|_| Mutex::new(ShardData::new()))
            .collect();

        Self {
            shards,
            router,
            tx_ids: AtomicU64::new(0),
            request_home: RwLock::new(HashMap::new()),
            transient_faults: AtomicU32::new(0),
        }
    }

    /// Make the next `count` writes fail with a transient error.
    ///
    /// ## Warning: This is NOT MEANT FOR PRODUCTION USE. Only for testing purposes.
    pub fn inject_transient_failures(&self, count: u32) {
        self.transient_faults.store(count, Ordering::SeqCst);
    }

    /// Every wallet in the store, for final reporting.
    pub async fn all_wallets(&self) -> Vec<Wallet> {
        let mut wallets = Vec::new();
        for shard in &self.shards {
            let data = shard.lock().await;
            wallets.extend(data.wallets.values().cloned());
        }
        wallets.sort_by(|a, b| a.user_id.as_str().cmp(b.user_id.as_str()));
        wallets
    }

    /// Every ledger entry in the store, oldest first, for conservation audits.
    pub async fn full_ledger(&self) -> Vec<WalletTransaction> {
        let mut entries = Vec::new();
        for shard in &self.shards {
            let data = shard.lock().await;
            entries.extend(data.ledger.iter().cloned());
        }
        entries.sort_by_key(|e| e.id);
        entries
    }

    fn fail_if_injected(&self) -> Result<(), MarketError> {
        let remaining = self.transient_faults.load(Ordering::SeqCst);
        if remaining > 0
            && self
                .transient_faults
                .compare_exchange(remaining, remaining - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            return Err(InfraError::Transient("injected storage fault".to_string()).into());
        }
        Ok(())
    }

    fn next_tx_id(&self) -> u64 {
        self.tx_ids.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn wallet_entry<'a>(
        wallets: &'a mut HashMap<UserId, Wallet>,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> &'a mut Wallet {
        wallets
            .entry(user_id.clone())
            .or_insert_with(|| Wallet::empty(user_id.clone(), now))
    }

    /// Applies one wallet mutation plus its ledger entry. The caller holds
    /// the shard lock, so the balance check and the decrement cannot be
    /// interleaved with another writer.
    fn apply_funds(
        &self,
        data: &mut ShardData,
        op: &FundsOp,
        reference: Option<RequestId>,
        now: DateTime<Utc>,
    ) -> Result<(), MarketError> {
        if op.amount <= Decimal::ZERO {
            return Err(WalletError::InvalidAmount.into());
        }

        let signed = match op.direction {
            FundsDirection::Credit => op.amount,
            FundsDirection::Debit => -op.amount,
        };

        {
            let wallet = Self::wallet_entry(&mut data.wallets, &op.user_id, now);
            let balance = wallet.balance(op.currency);
            if op.direction == FundsDirection::Debit && balance < op.amount {
                return Err(WalletError::InsufficientFunds {
                    needed: op.amount,
                    available: balance,
                }
                .into());
            }
            *wallet.balance_mut(op.currency) = balance + signed;
            wallet.updated_at = now;
        }

        data.ledger.push(WalletTransaction {
            id: self.next_tx_id(),
            user_id: op.user_id.clone(),
            kind: op.kind,
            amount: signed,
            currency: op.currency,
            description: op.description.clone(),
            reference,
            created_at: now,
        });

        Ok(())
    }

    fn home_of(&self, id: &RequestId) -> Result<usize, MarketError> {
        self.request_home
            .read()
            .expect("request home index poisoned")
            .get(id)
            .copied()
            .ok_or_else(|| RequestError::NotFound(id.clone()).into())
    }
}

#[async_trait]
impl WalletLedger for MemoryStore {
    async fn get_or_create_wallet(&self, user_id: &UserId) -> Result<Wallet, MarketError> {
        let now = Utc::now();
        let mut data = self.shards[self.router.resolve(user_id)].lock().await;
        Ok(Self::wallet_entry(&mut data.wallets, user_id, now).clone())
    }

    async fn add_funds(
        &self,
        user_id: &UserId,
        amount: Decimal,
        currency: Currency,
        description: &str,
    ) -> Result<(), MarketError> {
        self.fail_if_injected()?;
        let now = Utc::now();
        let mut data = self.shards[self.router.resolve(user_id)].lock().await;
        self.apply_funds(
            &mut data,
            &FundsOp {
                user_id: user_id.clone(),
                direction: FundsDirection::Credit,
                amount,
                currency,
                kind: TransactionKind::Credit,
                description: description.to_string(),
            },
            None,
            now,
        )
    }

    async fn deduct_funds(
        &self,
        user_id: &UserId,
        amount: Decimal,
        currency: Currency,
        description: &str,
    ) -> Result<(), MarketError> {
        self.fail_if_injected()?;
        let now = Utc::now();
        let mut data = self.shards[self.router.resolve(user_id)].lock().await;
        self.apply_funds(
            &mut data,
            &FundsOp {
                user_id: user_id.clone(),
                direction: FundsDirection::Debit,
                amount,
                currency,
                kind: TransactionKind::Debit,
                description: description.to_string(),
            },
            None,
            now,
        )
    }

    async fn transfer_funds(
        &self,
        from: &UserId,
        to: &UserId,
        amount: Decimal,
        currency: Currency,
        description: &str,
    ) -> Result<(), MarketError> {
        self.fail_if_injected()?;
        if amount <= Decimal::ZERO {
            return Err(WalletError::InvalidAmount.into());
        }

        let now = Utc::now();
        let debit = FundsOp {
            user_id: from.clone(),
            direction: FundsDirection::Debit,
            amount,
            currency,
            kind: TransactionKind::Transfer,
            description: description.to_string(),
        };
        let credit = FundsOp {
            user_id: to.clone(),
            direction: FundsDirection::Credit,
            amount,
            currency,
            kind: TransactionKind::Transfer,
            description: description.to_string(),
        };

        let from_shard = self.router.resolve(from);
        let to_shard = self.router.resolve(to);

        if from_shard == to_shard {
            let mut data = self.shards[from_shard].lock().await;
            self.apply_funds(&mut data, &debit, None, now)?;
            self.apply_funds(&mut data, &credit, None, now)?;
            return Ok(());
        }

        // Lock order by shard index to avoid deadlock; debit is checked
        // before either side mutates, so a failure leaves both untouched.
        let (mut low, mut high) = lock_ordered(&self.shards, from_shard, to_shard).await;
        let (from_data, to_data) = if from_shard < to_shard {
            (&mut *low, &mut *high)
        } else {
            (&mut *high, &mut *low)
        };
        self.apply_funds(from_data, &debit, None, now)?;
        self.apply_funds(to_data, &credit, None, now)?;
        Ok(())
    }

    async fn convert(
        &self,
        user_id: &UserId,
        amount: Decimal,
        from: Currency,
        to: Currency,
        rate: Decimal,
    ) -> Result<(), MarketError> {
        self.fail_if_injected()?;
        if amount <= Decimal::ZERO || rate <= Decimal::ZERO || from == to {
            return Err(WalletError::InvalidAmount.into());
        }

        let now = Utc::now();
        let mut data = self.shards[self.router.resolve(user_id)].lock().await;
        self.apply_funds(
            &mut data,
            &FundsOp {
                user_id: user_id.clone(),
                direction: FundsDirection::Debit,
                amount,
                currency: from,
                kind: TransactionKind::Conversion,
                description: format!("Convert {} {} to {}", amount, from, to),
            },
            None,
            now,
        )?;
        self.apply_funds(
            &mut data,
            &FundsOp {
                user_id: user_id.clone(),
                direction: FundsDirection::Credit,
                amount: amount * rate,
                currency: to,
                kind: TransactionKind::Conversion,
                description: format!("Convert {} {} to {}", amount, from, to),
            },
            None,
            now,
        )
    }

    async fn balance(&self, user_id: &UserId, currency: Currency) -> Result<Decimal, MarketError> {
        let data = self.shards[self.router.resolve(user_id)].lock().await;
        Ok(data
            .wallets
            .get(user_id)
            .map(|w| w.balance(currency))
            .unwrap_or(Decimal::ZERO))
    }

    async fn has_sufficient_funds(
        &self,
        user_id: &UserId,
        amount: Decimal,
        currency: Currency,
    ) -> Result<bool, MarketError> {
        Ok(self.balance(user_id, currency).await? >= amount)
    }

    async fn transactions(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<WalletTransaction>, MarketError> {
        let data = self.shards[self.router.resolve(user_id)].lock().await;
        Ok(data
            .ledger
            .iter()
            .rev()
            .filter(|entry| &entry.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RequestRepository for MemoryStore {
    async fn insert(&self, request: Request) -> Result<(), MarketError> {
        self.fail_if_injected()?;
        let shard = self.router.resolve(&request.requester_id);

        // Guard scoped so it is released before the shard lock await point
        {
            let mut home = self
                .request_home
                .write()
                .expect("request home index poisoned");
            if home.contains_key(&request.id) {
                return Err(RequestError::AlreadyExists(request.id).into());
            }
            home.insert(request.id.clone(), shard);
        }

        let mut data = self.shards[shard].lock().await;
        data.requests.insert(request.id.clone(), request);
        Ok(())
    }

    async fn get(&self, id: &RequestId) -> Result<Request, MarketError> {
        let shard = self.home_of(id)?;
        let data = self.shards[shard].lock().await;
        data.requests
            .get(id)
            .cloned()
            .ok_or_else(|| RequestError::NotFound(id.clone()).into())
    }

    async fn transition(
        &self,
        id: &RequestId,
        expected: RequestStatus,
        updated: Request,
        funds: Option<FundsOp>,
    ) -> Result<Request, MarketError> {
        self.fail_if_injected()?;
        let now = Utc::now();
        let request_shard = self.home_of(id)?;
        let funds_shard = funds.as_ref().map(|op| self.router.resolve(&op.user_id));

        let mut updated = updated;
        match funds_shard {
            Some(wallet_shard) if wallet_shard != request_shard => {
                let (mut low, mut high) =
                    lock_ordered(&self.shards, request_shard, wallet_shard).await;
                let (request_data, wallet_data) = if request_shard < wallet_shard {
                    (&mut *low, &mut *high)
                } else {
                    (&mut *high, &mut *low)
                };

                guard_row(request_data, id, expected, updated.revision)?;
                if let Some(op) = &funds {
                    self.apply_funds(wallet_data, op, Some(id.clone()), now)?;
                }
                updated.revision += 1;
                request_data.requests.insert(id.clone(), updated.clone());
                Ok(updated)
            }
            _ => {
                let mut data = self.shards[request_shard].lock().await;
                guard_row(&data, id, expected, updated.revision)?;
                if let Some(op) = &funds {
                    self.apply_funds(&mut data, op, Some(id.clone()), now)?;
                }
                updated.revision += 1;
                data.requests.insert(id.clone(), updated.clone());
                Ok(updated)
            }
        }
    }

    async fn list_overdue(&self, now: DateTime<Utc>) -> Result<Vec<RequestId>, MarketError> {
        let mut overdue = Vec::new();
        for shard in &self.shards {
            let data = shard.lock().await;
            overdue.extend(
                data.requests
                    .values()
                    .filter(|r| crate::domain::is_overdue(r, now))
                    .map(|r| r.id.clone()),
            );
        }
        Ok(overdue)
    }

    async fn record_feedback(&self, feedback: ValidationFeedback) -> Result<(), MarketError> {
        self.fail_if_injected()?;
        let shard = self.home_of(&feedback.request_id)?;
        let mut data = self.shards[shard].lock().await;
        data.feedback
            .entry(feedback.request_id.clone())
            .or_default()
            .push(feedback);
        Ok(())
    }

    async fn feedback_for(
        &self,
        id: &RequestId,
    ) -> Result<Vec<ValidationFeedback>, MarketError> {
        let shard = self.home_of(id)?;
        let data = self.shards[shard].lock().await;
        Ok(data.feedback.get(id).cloned().unwrap_or_default())
    }
}

/// Status CAS plus the revision check: a caller committing a copy it read
/// before another transition landed is rejected even when the status still
/// matches, so stale content cannot overwrite newer content.
fn guard_row(
    data: &ShardData,
    id: &RequestId,
    expected: RequestStatus,
    revision: u64,
) -> Result<(), MarketError> {
    let current = data
        .requests
        .get(id)
        .ok_or_else(|| RequestError::NotFound(id.clone()))?;
    if current.status != expected {
        return Err(RequestError::StateConflict {
            id: id.clone(),
            expected,
            actual: current.status,
        }
        .into());
    }
    if current.revision != revision {
        return Err(RequestError::ConcurrentUpdate(id.clone()).into());
    }
    Ok(())
}

async fn lock_ordered<'a>(
    shards: &'a [Mutex<ShardData>],
    a: usize,
    b: usize,
) -> (MutexGuard<'a, ShardData>, MutexGuard<'a, ShardData>) {
    let (low, high) = if a < b { (a, b) } else { (b, a) };
    let low_guard = shards[low].lock().await;
    let high_guard = shards[high].lock().await;
    (low_guard, high_guard)
}
