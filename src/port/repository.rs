use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    FundsOp, MarketError, Request, RequestId, RequestStatus, ValidationFeedback,
};

/// RequestRepository owns the commission request rows.
///
/// `transition` is the serialization point of the state machine: the status
/// guard, the row swap and the optional wallet mutation commit as one atomic
/// unit, the in-memory analogue of a single database transaction. A caller
/// holding a stale row loses the race with a state-conflict error instead of
/// silently re-applying.
#[async_trait]
pub trait RequestRepository: Send + Sync {
    /// Persists a new row; fails if the id is already taken.
    async fn insert(&self, request: Request) -> Result<(), MarketError>;

    async fn get(&self, id: &RequestId) -> Result<Request, MarketError>;

    /// Compare-status-and-swap. If the current status is not `expected`, the
    /// call fails and nothing is applied; if the stored revision no longer
    /// matches `updated.revision` the caller's copy is stale and the call
    /// fails with `ConcurrentUpdate`. When `funds` is set, the wallet
    /// mutation and its ledger entry commit in the same unit as the row swap;
    /// an insufficient balance aborts the transition entirely. The committed
    /// row is returned with its revision bumped.
    async fn transition(
        &self,
        id: &RequestId,
        expected: RequestStatus,
        updated: Request,
        funds: Option<FundsOp>,
    ) -> Result<Request, MarketError>;

    /// Accepted requests whose expected delivery date is in the past.
    async fn list_overdue(&self, now: DateTime<Utc>) -> Result<Vec<RequestId>, MarketError>;

    /// Appends a human correction of an AI result (retraining data).
    async fn record_feedback(&self, feedback: ValidationFeedback) -> Result<(), MarketError>;

    async fn feedback_for(
        &self,
        id: &RequestId,
    ) -> Result<Vec<ValidationFeedback>, MarketError>;
}
