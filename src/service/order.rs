use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::{
    self, AcceptRequest, CancelRequest, CreateRequest, Currency, DeliverRequest, FundsDirection,
    FundsOp, MarketCommand, MarketError, MarketPolicy, Request, RequestId, RequestStatus,
    TransactionKind, UpdateRequest, UserId, ValidationFeedback, ValidationJob, ValidationResult,
    ValidationUpdate, WalletError,
};
use crate::port::{ProductCatalog, RequestRepository, ValidationPublisher, WalletLedger};
use crate::service::retry::{with_retry, DEFAULT_ATTEMPTS};

/// The request state machine:
/// `Pending → Accepted → Delivered → (Paid | Dispute)`, with `Cancelled`
/// reachable from Pending and `Expired` from overdue Accepted.
///
/// Every transition is committed through the repository's guarded swap, with
/// the fund movement (if any) in the same atomic unit, so a replayed command
/// or a lost race surfaces as a state conflict instead of a double debit.
/// Transient storage failures are retried with bounded backoff.
pub struct OrderService {
    policy: MarketPolicy,
    catalog: Arc<dyn ProductCatalog>,
    ledger: Arc<dyn WalletLedger>,
    repository: Arc<dyn RequestRepository>,
    publisher: Arc<dyn ValidationPublisher>,
}

impl OrderService {
    pub fn new(
        policy: MarketPolicy,
        catalog: Arc<dyn ProductCatalog>,
        ledger: Arc<dyn WalletLedger>,
        repository: Arc<dyn RequestRepository>,
        publisher: Arc<dyn ValidationPublisher>,
    ) -> Self {
        Self {
            policy,
            catalog,
            ledger,
            repository,
            publisher,
        }
    }

    pub fn policy(&self) -> &MarketPolicy {
        &self.policy
    }

    /// Dispatch a request-lifecycle command to its handler.
    pub async fn execute(&self, command: MarketCommand) -> Result<Request, MarketError> {
        match command {
            MarketCommand::Create(cmd) => self.create_request(cmd).await,
            MarketCommand::Update(cmd) => self.update_request(cmd).await,
            MarketCommand::Cancel(cmd) => self.cancel_request(cmd).await,
            MarketCommand::Accept(cmd) => self.accept_request(cmd).await,
            MarketCommand::Deliver(cmd) => self.deliver_request(cmd).await,
            MarketCommand::Validate(cmd) => {
                self.apply_validation(&cmd.request_id, cmd.update).await
            }
            MarketCommand::Expire(cmd) => self.expire_request(&cmd.request_id, Utc::now()).await,
        }
    }

    pub async fn get_request(&self, id: &RequestId) -> Result<Request, MarketError> {
        self.repository.get(id).await
    }

    /// Gem top-up. Not part of the request lifecycle; used by workloads and
    /// the USD→gems purchase path.
    pub async fn deposit(&self, user_id: &UserId, amount: Decimal) -> Result<(), MarketError> {
        with_retry("deposit", DEFAULT_ATTEMPTS, || {
            self.ledger
                .add_funds(user_id, amount, Currency::Gems, "Gem top-up")
        })
        .await
    }

    /// USD to gems at the configured rate. Both conversion legs commit in the
    /// same atomic unit.
    pub async fn purchase_gems(
        &self,
        user_id: &UserId,
        usd_amount: Decimal,
    ) -> Result<(), MarketError> {
        with_retry("purchase_gems", DEFAULT_ATTEMPTS, || {
            self.ledger.convert(
                user_id,
                usd_amount,
                Currency::Usd,
                Currency::Gems,
                self.policy.gem_usd_rate,
            )
        })
        .await
    }

    /// Creates a Pending request. Snapshots the product, prices the deadline
    /// class, and checks the requester could afford it — but debits nothing;
    /// funds are only held at accept.
    pub async fn create_request(&self, cmd: CreateRequest) -> Result<Request, MarketError> {
        let product = self.catalog.get_product(&cmd.product_id).await?;
        let pricing = domain::pricing(&self.policy, cmd.deadline);

        let available = self
            .ledger
            .balance(&cmd.requester_id, Currency::Gems)
            .await?;
        if available < pricing.total_amount {
            return Err(WalletError::InsufficientFunds {
                needed: pricing.total_amount,
                available,
            }
            .into());
        }

        let request = Request::new(
            cmd.request_id,
            cmd.requester_id,
            product,
            cmd.instruction,
            cmd.deadline,
            pricing,
            Utc::now(),
        );

        with_retry("create_request", DEFAULT_ATTEMPTS, || {
            self.repository.insert(request.clone())
        })
        .await?;

        tracing::info!(request = %request.id, total = %request.total_amount, "request created");
        Ok(request)
    }

    /// Edits a Pending request. A deadline change reprices the whole
    /// breakdown; nothing else may touch the amounts.
    pub async fn update_request(&self, cmd: UpdateRequest) -> Result<Request, MarketError> {
        let request = self.repository.get(&cmd.request_id).await?;
        domain::ensure_party(&request, &cmd.caller_id, &request.requester_id)?;
        domain::ensure_status(&request, RequestStatus::Pending)?;

        let mut updated = request;
        if let Some(instruction) = cmd.instruction {
            updated.instruction = instruction;
        }
        if let Some(deadline) = cmd.deadline {
            updated.deadline = deadline;
            updated.apply_pricing(domain::pricing(&self.policy, deadline));
        }
        updated.modified_at = Utc::now();

        with_retry("update_request", DEFAULT_ATTEMPTS, || {
            self.repository.transition(
                &updated.id,
                RequestStatus::Pending,
                updated.clone(),
                None,
            )
        })
        .await
    }

    /// Requester withdraws a Pending request. No refund: nothing was held.
    pub async fn cancel_request(&self, cmd: CancelRequest) -> Result<Request, MarketError> {
        let request = self.repository.get(&cmd.request_id).await?;
        domain::ensure_party(&request, &cmd.caller_id, &request.requester_id)?;
        domain::ensure_status(&request, RequestStatus::Pending)?;

        let mut updated = request;
        updated.status = RequestStatus::Cancelled;
        updated.modified_at = Utc::now();

        with_retry("cancel_request", DEFAULT_ATTEMPTS, || {
            self.repository.transition(
                &updated.id,
                RequestStatus::Pending,
                updated.clone(),
                None,
            )
        })
        .await
    }

    /// Creator accepts: the escrow point. The requester's wallet is debited
    /// the total amount in the same atomic unit as the status swap, so a
    /// concurrent second accept loses with a state conflict and debits
    /// nothing.
    pub async fn accept_request(&self, cmd: AcceptRequest) -> Result<Request, MarketError> {
        let request = self.repository.get(&cmd.request_id).await?;
        domain::ensure_party(&request, &cmd.caller_id, request.creator_id())?;
        domain::ensure_status(&request, RequestStatus::Pending)?;

        let now = Utc::now();
        let mut updated = request;
        updated.status = RequestStatus::Accepted;
        updated.accepted_at = Some(now);
        updated.expected_delivery = Some(domain::due_date(&self.policy, updated.deadline, now));
        updated.modified_at = now;

        let hold = FundsOp {
            user_id: updated.requester_id.clone(),
            direction: FundsDirection::Debit,
            amount: updated.total_amount,
            currency: Currency::Gems,
            kind: TransactionKind::Purchase,
            description: format!("Escrow hold for request {}", updated.id),
        };

        let accepted = with_retry("accept_request", DEFAULT_ATTEMPTS, || {
            self.repository.transition(
                &updated.id,
                RequestStatus::Pending,
                updated.clone(),
                Some(hold.clone()),
            )
        })
        .await?;

        tracing::info!(request = %accepted.id, amount = %accepted.total_amount, "escrow held");
        Ok(accepted)
    }

    /// Creator delivers the image. No funds move. The validation job is
    /// published after the transition commits; a publish failure leaves the
    /// request Delivered and surfaces as a partial-success error the caller
    /// resolves via `retrigger_validation`.
    pub async fn deliver_request(&self, cmd: DeliverRequest) -> Result<Request, MarketError> {
        let request = self.repository.get(&cmd.request_id).await?;
        domain::ensure_party(&request, &cmd.caller_id, request.creator_id())?;
        domain::ensure_status(&request, RequestStatus::Accepted)?;

        let now = Utc::now();
        let mut updated = request;
        updated.status = RequestStatus::Delivered;
        updated.delivered_image_url = Some(cmd.image_url);
        updated.delivered_at = Some(now);
        updated.modified_at = now;

        let delivered = with_retry("deliver_request", DEFAULT_ATTEMPTS, || {
            self.repository.transition(
                &updated.id,
                RequestStatus::Accepted,
                updated.clone(),
                None,
            )
        })
        .await?;

        if let Err(e) = self.publish_job(&delivered).await {
            tracing::warn!(request = %delivered.id, error = %e, "validation trigger failed; request stays delivered");
            return Err(e);
        }

        Ok(delivered)
    }

    /// Re-publishes the validation job for a request stuck in Delivered
    /// after a publish failure.
    pub async fn retrigger_validation(&self, id: &RequestId) -> Result<(), MarketError> {
        let request = self.repository.get(id).await?;
        domain::ensure_status(&request, RequestStatus::Delivered)?;
        self.publish_job(&request).await
    }

    async fn publish_job(&self, request: &Request) -> Result<(), MarketError> {
        let job = ValidationJob {
            request_id: request.id.clone(),
            image_url: request.delivered_image_url.clone().unwrap_or_default(),
            expected_text: request.instruction.clone(),
            delivered_at: request.delivered_at.unwrap_or_else(Utc::now),
        };
        self.publisher.publish(job).await
    }

    /// Settles a Delivered request. Pass credits the creator and the request
    /// becomes Paid; fail refunds the requester and it becomes Dispute.
    /// Results flagged for human review are recorded but do not settle until
    /// a manual verdict arrives through this same path.
    pub async fn apply_validation(
        &self,
        id: &RequestId,
        update: ValidationUpdate,
    ) -> Result<Request, MarketError> {
        let request = self.repository.get(id).await?;
        domain::ensure_status(&request, RequestStatus::Delivered)?;

        let now = Utc::now();
        let mut updated = request;
        domain::merge_validation(&mut updated.validation, &update);
        updated.modified_at = now;

        if update.requires_review && update.manual_override.is_none() {
            tracing::info!(request = %updated.id, "validation needs human review; not settling");
            return with_retry("record_validation", DEFAULT_ATTEMPTS, || {
                self.repository.transition(
                    &updated.id,
                    RequestStatus::Delivered,
                    updated.clone(),
                    None,
                )
            })
            .await;
        }

        let passed = domain::validation_passes(&updated.validation);
        updated.validated_at = Some(now);

        let settlement = if passed {
            updated.status = RequestStatus::Paid;
            FundsOp {
                user_id: updated.creator_id().clone(),
                direction: FundsDirection::Credit,
                amount: updated.total_amount,
                currency: Currency::Gems,
                kind: TransactionKind::Earning,
                description: format!("Payout for request {}", updated.id),
            }
        } else {
            updated.status = RequestStatus::Dispute;
            FundsOp {
                user_id: updated.requester_id.clone(),
                direction: FundsDirection::Credit,
                amount: updated.total_amount,
                currency: Currency::Gems,
                kind: TransactionKind::Refund,
                description: format!("Validation refund for request {}", updated.id),
            }
        };

        let settled = with_retry("apply_validation", DEFAULT_ATTEMPTS, || {
            self.repository.transition(
                &updated.id,
                RequestStatus::Delivered,
                updated.clone(),
                Some(settlement.clone()),
            )
        })
        .await?;

        tracing::info!(request = %settled.id, status = %settled.status, "request settled");
        Ok(settled)
    }

    /// Feeds an external worker result into the same update path as manual
    /// overrides.
    pub async fn apply_result(&self, result: ValidationResult) -> Result<Request, MarketError> {
        let request = self.repository.get(&result.request_id).await?;
        let update = domain::translate_result(&request, &result, &self.policy);
        self.apply_validation(&result.request_id, update).await
    }

    /// Expires one overdue Accepted request, refunding the requester the
    /// exact escrowed total.
    pub async fn expire_request(
        &self,
        id: &RequestId,
        now: DateTime<Utc>,
    ) -> Result<Request, MarketError> {
        let request = self.repository.get(id).await?;
        domain::ensure_status(&request, RequestStatus::Accepted)?;
        if !domain::is_overdue(&request, now) {
            return Err(crate::domain::RequestError::NotYetDue(id.clone()).into());
        }

        let mut updated = request;
        updated.status = RequestStatus::Expired;
        updated.modified_at = now;

        let refund = FundsOp {
            user_id: updated.requester_id.clone(),
            direction: FundsDirection::Credit,
            amount: updated.total_amount,
            currency: Currency::Gems,
            kind: TransactionKind::Refund,
            description: format!("Expiry refund for request {}", updated.id),
        };

        with_retry("expire_request", DEFAULT_ATTEMPTS, || {
            self.repository.transition(
                &updated.id,
                RequestStatus::Accepted,
                updated.clone(),
                Some(refund.clone()),
            )
        })
        .await
    }

    /// Bulk sweep: expires every overdue Accepted request one at a time so
    /// each gets its own refund and ledger entry. Requests another sweep (or
    /// a delivery) already moved are skipped via the status guard, so
    /// running the sweep twice never double-refunds.
    pub async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<Vec<RequestId>, MarketError> {
        let overdue = self.repository.list_overdue(now).await?;
        let mut expired = Vec::new();

        for id in overdue {
            match self.expire_request(&id, now).await {
                Ok(_) => expired.push(id),
                Err(MarketError::Request(
                    crate::domain::RequestError::StateConflict { .. },
                )) => {
                    tracing::debug!(request = %id, "already moved on; skipping expiry");
                }
                Err(e) => {
                    tracing::warn!(request = %id, error = %e, "expiry failed");
                }
            }
        }

        Ok(expired)
    }

    /// Persists a human correction for retraining. Never changes status.
    pub async fn record_feedback(&self, feedback: ValidationFeedback) -> Result<(), MarketError> {
        with_retry("record_feedback", DEFAULT_ATTEMPTS, || {
            self.repository.record_feedback(feedback.clone())
        })
        .await
    }
}
