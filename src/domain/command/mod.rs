use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{
    DeadlineClass, ProductId, RequestId, UserId, ValidationUpdate,
};

/// CSV row structure (flat deserialization)
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "type")]
    action: String,
    #[serde(default)]
    request: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    product: Option<String>,
    #[serde(default)]
    deadline: Option<String>,
    #[serde(default)]
    instruction: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    body_part_ok: Option<bool>,
    #[serde(default)]
    text_ok: Option<bool>,
    #[serde(rename = "override", default)]
    manual_override: Option<bool>,
    #[serde(default)]
    amount: Option<Decimal>,
}

/// One row of a workload file: either a wallet top-up or a request-lifecycle
/// command routed through the per-request actor.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum WorkloadEntry {
    Deposit(DepositFunds),
    Command(MarketCommand),
}

impl<'de> Deserialize<'de> for WorkloadEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let row = CsvRow::deserialize(deserializer)?;
        row.try_into().map_err(serde::de::Error::custom)
    }
}

/// A command is a single action against one commission request. Each command
/// is checked against the request's current status before any funds move, so
/// replays fail with a state conflict instead of re-applying.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MarketCommand {
    Create(CreateRequest),
    Update(UpdateRequest),
    Cancel(CancelRequest),
    Accept(AcceptRequest),
    Deliver(DeliverRequest),
    Validate(ValidateRequest),
    Expire(ExpireRequest),
}

impl MarketCommand {
    pub fn request_id(&self) -> &RequestId {
        match self {
            MarketCommand::Create(cmd) => &cmd.request_id,
            MarketCommand::Update(cmd) => &cmd.request_id,
            MarketCommand::Cancel(cmd) => &cmd.request_id,
            MarketCommand::Accept(cmd) => &cmd.request_id,
            MarketCommand::Deliver(cmd) => &cmd.request_id,
            MarketCommand::Validate(cmd) => &cmd.request_id,
            MarketCommand::Expire(cmd) => &cmd.request_id,
        }
    }
}

impl TryFrom<CsvRow> for WorkloadEntry {
    type Error = String;

    fn try_from(row: CsvRow) -> Result<Self, Self::Error> {
        let action = row.action.to_lowercase();

        if action == "deposit" {
            return Ok(WorkloadEntry::Deposit(DepositFunds {
                user_id: UserId::new(required(row.user, "deposit requires user")?),
                amount: row.amount.ok_or("deposit requires amount")?,
            }));
        }

        let request_id = RequestId::new(required(row.request, "command requires request")?);

        let command = match action.as_str() {
            "create" => MarketCommand::Create(CreateRequest {
                request_id,
                requester_id: UserId::new(required(row.user, "create requires user")?),
                product_id: ProductId::new(required(row.product, "create requires product")?),
                instruction: row.instruction.unwrap_or_default(),
                deadline: DeadlineClass::parse(&required(
                    row.deadline,
                    "create requires deadline",
                )?)?,
            }),
            "update" => MarketCommand::Update(UpdateRequest {
                request_id,
                caller_id: UserId::new(required(row.user, "update requires user")?),
                instruction: row.instruction,
                deadline: row
                    .deadline
                    .as_deref()
                    .map(DeadlineClass::parse)
                    .transpose()?,
            }),
            "cancel" => MarketCommand::Cancel(CancelRequest {
                request_id,
                caller_id: UserId::new(required(row.user, "cancel requires user")?),
            }),
            "accept" => MarketCommand::Accept(AcceptRequest {
                request_id,
                caller_id: UserId::new(required(row.user, "accept requires user")?),
            }),
            "deliver" => MarketCommand::Deliver(DeliverRequest {
                request_id,
                caller_id: UserId::new(required(row.user, "deliver requires user")?),
                image_url: required(row.image, "deliver requires image")?,
            }),
            "validate" => MarketCommand::Validate(ValidateRequest {
                request_id,
                update: ValidationUpdate {
                    body_part_valid: row.body_part_ok,
                    text_valid: row.text_ok,
                    manual_override: row.manual_override,
                    ..ValidationUpdate::default()
                },
            }),
            "expire" => MarketCommand::Expire(ExpireRequest { request_id }),
            other => return Err(format!("unknown action: {}", other)),
        };

        Ok(WorkloadEntry::Command(command))
    }
}

fn required(value: Option<String>, message: &str) -> Result<String, String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| message.to_string())
}

/// Gem top-up for a user's wallet. No request involved, so it bypasses the
/// per-request routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositFunds {
    pub user_id: UserId,
    pub amount: Decimal,
}

/// Creates a Pending request. Debits nothing: funds are only held at accept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequest {
    pub request_id: RequestId,
    pub requester_id: UserId,
    pub product_id: ProductId,
    pub instruction: String,
    pub deadline: DeadlineClass,
}

/// Edits instruction and/or deadline while still Pending. A deadline change
/// recomputes the whole price breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub request_id: RequestId,
    pub caller_id: UserId,
    pub instruction: Option<String>,
    pub deadline: Option<DeadlineClass>,
}

/// Requester withdraws a Pending request. No refund needed: nothing was
/// debited yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRequest {
    pub request_id: RequestId,
    pub caller_id: UserId,
}

/// Creator accepts the commission. This is the escrow point: the requester's
/// wallet is debited the total amount atomically with the status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptRequest {
    pub request_id: RequestId,
    pub caller_id: UserId,
}

/// Creator uploads the delivered image. No funds move; a validation job is
/// published after the transition commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverRequest {
    pub request_id: RequestId,
    pub caller_id: UserId,
    pub image_url: String,
}

/// Manual validation verdict fed through the same update path as AI results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateRequest {
    pub request_id: RequestId,
    pub update: ValidationUpdate,
}

/// System-side expiry of an overdue Accepted request; refunds the requester.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpireRequest {
    pub request_id: RequestId,
}
