use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self(identifier.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self(identifier.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self(identifier.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ProductId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Delivery-speed tier chosen by the requester at creation time.
///
/// Each tier maps to a fixed extra fee and a due window, see
/// [`crate::domain::MarketPolicy`].
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeadlineClass {
    #[serde(rename = "3d")]
    ThreeDay,
    #[serde(rename = "48h")]
    Express48h,
    #[serde(rename = "24h")]
    Express24h,
}

impl DeadlineClass {
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.to_lowercase().as_str() {
            "3d" | "3-day" => Ok(Self::ThreeDay),
            "48h" => Ok(Self::Express48h),
            "24h" => Ok(Self::Express24h),
            other => Err(format!("unknown deadline class: {}", other)),
        }
    }
}

impl Display for DeadlineClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DeadlineClass::ThreeDay => "3d",
            DeadlineClass::Express48h => "48h",
            DeadlineClass::Express24h => "24h",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Delivered,
    Validated,
    Paid,
    Dispute,
    Cancelled,
    Expired,
}

impl RequestStatus {
    /// Terminal statuses admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Paid
                | RequestStatus::Dispute
                | RequestStatus::Cancelled
                | RequestStatus::Expired
        )
    }
}

impl Display for RequestStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Delivered => "delivered",
            RequestStatus::Validated => "validated",
            RequestStatus::Paid => "paid",
            RequestStatus::Dispute => "dispute",
            RequestStatus::Cancelled => "cancelled",
            RequestStatus::Expired => "expired",
        };
        f.write_str(label)
    }
}

/// Product fields copied onto the request at creation time so later product
/// edits cannot change the terms of an open commission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub product_id: ProductId,
    pub creator_id: UserId,
    pub name: String,
    pub main_photo_url: String,
    pub body_part: String,
}

/// Validation outcome as it accumulates: AI results and manual overrides both
/// land here through the same update path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub body_part_valid: Option<bool>,
    pub text_valid: Option<bool>,
    pub manual_override: Option<bool>,
    pub status_note: Option<String>,
    pub confidence: Option<f32>,
    pub error: Option<String>,
}

/// Price breakdown computed from the deadline class at create/update time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingBreakdown {
    pub price_amount: Decimal,
    pub extra_amount: Decimal,
    pub total_amount: Decimal,
    pub tax_amount: Decimal,
}

/// A commission request.
///
/// `total_amount` is immutable once the request leaves Pending; the only
/// legal mutation before that is the deadline-change update path which
/// recomputes the whole breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub requester_id: UserId,
    pub product: ProductSnapshot,
    pub instruction: String,
    pub deadline: DeadlineClass,
    pub price_amount: Decimal,
    pub extra_amount: Decimal,
    pub total_amount: Decimal,
    pub tax_amount: Decimal,
    pub status: RequestStatus,
    /// Optimistic concurrency token, bumped by the repository on every
    /// committed transition. A caller holding a stale copy cannot overwrite
    /// a newer row even when the status still matches.
    pub revision: u64,
    pub delivered_image_url: Option<String>,
    pub validation: ValidationRecord,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub expected_delivery: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub validated_at: Option<DateTime<Utc>>,
}

impl Request {
    pub fn new(
        id: RequestId,
        requester_id: UserId,
        product: ProductSnapshot,
        instruction: String,
        deadline: DeadlineClass,
        pricing: PricingBreakdown,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            requester_id,
            product,
            instruction,
            deadline,
            price_amount: pricing.price_amount,
            extra_amount: pricing.extra_amount,
            total_amount: pricing.total_amount,
            tax_amount: pricing.tax_amount,
            status: RequestStatus::Pending,
            revision: 0,
            delivered_image_url: None,
            validation: ValidationRecord::default(),
            created_at: now,
            modified_at: now,
            accepted_at: None,
            expected_delivery: None,
            delivered_at: None,
            validated_at: None,
        }
    }

    pub fn creator_id(&self) -> &UserId {
        &self.product.creator_id
    }

    pub fn apply_pricing(&mut self, pricing: PricingBreakdown) {
        self.price_amount = pricing.price_amount;
        self.extra_amount = pricing.extra_amount;
        self.total_amount = pricing.total_amount;
        self.tax_amount = pricing.tax_amount;
    }
}
