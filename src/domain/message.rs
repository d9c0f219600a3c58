use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::RequestId;

/// Outbound trigger asking the external validation worker to inspect a
/// delivered image. Fire-and-forget: publishing happens after the Delivered
/// transition has committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationJob {
    pub request_id: RequestId,
    pub image_url: String,
    pub expected_text: String,
    pub delivered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Passed,
    Failed,
    NeedsReview,
    Error,
}

/// Inbound completion message from the external validation worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub request_id: RequestId,
    pub status: ValidationStatus,
    pub confidence: Option<f32>,
    pub detected_body_part: Option<String>,
    pub extracted_text: Option<String>,
    pub text_similarity: Option<f32>,
    pub requires_human_review: bool,
    pub error_message: Option<String>,
    pub validated_at: DateTime<Utc>,
}

/// Normalized validation input: manual overrides and translated AI results
/// both settle a request through this shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationUpdate {
    pub body_part_valid: Option<bool>,
    pub text_valid: Option<bool>,
    pub manual_override: Option<bool>,
    pub status_note: Option<String>,
    pub confidence: Option<f32>,
    pub error: Option<String>,
    pub requires_review: bool,
}

impl ValidationUpdate {
    /// Manual verdict from a human reviewer.
    pub fn manual(valid: bool) -> Self {
        Self {
            manual_override: Some(valid),
            ..Self::default()
        }
    }
}

/// Human correction of an AI result, kept for retraining. Never changes the
/// request status by itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationFeedback {
    pub request_id: RequestId,
    pub correct_body_part: Option<String>,
    pub correct_text: Option<String>,
    pub human_validation: bool,
    pub notes: Option<String>,
    pub provided_at: DateTime<Utc>,
}
