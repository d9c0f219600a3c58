//! Pure state-machine functions shared by every order-like flow.
//!
//! No I/O and no clocks in here: callers pass timestamps in and commit the
//! results through the repository's guarded transition.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::{
    DeadlineClass, MarketPolicy, PricingBreakdown, Request, RequestError, RequestStatus, UserId,
    ValidationRecord, ValidationResult, ValidationStatus, ValidationUpdate,
};

/// Guard a transition: the request must currently be in `expected`.
pub fn ensure_status(request: &Request, expected: RequestStatus) -> Result<(), RequestError> {
    if request.status == expected {
        Ok(())
    } else {
        Err(RequestError::StateConflict {
            id: request.id.clone(),
            expected,
            actual: request.status,
        })
    }
}

/// Guard a party-bound action: `caller` must match `party`.
pub fn ensure_party(
    request: &Request,
    caller: &UserId,
    party: &UserId,
) -> Result<(), RequestError> {
    if caller == party {
        Ok(())
    } else {
        Err(RequestError::Unauthorized {
            id: request.id.clone(),
            caller: caller.clone(),
        })
    }
}

/// Deadline-to-cost mapping: a pure lookup, same inputs always yield the same
/// breakdown. Tax is tracked on the row but never debited.
pub fn pricing(policy: &MarketPolicy, deadline: DeadlineClass) -> PricingBreakdown {
    let price_amount = policy.base_price;
    let extra_amount = policy.terms(deadline).extra_fee;
    let total_amount = price_amount + extra_amount;
    let tax_amount = (total_amount * policy.tax_rate).round_dp(2);

    PricingBreakdown {
        price_amount,
        extra_amount,
        total_amount,
        tax_amount,
    }
}

/// Expected delivery date, keyed by deadline class off the accept timestamp.
pub fn due_date(
    policy: &MarketPolicy,
    deadline: DeadlineClass,
    accepted_at: DateTime<Utc>,
) -> DateTime<Utc> {
    accepted_at + policy.terms(deadline).due_window
}

pub fn is_overdue(request: &Request, now: DateTime<Utc>) -> bool {
    request.status == RequestStatus::Accepted
        && request
            .expected_delivery
            .map(|due| due < now)
            .unwrap_or(false)
}

/// Pass condition: both component matches, or an explicit manual override.
/// An override of `false` does not force failure on its own; the AND already
/// failing does.
pub fn validation_passes(record: &ValidationRecord) -> bool {
    if record.manual_override == Some(true) {
        return true;
    }
    record.body_part_valid == Some(true) && record.text_valid == Some(true)
}

/// Fold a validation update into the request's record.
pub fn merge_validation(record: &mut ValidationRecord, update: &ValidationUpdate) {
    if update.body_part_valid.is_some() {
        record.body_part_valid = update.body_part_valid;
    }
    if update.text_valid.is_some() {
        record.text_valid = update.text_valid;
    }
    if update.manual_override.is_some() {
        record.manual_override = update.manual_override;
    }
    if update.status_note.is_some() {
        record.status_note = update.status_note.clone();
    }
    if update.confidence.is_some() {
        record.confidence = update.confidence;
    }
    if update.error.is_some() {
        record.error = update.error.clone();
    }
}

/// Translate an external worker result into the local pass/fail policy.
///
/// A clean `Passed` verdict is authoritative. Otherwise the component flags
/// are derived from the detected body part against the cached snapshot and
/// the OCR similarity against the configured floor. Worker errors never
/// settle; they are recorded and flagged for review.
pub fn translate_result(
    request: &Request,
    result: &ValidationResult,
    policy: &MarketPolicy,
) -> ValidationUpdate {
    let status_note = Some(format!("{:?}", result.status).to_lowercase());

    if result.status == ValidationStatus::Error {
        return ValidationUpdate {
            status_note,
            confidence: result.confidence,
            error: result.error_message.clone(),
            requires_review: true,
            ..ValidationUpdate::default()
        };
    }

    let (body_part_valid, text_valid) = if result.status == ValidationStatus::Passed {
        (Some(true), Some(true))
    } else {
        let body_part = result
            .detected_body_part
            .as_deref()
            .map(|detected| detected.eq_ignore_ascii_case(&request.product.body_part));
        let text = result
            .text_similarity
            .map(|score| score >= policy.text_match_threshold);
        (body_part, text)
    };

    ValidationUpdate {
        body_part_valid,
        text_valid,
        manual_override: None,
        status_note,
        confidence: result.confidence,
        error: result.error_message.clone(),
        requires_review: result.requires_human_review
            || result.status == ValidationStatus::NeedsReview,
    }
}

/// Amount held in escrow for a request, for conservation audits: debited at
/// accept, resolved at validate/expire, zero everywhere else.
pub fn escrowed_amount(request: &Request) -> Decimal {
    match request.status {
        RequestStatus::Accepted | RequestStatus::Delivered | RequestStatus::Validated => {
            request.total_amount
        }
        _ => Decimal::ZERO,
    }
}
