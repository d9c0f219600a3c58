use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::DeadlineClass;

/// Cost and due-window terms for one deadline class.
#[derive(Debug, Clone)]
pub struct DeadlineTerms {
    pub extra_fee: Decimal,
    pub due_window: Duration,
}

/// Commercial configuration threaded through the order service instead of
/// living in globals, so the state machine can be tested with alternate
/// policies.
#[derive(Debug, Clone)]
pub struct MarketPolicy {
    pub base_price: Decimal,
    pub tax_rate: Decimal,
    /// Gems credited per 1 USD when converting.
    pub gem_usd_rate: Decimal,
    /// Minimum OCR text-similarity score counted as a text match.
    pub text_match_threshold: f32,
    pub three_day: DeadlineTerms,
    pub express_48h: DeadlineTerms,
    pub express_24h: DeadlineTerms,
}

impl MarketPolicy {
    pub fn terms(&self, class: DeadlineClass) -> &DeadlineTerms {
        match class {
            DeadlineClass::ThreeDay => &self.three_day,
            DeadlineClass::Express48h => &self.express_48h,
            DeadlineClass::Express24h => &self.express_24h,
        }
    }
}

impl Default for MarketPolicy {
    fn default() -> Self {
        Self {
            base_price: dec!(3),
            tax_rate: dec!(0.10),
            gem_usd_rate: dec!(10),
            text_match_threshold: 0.8,
            three_day: DeadlineTerms {
                extra_fee: Decimal::ZERO,
                due_window: Duration::days(3),
            },
            express_48h: DeadlineTerms {
                extra_fee: dec!(1),
                due_window: Duration::hours(48),
            },
            // The 24h tier ships with a 2 hour due window, not 24. Kept
            // verbatim until product confirms the intended value; see
            // DESIGN.md.
            express_24h: DeadlineTerms {
                extra_fee: dec!(2),
                due_window: Duration::hours(2),
            },
        }
    }
}
