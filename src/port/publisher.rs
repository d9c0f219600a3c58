use async_trait::async_trait;

use crate::domain::{MarketError, ValidationJob};

/// Outbound side of the async validation bridge. Fire-and-forget: the
/// Delivered transition has already committed by the time this is called, so
/// a publish failure leaves the request awaiting a re-trigger rather than
/// rolling anything back.
#[async_trait]
pub trait ValidationPublisher: Send + Sync {
    async fn publish(&self, job: ValidationJob) -> Result<(), MarketError>;
}
