use std::sync::Arc;

use tokio::sync::mpsc;

use crate::domain::{MarketError, RequestError, ValidationResult};
use crate::service::OrderService;

/// Consumes completion messages from the external validation worker and
/// settles the matching requests.
///
/// Delivery is at-least-once, so the consumer leans on the status guard for
/// idempotency: a redelivered result hits a request that already left
/// Delivered and comes back as a state conflict, which is acknowledged and
/// dropped. Only transient failures are propagated so the broker redelivers.
pub struct ValidationConsumer {
    service: Arc<OrderService>,
}

impl ValidationConsumer {
    pub fn new(service: Arc<OrderService>) -> Self {
        Self { service }
    }

    /// Handle one result. `Ok` means acknowledge; `Err` means leave the
    /// message for redelivery.
    pub async fn handle(&self, result: ValidationResult) -> Result<(), MarketError> {
        let request_id = result.request_id.clone();

        match self.service.apply_result(result).await {
            Ok(request) => {
                tracing::info!(request = %request.id, status = %request.status, "validation result applied");
                Ok(())
            }
            Err(MarketError::Request(RequestError::StateConflict { actual, .. })) => {
                tracing::info!(request = %request_id, %actual, "duplicate or late result; acknowledging");
                Ok(())
            }
            Err(MarketError::Request(RequestError::NotFound(_))) => {
                tracing::warn!(request = %request_id, "result for unknown request; acknowledging");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(request = %request_id, error = %e, "result handling failed; leaving for redelivery");
                Err(e)
            }
        }
    }

    /// Drain a result channel until it closes. Failed messages are logged and
    /// dropped; a real broker binding would nack them instead.
    pub async fn run(self, mut results: mpsc::Receiver<ValidationResult>) {
        while let Some(result) = results.recv().await {
            if let Err(e) = self.handle(result).await {
                tracing::error!(error = %e, "dropping validation result");
            }
        }
        tracing::info!("validation result channel closed; consumer stopping");
    }
}
