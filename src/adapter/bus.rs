use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{InfraError, MarketError, ValidationJob};
use crate::port::ValidationPublisher;

/// Channel-backed stand-in for the message broker's publish side. The
/// receiver half is what an external validation worker would drain.
pub struct ChannelPublisher {
    jobs: mpsc::Sender<ValidationJob>,
    fail_publish: AtomicBool,
}

impl ChannelPublisher {
    /// Build a publisher plus the worker-side receiver.
    pub fn pair(capacity: usize) -> (Arc<Self>, mpsc::Receiver<ValidationJob>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Arc::new(Self {
                jobs: tx,
                fail_publish: AtomicBool::new(false),
            }),
            rx,
        )
    }

    /// Force subsequent publishes to fail, simulating a broker outage.
    ///
    /// ## Warning: This is NOT MEANT FOR PRODUCTION USE. Only for testing purposes.
    pub fn set_fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ValidationPublisher for ChannelPublisher {
    async fn publish(&self, job: ValidationJob) -> Result<(), MarketError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(InfraError::PublishFailure("broker unavailable".to_string()).into());
        }

        self.jobs
            .send(job)
            .await
            .map_err(|e| InfraError::PublishFailure(format!("queue closed: {}", e)).into())
    }
}
