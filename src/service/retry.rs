use std::future::Future;
use std::time::Duration;

use crate::domain::MarketError;

pub const DEFAULT_ATTEMPTS: u32 = 3;

const BASE_BACKOFF: Duration = Duration::from_millis(25);

/// Run `operation`, retrying transient infrastructure failures with doubling
/// backoff. Domain errors (state conflicts, insufficient funds, missing rows)
/// are returned immediately: retrying those can never help, and the storage
/// commit is atomic so a failed attempt left nothing behind to compensate.
pub async fn with_retry<T, F, Fut>(
    operation: &str,
    attempts: u32,
    mut run: F,
) -> Result<T, MarketError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MarketError>>,
{
    let mut backoff = BASE_BACKOFF;
    let mut attempt = 1;

    loop {
        match run().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < attempts => {
                tracing::warn!(
                    operation,
                    attempt,
                    error = %e,
                    "transient failure; retrying after {:?}",
                    backoff
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
