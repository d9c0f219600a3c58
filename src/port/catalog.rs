use async_trait::async_trait;

use crate::domain::{MarketError, ProductId, ProductSnapshot};

/// Read-only product lookup, used once at request creation to snapshot the
/// commercial details onto the request row.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn get_product(&self, id: &ProductId) -> Result<ProductSnapshot, MarketError>;
}
