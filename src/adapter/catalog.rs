use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{MarketError, ProductId, ProductSnapshot, RequestError};
use crate::port::ProductCatalog;

/// In-memory product lookup. For production, back this with the product
/// service's own store.
pub struct MemoryCatalog {
    products: Arc<RwLock<HashMap<ProductId, ProductSnapshot>>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            products: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn insert(&self, snapshot: ProductSnapshot) {
        let mut products = self.products.write().await;
        products.insert(snapshot.product_id.clone(), snapshot);
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProductCatalog for MemoryCatalog {
    async fn get_product(&self, id: &ProductId) -> Result<ProductSnapshot, MarketError> {
        let products = self.products.read().await;
        products
            .get(id)
            .cloned()
            .ok_or_else(|| RequestError::ProductNotFound(id.clone()).into())
    }
}
