use std::sync::Arc;

use tokio::sync::mpsc;

use crate::adapter::{
    ChannelPublisher, MemoryCatalog, MemoryStore, RequestRegistry, SingleShardRouter,
};
use crate::domain::{MarketPolicy, ValidationJob};
use crate::service::{mock, OrderService};

/// Everything `boot` wires up. Concrete handles are exposed so callers can
/// seed wallets, read the ledger, or drain the validation job queue.
pub struct Services {
    pub store: Arc<MemoryStore>,
    pub catalog: Arc<MemoryCatalog>,
    pub publisher: Arc<ChannelPublisher>,
    pub service: Arc<OrderService>,
    pub registry: RequestRegistry,
    pub jobs: mpsc::Receiver<ValidationJob>,
}

/// Set up the commission market and return its service handles.
///
/// This creates all the infrastructure:
/// - MemoryStore (sharded wallets + requests + ledger behind one lock per shard)
/// - MemoryCatalog (product snapshots, seeded with the demo products)
/// - ChannelPublisher (validation trigger queue; `jobs` is the worker side)
/// - RequestRegistry (spawns one actor per request on demand)
///
/// Architecture:
/// - CSV → Orchestrator → RequestRegistry → RequestActor (per request) → OrderService → MemoryStore
/// - Delivery publishes a ValidationJob after the transition commits
/// - Validation results settle escrow through the same status-guarded path
pub async fn boot() -> Services {
    let store = Arc::new(MemoryStore::new(Arc::new(SingleShardRouter)));
    let catalog = Arc::new(MemoryCatalog::new());
    for product in mock::demo_products() {
        catalog.insert(product).await;
    }

    let (publisher, jobs) = ChannelPublisher::pair(1024);

    let service = Arc::new(OrderService::new(
        MarketPolicy::default(),
        catalog.clone(),
        store.clone(),
        store.clone(),
        publisher.clone(),
    ));
    let registry = RequestRegistry::new(service.clone());

    tracing::info!("commission market initialized");

    Services {
        store,
        catalog,
        publisher,
        service,
        registry,
        jobs,
    }
}
