#![allow(dead_code)]
/// Shared test utilities and helpers
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::mpsc;

use commission::adapter::{ChannelPublisher, MemoryCatalog, MemoryStore, SingleShardRouter};
use commission::domain::{
    AcceptRequest, CancelRequest, CreateRequest, Currency, DeadlineClass, DeliverRequest,
    MarketPolicy, ProductId, ProductSnapshot, RequestId, UserId, ValidationJob, ValidationResult,
    ValidationStatus,
};
use commission::port::{ShardRouter, WalletLedger};
use commission::service::OrderService;

/// Test context that wires the full in-memory stack around one service.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub catalog: Arc<MemoryCatalog>,
    pub publisher: Arc<ChannelPublisher>,
    pub service: Arc<OrderService>,
    pub jobs: mpsc::Receiver<ValidationJob>,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_router(Arc::new(SingleShardRouter)).await
    }

    pub async fn with_router(router: Arc<dyn ShardRouter>) -> Self {
        let store = Arc::new(MemoryStore::new(router));
        let catalog = Arc::new(MemoryCatalog::new());
        let (publisher, jobs) = ChannelPublisher::pair(64);

        let service = Arc::new(OrderService::new(
            MarketPolicy::default(),
            catalog.clone(),
            store.clone(),
            store.clone(),
            publisher.clone(),
        ));

        Self {
            store,
            catalog,
            publisher,
            service,
            jobs,
        }
    }

    /// Seed one product owned by `creator`.
    pub async fn seed_product(&self, product: &str, creator: &str, body_part: &str) {
        self.catalog
            .insert(ProductSnapshot {
                product_id: ProductId::new(product),
                creator_id: UserId::new(creator),
                name: format!("{} design", product),
                main_photo_url: format!("https://cdn.example.com/{}.jpg", product),
                body_part: body_part.to_string(),
            })
            .await;
    }

    /// Credit a user's gem wallet directly.
    pub async fn fund(&self, user: &str, amount: Decimal) {
        self.store
            .add_funds(&UserId::new(user), amount, Currency::Gems, "test seed")
            .await
            .expect("seeding funds should succeed");
    }

    pub async fn gems(&self, user: &str) -> Decimal {
        self.store
            .balance(&UserId::new(user), Currency::Gems)
            .await
            .expect("balance read should succeed")
    }

    pub async fn assert_gems(&self, user: &str, expected: Decimal) {
        assert_eq!(
            self.gems(user).await,
            expected,
            "gem balance mismatch for {}",
            user
        );
    }
}

/// Unique id per call so named actors and requests never collide across tests.
pub fn unique(prefix: &str) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    format!("{}-{}", prefix, COUNTER.fetch_add(1, Ordering::SeqCst))
}

pub fn create(request: &str, user: &str, product: &str, deadline: DeadlineClass) -> CreateRequest {
    CreateRequest {
        request_id: RequestId::new(request),
        requester_id: UserId::new(user),
        product_id: ProductId::new(product),
        instruction: "my initials".to_string(),
        deadline,
    }
}

pub fn accept(request: &str, user: &str) -> AcceptRequest {
    AcceptRequest {
        request_id: RequestId::new(request),
        caller_id: UserId::new(user),
    }
}

pub fn cancel(request: &str, user: &str) -> CancelRequest {
    CancelRequest {
        request_id: RequestId::new(request),
        caller_id: UserId::new(user),
    }
}

pub fn deliver(request: &str, user: &str) -> DeliverRequest {
    DeliverRequest {
        request_id: RequestId::new(request),
        caller_id: UserId::new(user),
        image_url: format!("https://uploads.example.com/{}.jpg", request),
    }
}

/// A clean pass verdict from the validation worker.
pub fn passed_result(request: &str) -> ValidationResult {
    ValidationResult {
        request_id: RequestId::new(request),
        status: ValidationStatus::Passed,
        confidence: Some(0.97),
        detected_body_part: None,
        extracted_text: None,
        text_similarity: None,
        requires_human_review: false,
        error_message: None,
        validated_at: Utc::now(),
    }
}

/// A failed verdict: wrong body part detected, text below the floor.
pub fn failed_result(request: &str, detected: &str) -> ValidationResult {
    ValidationResult {
        request_id: RequestId::new(request),
        status: ValidationStatus::Failed,
        confidence: Some(0.91),
        detected_body_part: Some(detected.to_string()),
        extracted_text: Some("wrong words".to_string()),
        text_similarity: Some(0.3),
        requires_human_review: false,
        error_message: None,
        validated_at: Utc::now(),
    }
}

/// A worker crash report; must never settle escrow.
pub fn error_result(request: &str) -> ValidationResult {
    ValidationResult {
        request_id: RequestId::new(request),
        status: ValidationStatus::Error,
        confidence: None,
        detected_body_part: None,
        extracted_text: None,
        text_similarity: None,
        requires_human_review: true,
        error_message: Some("model timeout".to_string()),
        validated_at: Utc::now(),
    }
}
