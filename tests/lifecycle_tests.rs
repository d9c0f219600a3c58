mod common;

use common::*;
use commission::domain::{
    DeadlineClass, MarketError, RequestError, RequestStatus, ValidationUpdate, WalletError,
};
use rust_decimal_macros::dec;

#[tokio::test]
async fn full_flow_pays_creator_on_passing_validation() {
    let ctx = TestContext::new().await;
    ctx.seed_product("prod-a", "creator-a", "arm").await;
    ctx.fund("alice", dec!(10)).await;

    let id = unique("req");
    let request = ctx
        .service
        .create_request(create(&id, "alice", "prod-a", DeadlineClass::Express24h))
        .await
        .unwrap();

    // Base 3 plus the 24h rush fee of 2
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.total_amount, dec!(5));
    assert_eq!(request.tax_amount, dec!(0.50));
    ctx.assert_gems("alice", dec!(10)).await; // nothing held yet

    let accepted = ctx.service.accept_request(accept(&id, "creator-a")).await.unwrap();
    assert_eq!(accepted.status, RequestStatus::Accepted);
    assert!(accepted.expected_delivery.is_some());
    ctx.assert_gems("alice", dec!(5)).await;

    let delivered = ctx.service.deliver_request(deliver(&id, "creator-a")).await.unwrap();
    assert_eq!(delivered.status, RequestStatus::Delivered);
    ctx.assert_gems("creator-a", dec!(0)).await; // escrow not released yet

    let paid = ctx
        .service
        .apply_validation(
            &accepted.id,
            ValidationUpdate {
                body_part_valid: Some(true),
                text_valid: Some(true),
                ..ValidationUpdate::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(paid.status, RequestStatus::Paid);
    assert!(paid.validated_at.is_some());
    ctx.assert_gems("alice", dec!(5)).await;
    ctx.assert_gems("creator-a", dec!(5)).await;
}

#[tokio::test]
async fn failed_validation_refunds_requester() {
    let ctx = TestContext::new().await;
    ctx.seed_product("prod-b", "creator-b", "leg").await;
    ctx.fund("bob", dec!(10)).await;

    let id = unique("req");
    ctx.service
        .create_request(create(&id, "bob", "prod-b", DeadlineClass::Express24h))
        .await
        .unwrap();
    ctx.service.accept_request(accept(&id, "creator-b")).await.unwrap();
    ctx.service.deliver_request(deliver(&id, "creator-b")).await.unwrap();

    let disputed = ctx
        .service
        .apply_validation(
            &commission::domain::RequestId::new(&id),
            ValidationUpdate {
                body_part_valid: Some(true),
                text_valid: Some(false),
                ..ValidationUpdate::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(disputed.status, RequestStatus::Dispute);
    ctx.assert_gems("bob", dec!(10)).await; // full escrow returned
    ctx.assert_gems("creator-b", dec!(0)).await;
}

#[tokio::test]
async fn tax_never_moves_funds() {
    let ctx = TestContext::new().await;
    ctx.seed_product("prod-c", "creator-c", "arm").await;
    ctx.fund("carol", dec!(20)).await;

    let id = unique("req");
    let request = ctx
        .service
        .create_request(create(&id, "carol", "prod-c", DeadlineClass::Express48h))
        .await
        .unwrap();
    assert_eq!(request.total_amount, dec!(4));
    assert_eq!(request.tax_amount, dec!(0.40));

    ctx.service.accept_request(accept(&id, "creator-c")).await.unwrap();

    // Debit is the total exactly, the tax rides along on the row only
    ctx.assert_gems("carol", dec!(16)).await;
}

#[tokio::test]
async fn cancel_is_pending_only() {
    let ctx = TestContext::new().await;
    ctx.seed_product("prod-d", "creator-d", "arm").await;
    ctx.fund("dave", dec!(10)).await;

    let id = unique("req");
    ctx.service
        .create_request(create(&id, "dave", "prod-d", DeadlineClass::ThreeDay))
        .await
        .unwrap();
    ctx.service.accept_request(accept(&id, "creator-d")).await.unwrap();

    let err = ctx.service.cancel_request(cancel(&id, "dave")).await.unwrap_err();
    assert!(matches!(
        err,
        MarketError::Request(RequestError::StateConflict { .. })
    ));

    // Escrow untouched by the failed cancel
    ctx.assert_gems("dave", dec!(7)).await;
}

#[tokio::test]
async fn cancel_while_pending_releases_nothing_because_nothing_was_held() {
    let ctx = TestContext::new().await;
    ctx.seed_product("prod-e", "creator-e", "arm").await;
    ctx.fund("erin", dec!(10)).await;

    let id = unique("req");
    ctx.service
        .create_request(create(&id, "erin", "prod-e", DeadlineClass::ThreeDay))
        .await
        .unwrap();
    let cancelled = ctx.service.cancel_request(cancel(&id, "erin")).await.unwrap();

    assert_eq!(cancelled.status, RequestStatus::Cancelled);
    ctx.assert_gems("erin", dec!(10)).await;
}

#[tokio::test]
async fn only_the_creator_may_accept() {
    let ctx = TestContext::new().await;
    ctx.seed_product("prod-f", "creator-f", "arm").await;
    ctx.fund("frank", dec!(10)).await;

    let id = unique("req");
    ctx.service
        .create_request(create(&id, "frank", "prod-f", DeadlineClass::ThreeDay))
        .await
        .unwrap();

    let err = ctx.service.accept_request(accept(&id, "mallory")).await.unwrap_err();
    assert!(matches!(
        err,
        MarketError::Request(RequestError::Unauthorized { .. })
    ));

    // The requester cannot accept their own request either
    let err = ctx.service.accept_request(accept(&id, "frank")).await.unwrap_err();
    assert!(matches!(
        err,
        MarketError::Request(RequestError::Unauthorized { .. })
    ));
}

#[tokio::test]
async fn deliver_requires_an_accepted_request() {
    let ctx = TestContext::new().await;
    ctx.seed_product("prod-g", "creator-g", "arm").await;
    ctx.fund("grace", dec!(10)).await;

    let id = unique("req");
    ctx.service
        .create_request(create(&id, "grace", "prod-g", DeadlineClass::ThreeDay))
        .await
        .unwrap();

    let err = ctx
        .service
        .deliver_request(deliver(&id, "creator-g"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MarketError::Request(RequestError::StateConflict { .. })
    ));
}

#[tokio::test]
async fn deadline_update_reprices_the_request() {
    let ctx = TestContext::new().await;
    ctx.seed_product("prod-h", "creator-h", "arm").await;
    ctx.fund("heidi", dec!(10)).await;

    let id = unique("req");
    let request = ctx
        .service
        .create_request(create(&id, "heidi", "prod-h", DeadlineClass::ThreeDay))
        .await
        .unwrap();
    assert_eq!(request.total_amount, dec!(3));

    let updated = ctx
        .service
        .update_request(commission::domain::UpdateRequest {
            request_id: request.id.clone(),
            caller_id: commission::domain::UserId::new("heidi"),
            instruction: Some("bigger lettering".to_string()),
            deadline: Some(DeadlineClass::Express24h),
        })
        .await
        .unwrap();

    assert_eq!(updated.total_amount, dec!(5));
    assert_eq!(updated.tax_amount, dec!(0.50));
    assert_eq!(updated.instruction, "bigger lettering");
}

#[tokio::test]
async fn update_by_a_stranger_is_rejected() {
    let ctx = TestContext::new().await;
    ctx.seed_product("prod-i", "creator-i", "arm").await;
    ctx.fund("ivan", dec!(10)).await;

    let id = unique("req");
    ctx.service
        .create_request(create(&id, "ivan", "prod-i", DeadlineClass::ThreeDay))
        .await
        .unwrap();

    let err = ctx
        .service
        .update_request(commission::domain::UpdateRequest {
            request_id: commission::domain::RequestId::new(&id),
            caller_id: commission::domain::UserId::new("creator-i"),
            instruction: Some("something else".to_string()),
            deadline: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MarketError::Request(RequestError::Unauthorized { .. })
    ));
}

#[tokio::test]
async fn create_requires_an_affordable_total() {
    let ctx = TestContext::new().await;
    ctx.seed_product("prod-j", "creator-j", "arm").await;
    ctx.fund("judy", dec!(4)).await;

    let id = unique("req");
    let err = ctx
        .service
        .create_request(create(&id, "judy", "prod-j", DeadlineClass::Express24h))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MarketError::Wallet(WalletError::InsufficientFunds { .. })
    ));
}

#[tokio::test]
async fn create_rejects_unknown_products() {
    let ctx = TestContext::new().await;
    ctx.fund("kim", dec!(10)).await;

    let id = unique("req");
    let err = ctx
        .service
        .create_request(create(&id, "kim", "no-such-product", DeadlineClass::ThreeDay))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MarketError::Request(RequestError::ProductNotFound(_))
    ));
}

#[tokio::test]
async fn create_allows_a_balance_exactly_equal_to_the_total() {
    let ctx = TestContext::new().await;
    ctx.seed_product("prod-l", "creator-l", "arm").await;
    ctx.fund("mona", dec!(5)).await;

    let id = unique("req");
    let request = ctx
        .service
        .create_request(create(&id, "mona", "prod-l", DeadlineClass::Express24h))
        .await
        .unwrap();
    assert_eq!(request.total_amount, dec!(5));

    ctx.service.accept_request(accept(&id, "creator-l")).await.unwrap();
    ctx.assert_gems("mona", dec!(0)).await;
}

#[tokio::test]
async fn duplicate_request_ids_are_rejected() {
    let ctx = TestContext::new().await;
    ctx.seed_product("prod-k", "creator-k", "arm").await;
    ctx.fund("lena", dec!(20)).await;

    let id = unique("req");
    ctx.service
        .create_request(create(&id, "lena", "prod-k", DeadlineClass::ThreeDay))
        .await
        .unwrap();

    let err = ctx
        .service
        .create_request(create(&id, "lena", "prod-k", DeadlineClass::ThreeDay))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MarketError::Request(RequestError::AlreadyExists(_))
    ));
}
