mod common;

use chrono::{Duration, Utc};
use common::*;
use commission::domain::{DeadlineClass, MarketError, RequestError, RequestId, RequestStatus};
use rust_decimal_macros::dec;

#[tokio::test]
async fn express_24h_due_window_is_two_hours() {
    let ctx = TestContext::new().await;
    ctx.seed_product("prod-a", "creator-a", "arm").await;
    ctx.fund("alice", dec!(10)).await;

    let id = unique("req");
    ctx.service
        .create_request(create(&id, "alice", "prod-a", DeadlineClass::Express24h))
        .await
        .unwrap();
    let accepted = ctx.service.accept_request(accept(&id, "creator-a")).await.unwrap();

    let window = accepted.expected_delivery.unwrap() - accepted.accepted_at.unwrap();
    assert_eq!(window, Duration::hours(2));
}

#[tokio::test]
async fn three_day_due_window_is_three_days() {
    let ctx = TestContext::new().await;
    ctx.seed_product("prod-b", "creator-b", "arm").await;
    ctx.fund("bob", dec!(10)).await;

    let id = unique("req");
    ctx.service
        .create_request(create(&id, "bob", "prod-b", DeadlineClass::ThreeDay))
        .await
        .unwrap();
    let accepted = ctx.service.accept_request(accept(&id, "creator-b")).await.unwrap();

    let window = accepted.expected_delivery.unwrap() - accepted.accepted_at.unwrap();
    assert_eq!(window, Duration::days(3));
}

#[tokio::test]
async fn expiry_refunds_the_escrow_exactly_once() {
    let ctx = TestContext::new().await;
    ctx.seed_product("prod-c", "creator-c", "arm").await;
    ctx.fund("carol", dec!(10)).await;

    let id = unique("req");
    ctx.service
        .create_request(create(&id, "carol", "prod-c", DeadlineClass::Express24h))
        .await
        .unwrap();
    ctx.service.accept_request(accept(&id, "creator-c")).await.unwrap();
    ctx.assert_gems("carol", dec!(5)).await;

    let request_id = RequestId::new(&id);
    let later = Utc::now() + Duration::hours(3);

    let expired = ctx.service.expire_request(&request_id, later).await.unwrap();
    assert_eq!(expired.status, RequestStatus::Expired);
    ctx.assert_gems("carol", dec!(10)).await;

    // A second expiry attempt hits the status guard
    let err = ctx.service.expire_request(&request_id, later).await.unwrap_err();
    assert!(matches!(
        err,
        MarketError::Request(RequestError::StateConflict { .. })
    ));
    ctx.assert_gems("carol", dec!(10)).await;
}

#[tokio::test]
async fn expiry_before_the_due_date_is_rejected() {
    let ctx = TestContext::new().await;
    ctx.seed_product("prod-d", "creator-d", "arm").await;
    ctx.fund("dave", dec!(10)).await;

    let id = unique("req");
    ctx.service
        .create_request(create(&id, "dave", "prod-d", DeadlineClass::ThreeDay))
        .await
        .unwrap();
    ctx.service.accept_request(accept(&id, "creator-d")).await.unwrap();

    let err = ctx
        .service
        .expire_request(&RequestId::new(&id), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::Request(RequestError::NotYetDue(_))));
    ctx.assert_gems("dave", dec!(7)).await;
}

#[tokio::test]
async fn sweep_expires_only_what_is_overdue() {
    let ctx = TestContext::new().await;
    ctx.seed_product("prod-e", "creator-e", "arm").await;
    ctx.fund("erin", dec!(20)).await;

    let rush = unique("req");
    ctx.service
        .create_request(create(&rush, "erin", "prod-e", DeadlineClass::Express24h))
        .await
        .unwrap();
    ctx.service.accept_request(accept(&rush, "creator-e")).await.unwrap();

    let slow = unique("req");
    ctx.service
        .create_request(create(&slow, "erin", "prod-e", DeadlineClass::ThreeDay))
        .await
        .unwrap();
    ctx.service.accept_request(accept(&slow, "creator-e")).await.unwrap();

    // 5 + 3 held
    ctx.assert_gems("erin", dec!(12)).await;

    let later = Utc::now() + Duration::hours(3);
    let expired = ctx.service.expire_overdue(later).await.unwrap();
    assert_eq!(expired, vec![RequestId::new(&rush)]);

    // Rush refunded, slow still held
    ctx.assert_gems("erin", dec!(17)).await;
    let slow_row = ctx.service.get_request(&RequestId::new(&slow)).await.unwrap();
    assert_eq!(slow_row.status, RequestStatus::Accepted);

    // Sweep again at the same instant: nothing left to expire
    let expired = ctx.service.expire_overdue(later).await.unwrap();
    assert!(expired.is_empty());
    ctx.assert_gems("erin", dec!(17)).await;
}

#[tokio::test]
async fn delivered_requests_are_never_swept() {
    let ctx = TestContext::new().await;
    ctx.seed_product("prod-f", "creator-f", "arm").await;
    ctx.fund("frank", dec!(10)).await;

    let id = unique("req");
    ctx.service
        .create_request(create(&id, "frank", "prod-f", DeadlineClass::Express24h))
        .await
        .unwrap();
    ctx.service.accept_request(accept(&id, "creator-f")).await.unwrap();
    ctx.service.deliver_request(deliver(&id, "creator-f")).await.unwrap();

    let later = Utc::now() + Duration::days(10);
    let expired = ctx.service.expire_overdue(later).await.unwrap();
    assert!(expired.is_empty());

    let row = ctx.service.get_request(&RequestId::new(&id)).await.unwrap();
    assert_eq!(row.status, RequestStatus::Delivered);
}
