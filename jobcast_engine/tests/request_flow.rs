//! End-to-end request lifecycle tests against the SQLite store.
use chrono::{Duration, Utc};
use jobcast_common::Price;
use jobcast_engine::{
    db_types::{NewScheduledRequest, RequestId, RequestStatus, RequestType},
    RequestFlowError,
    RequestStore,
};

mod support;

use support::{lower_manhattan, plumbing_draft, setup, tear_down};

#[tokio::test]
async fn create_instant_request_populates_the_record() {
    let api = setup().await;
    let request = api.create_instant_request(plumbing_draft()).await.expect("Error creating request");
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.request_type, RequestType::Instant);
    assert_eq!(request.initial_price, Price::from_major(150));
    assert_eq!(request.current_price, Price::from_major(150));
    assert_eq!(request.price_history.len(), 1);
    assert_eq!(request.price_history[0].price, Price::from_major(150));
    assert_eq!(request.broadcast_radius_km, Some(10.0));
    let expires = request.expires_at.expect("instant request must carry a deadline");
    assert!(expires > request.created_at);
    assert!(request.accepted_by.is_none());
    tear_down(api).await;
}

#[tokio::test]
async fn create_rejects_bad_drafts() {
    let api = setup().await;
    let negative = {
        let mut draft = plumbing_draft();
        draft.price = Price::from_major(-5);
        draft
    };
    assert!(matches!(
        api.create_instant_request(negative).await,
        Err(RequestFlowError::Validation(_))
    ));
    let terse = plumbing_draft().with_description("halp");
    assert!(matches!(api.create_instant_request(terse).await, Err(RequestFlowError::Validation(_))));
    let zero_radius = {
        let mut draft = plumbing_draft();
        draft.broadcast_radius_km = 0.0;
        draft
    };
    assert!(matches!(
        api.create_instant_request(zero_radius).await,
        Err(RequestFlowError::Validation(_))
    ));
    tear_down(api).await;
}

#[tokio::test]
async fn fetch_unknown_id_is_not_found() {
    let api = setup().await;
    let missing: RequestId = "req-doesnotexist".parse().unwrap();
    assert!(matches!(api.fetch_request(&missing).await, Err(RequestFlowError::NotFound(_))));
    tear_down(api).await;
}

#[tokio::test]
async fn boost_appends_history_and_keeps_the_deadline() {
    let api = setup().await;
    let request = api.create_instant_request(plumbing_draft()).await.unwrap();
    let id = request.request_id.clone();
    let deadline = request.expires_at;

    let boosted = api.boost_price(&id, Price::from_major(200)).await.expect("Error boosting price");
    assert_eq!(boosted.status, RequestStatus::PriceBoosted);
    assert_eq!(boosted.current_price, Price::from_major(200));
    assert_eq!(boosted.expires_at, deadline, "boosting must not extend the deadline");

    let boosted = api.boost_price(&id, Price::from_major(250)).await.unwrap();
    assert_eq!(boosted.price_history.len(), 3);
    // Strictly increasing in price and chronologically ordered; current price is the last entry.
    for pair in boosted.price_history.windows(2) {
        assert!(pair[0].price < pair[1].price);
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
    assert_eq!(boosted.current_price, boosted.price_history.last().unwrap().price);
    assert_eq!(boosted.price_history[0].price, boosted.initial_price);
    tear_down(api).await;
}

#[tokio::test]
async fn boost_rejects_out_of_range_prices() {
    let api = setup().await;
    let request = api.create_instant_request(plumbing_draft()).await.unwrap();
    let id = request.request_id.clone();

    // 140 <= the current 150
    assert!(matches!(
        api.boost_price(&id, Price::from_major(140)).await,
        Err(RequestFlowError::Validation(_))
    ));
    // Equal is not an increase either
    assert!(matches!(
        api.boost_price(&id, Price::from_major(150)).await,
        Err(RequestFlowError::Validation(_))
    ));
    // 460 > the 3x ceiling of 450
    assert!(matches!(
        api.boost_price(&id, Price::from_major(460)).await,
        Err(RequestFlowError::Validation(_))
    ));
    // The record is untouched by the failed attempts
    let request = api.fetch_request(&id).await.unwrap();
    assert_eq!(request.current_price, Price::from_major(150));
    assert_eq!(request.price_history.len(), 1);
    assert_eq!(request.status, RequestStatus::Pending);
    tear_down(api).await;
}

#[tokio::test]
async fn boost_after_acceptance_is_illegal() {
    let api = setup().await;
    let request = api.create_instant_request(plumbing_draft()).await.unwrap();
    let id = request.request_id.clone();
    api.accept_request(&id, "provider-bob").await.unwrap();
    assert!(matches!(
        api.boost_price(&id, Price::from_major(300)).await,
        Err(RequestFlowError::IllegalTransition { .. })
    ));
    tear_down(api).await;
}

#[tokio::test]
async fn full_fulfilment_lifecycle() {
    let api = setup().await;
    let request = api.create_instant_request(plumbing_draft()).await.unwrap();
    let id = request.request_id.clone();

    let accepted = api.accept_request(&id, "provider-bob").await.unwrap();
    assert_eq!(accepted.status, RequestStatus::Accepted);
    assert_eq!(accepted.accepted_by.as_deref(), Some("provider-bob"));
    assert!(accepted.accepted_at.is_some());
    assert!(accepted.updated_at >= request.updated_at);

    // Only the accepting provider may drive fulfilment
    assert!(matches!(
        api.start_work(&id, "provider-mallory").await,
        Err(RequestFlowError::Validation(_))
    ));

    let started = api.start_work(&id, "provider-bob").await.unwrap();
    assert_eq!(started.status, RequestStatus::InProgress);

    let done = api.complete_request(&id, "provider-bob").await.unwrap();
    assert_eq!(done.status, RequestStatus::Completed);

    // Terminal: nothing else may fire
    assert!(matches!(
        api.cancel_request(&id, "buyer-alice").await,
        Err(RequestFlowError::IllegalTransition { .. })
    ));
    tear_down(api).await;
}

#[tokio::test]
async fn cancelling_an_accepted_request_releases_the_claim() {
    let api = setup().await;
    let request = api.create_instant_request(plumbing_draft()).await.unwrap();
    let id = request.request_id.clone();
    let accepted = api.accept_request(&id, "provider-bob").await.unwrap();
    assert!(accepted.accepted_by.is_some());

    let cancelled = api.cancel_request(&id, "buyer-alice").await.unwrap();
    assert_eq!(cancelled.status, RequestStatus::Cancelled);
    assert!(cancelled.accepted_by.is_none(), "a cancelled request carries no provider claim");
    assert!(cancelled.accepted_at.is_none());

    // The stored record agrees, including when cancellation lands mid-fulfilment
    let stored = api.fetch_request(&id).await.unwrap();
    assert!(stored.accepted_by.is_none());

    let request = api.create_instant_request(plumbing_draft()).await.unwrap();
    let id = request.request_id.clone();
    api.accept_request(&id, "provider-bob").await.unwrap();
    api.start_work(&id, "provider-bob").await.unwrap();
    let cancelled = api.cancel_request(&id, "buyer-alice").await.unwrap();
    assert!(cancelled.accepted_by.is_none());
    assert!(cancelled.accepted_at.is_none());
    tear_down(api).await;
}

#[tokio::test]
async fn cancel_and_convert_finalise_open_requests() {
    let api = setup().await;
    let request = api.create_instant_request(plumbing_draft()).await.unwrap();
    let cancelled = api.cancel_request(&request.request_id, "buyer-alice").await.unwrap();
    assert_eq!(cancelled.status, RequestStatus::Cancelled);

    let request = api.create_instant_request(plumbing_draft()).await.unwrap();
    let converted = api.convert_to_scheduled(&request.request_id).await.unwrap();
    assert_eq!(converted.status, RequestStatus::ConvertedToScheduled);

    let cancelled_list = api.store().fetch_by_status(RequestStatus::Cancelled).await.unwrap();
    assert_eq!(cancelled_list.len(), 1);
    assert_eq!(cancelled_list[0].request_id, cancelled.request_id);

    // Both are terminal now
    assert!(matches!(
        api.accept_request(&cancelled.request_id, "provider-bob").await,
        Err(RequestFlowError::Conflict(_))
    ));
    assert!(matches!(
        api.accept_request(&converted.request_id, "provider-bob").await,
        Err(RequestFlowError::Conflict(_))
    ));
    tear_down(api).await;
}

#[tokio::test]
async fn scheduled_requests_honour_the_preferred_seller_pin() {
    let api = setup().await;
    let draft = NewScheduledRequest::new(
        "buyer-alice",
        lower_manhattan(),
        "Plumbing",
        Price::from_major(180),
        Utc::now() + Duration::days(3),
        "09:00-12:00",
    )
    .with_description("Install the new dishwasher next week")
    .with_preferred_seller("provider-bob");
    let request = api.create_scheduled_request(draft).await.unwrap();
    assert_eq!(request.request_type, RequestType::Scheduled);
    assert!(request.expires_at.is_none(), "scheduled requests carry no deadline");

    // Pinned to bob; carol is told the request is reserved, not that she lost a race
    assert!(matches!(
        api.accept_request(&request.request_id, "provider-carol").await,
        Err(RequestFlowError::ReservedForPreferredSeller(_))
    ));
    let accepted = api.accept_request(&request.request_id, "provider-bob").await.unwrap();
    assert_eq!(accepted.accepted_by.as_deref(), Some("provider-bob"));
    tear_down(api).await;
}

#[tokio::test]
async fn unpinned_scheduled_requests_accept_anyone() {
    let api = setup().await;
    let draft = NewScheduledRequest::new(
        "buyer-alice",
        lower_manhattan(),
        "Electrical",
        Price::from_major(90),
        Utc::now() + Duration::days(1),
        "13:00-15:00",
    )
    .with_description("Replace two faulty wall sockets");
    let request = api.create_scheduled_request(draft).await.unwrap();
    let accepted = api.accept_request(&request.request_id, "provider-carol").await.unwrap();
    assert_eq!(accepted.status, RequestStatus::Accepted);
    tear_down(api).await;
}
