//! Broadcast feed correctness: the worked scenario from the product brief.
//!
//! A buyer in Lower Manhattan posts a $150 plumbing job with a 10 km broadcast radius. A plumber near Times Square
//! (~5.3 km away) sees it; a plumber 60 km upstate does not; an electrician next door does not.
use jobcast_common::Price;
use jobcast_engine::{
    db_types::Location,
    geo,
    matcher::{FeedOrder, ProviderFilter},
};

mod support;

use support::{lower_manhattan, plumbing_draft, setup, tear_down, times_square};

fn plumber(location: Location) -> ProviderFilter {
    ProviderFilter::new(location, vec!["Plumbing".to_string()])
}

#[tokio::test]
async fn feed_respects_radius_and_category() {
    let api = setup().await;
    let request = api.create_instant_request(plumbing_draft()).await.unwrap();

    let nearby = plumber(times_square());
    let feed = api.feed(&nearby, FeedOrder::default()).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].request_id, request.request_id);
    // Sanity-check the geometry the scenario relies on
    let d = geo::distance_km(&times_square(), &lower_manhattan());
    assert!((d - 5.3).abs() < 0.2, "expected ~5.3km, got {d}");

    let upstate = plumber(Location::new(41.2565, -73.9855, "Peekskill, New York"));
    assert!(geo::distance_km(&upstate.location, &lower_manhattan()) > 10.0);
    assert!(api.feed(&upstate, FeedOrder::default()).await.unwrap().is_empty());

    let electrician = ProviderFilter::new(times_square(), vec!["Electrical".to_string()]);
    assert!(api.feed(&electrician, FeedOrder::default()).await.unwrap().is_empty());
    tear_down(api).await;
}

#[tokio::test]
async fn feed_never_leaks_out_of_radius_requests() {
    let api = setup().await;
    // A tightly-scoped broadcast: 2 km around the buyer
    let mut draft = plumbing_draft();
    draft.broadcast_radius_km = 2.0;
    api.create_instant_request(draft).await.unwrap();

    let nearby = plumber(times_square());
    for request in api.feed(&nearby, FeedOrder::default()).await.unwrap() {
        let d = geo::distance_km(&nearby.location, &request.buyer_location);
        assert!(d <= request.broadcast_radius_km.unwrap());
        assert!(nearby.service_categories.contains(&request.category_name));
    }
    // Times Square is ~5.3km out, so the 2km broadcast is invisible
    assert!(api.feed(&nearby, FeedOrder::default()).await.unwrap().is_empty());
    tear_down(api).await;
}

#[tokio::test]
async fn accepted_requests_drop_out_of_the_feed() {
    let api = setup().await;
    let request = api.create_instant_request(plumbing_draft()).await.unwrap();
    let nearby = plumber(times_square());
    assert_eq!(api.feed(&nearby, FeedOrder::default()).await.unwrap().len(), 1);

    api.accept_request(&request.request_id, "provider-bob").await.unwrap();
    assert!(api.feed(&nearby, FeedOrder::default()).await.unwrap().is_empty());
    tear_down(api).await;
}

#[tokio::test]
async fn boosted_requests_stay_visible_at_the_new_price() {
    let api = setup().await;
    let request = api.create_instant_request(plumbing_draft()).await.unwrap();
    api.boost_price(&request.request_id, Price::from_major(200)).await.unwrap();

    let nearby = plumber(times_square());
    let feed = api.feed(&nearby, FeedOrder::default()).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].current_price, Price::from_major(200));
    tear_down(api).await;
}

#[tokio::test]
async fn caller_chosen_orderings() {
    let api = setup().await;
    // Cheap job close to the provider, expensive one further away
    let mut near = plumbing_draft();
    near.buyer_location = Location::new(40.7500, -73.9900, "Midtown, New York");
    near.price = Price::from_major(100);
    let near = api.create_instant_request(near).await.unwrap();

    let mut far = plumbing_draft();
    far.price = Price::from_major(300);
    let far = api.create_instant_request(far).await.unwrap();

    let nearby = plumber(times_square());
    let by_price = api.feed(&nearby, FeedOrder::PriceDesc).await.unwrap();
    assert_eq!(by_price[0].request_id, far.request_id);

    let by_distance = api.feed(&nearby, FeedOrder::Distance).await.unwrap();
    assert_eq!(by_distance[0].request_id, near.request_id);

    // Stable creation order when unsorted
    let unsorted = api.feed(&nearby, FeedOrder::Unsorted).await.unwrap();
    assert_eq!(unsorted[0].request_id, near.request_id);
    assert_eq!(unsorted[1].request_id, far.request_id);
    tear_down(api).await;
}
