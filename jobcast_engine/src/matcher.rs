//! The broadcast feed matcher.
//!
//! Given a provider's location and declared service categories, the matcher narrows the open instant pool down to
//! the requests that provider should see. Visibility is governed by the **buyer's** broadcast radius: a request is
//! shown to any matching provider within the distance the buyer chose to broadcast to, regardless of how far the
//! provider is willing to travel. The feed is pull-based; callers re-invoke it on an interval and no per-provider
//! subscription state is kept.

use crate::{
    db_types::{Location, ServiceRequest},
    geo,
};

//--------------------------------------   ProviderFilter    ---------------------------------------------------------
/// A provider's matching profile, as resolved by the profile store upstream.
#[derive(Debug, Clone)]
pub struct ProviderFilter {
    pub location: Location,
    pub service_categories: Vec<String>,
    /// The provider's own travel-radius preference. Carried for the caller's benefit (e.g. sorting, UI hints); it
    /// does not gate visibility, which is the buyer's broadcast radius alone.
    pub travel_radius_km: Option<f64>,
}

impl ProviderFilter {
    pub fn new(location: Location, service_categories: Vec<String>) -> Self {
        Self { location, service_categories, travel_radius_km: None }
    }

    pub fn with_travel_radius(mut self, radius_km: f64) -> Self {
        self.travel_radius_km = Some(radius_km);
        self
    }

    fn covers_category(&self, category_name: &str) -> bool {
        self.service_categories.iter().any(|c| c == category_name)
    }
}

//--------------------------------------      FeedOrder      ---------------------------------------------------------
/// Caller-chosen feed ordering. The matcher imposes no default beyond stable input order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedOrder {
    /// Stable input order (creation order, as returned by the store).
    #[default]
    Unsorted,
    /// Most recently created first.
    Newest,
    /// Highest current price first.
    PriceDesc,
    /// Closest to the provider first.
    Distance,
}

/// True if `request` belongs in this provider's feed: the category is one the provider serves, and the provider
/// stands within the buyer's broadcast radius.
pub fn is_visible(filter: &ProviderFilter, request: &ServiceRequest) -> bool {
    if !request.is_open() {
        return false;
    }
    let Some(radius) = request.broadcast_radius_km else {
        // Scheduled requests are never broadcast.
        return false;
    };
    filter.covers_category(&request.category_name)
        && geo::distance_km(&filter.location, &request.buyer_location) <= radius
}

/// Filters the open instant pool down to this provider's view and applies the requested ordering.
pub fn assemble_feed(
    filter: &ProviderFilter,
    order: FeedOrder,
    pool: Vec<ServiceRequest>,
) -> Vec<ServiceRequest> {
    let mut feed: Vec<ServiceRequest> = pool.into_iter().filter(|r| is_visible(filter, r)).collect();
    match order {
        FeedOrder::Unsorted => {},
        FeedOrder::Newest => feed.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        FeedOrder::PriceDesc => feed.sort_by(|a, b| b.current_price.cmp(&a.current_price)),
        FeedOrder::Distance => {
            feed.sort_by(|a, b| {
                let da = geo::distance_km(&filter.location, &a.buyer_location);
                let db = geo::distance_km(&filter.location, &b.buyer_location);
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            });
        },
    }
    feed
}
