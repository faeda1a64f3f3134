use std::fmt::Debug;

use chrono::Utc;
use jobcast_common::Price;
use log::*;

use crate::{
    db_types::{Location, NewInstantRequest, NewScheduledRequest, RequestId, ServiceRequest},
    events::{EventProducers, PriceBoostedEvent, RequestAcceptedEvent},
    matcher::{self, FeedOrder, ProviderFilter},
    status::RequestEvent,
    traits::{RequestFlowError, RequestStore},
};

/// Descriptions shorter than this are rejected at creation; a job a provider cannot understand is a job nobody
/// accepts.
pub const MIN_DESCRIPTION_LEN: usize = 10;

/// `RequestFlowApi` is the primary API for the request broker. It validates drafts, funnels every mutation through
/// the store's conditional writes, and publishes lifecycle events to any subscribed hooks.
pub struct RequestFlowApi<B> {
    store: B,
    producers: EventProducers,
}

impl<B> Debug for RequestFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RequestFlowApi")
    }
}

impl<B> RequestFlowApi<B> {
    pub fn new(store: B, producers: EventProducers) -> Self {
        Self { store, producers }
    }
}

impl<B> RequestFlowApi<B>
where B: RequestStore
{
    /// Submit a new instant request.
    ///
    /// The request is created with `Pending` status and an absolute expiry deadline of now plus the draft's
    /// lifetime; from that moment it is visible to matching providers via [`Self::feed`] until it is accepted,
    /// cancelled, converted, or the deadline lapses.
    pub async fn create_instant_request(
        &self,
        draft: NewInstantRequest,
    ) -> Result<ServiceRequest, RequestFlowError> {
        validate_common(&draft.price, &draft.description, &draft.buyer_location)?;
        if !(draft.broadcast_radius_km > 0.0) {
            return Err(RequestFlowError::Validation("broadcast radius must be greater than zero".to_string()));
        }
        if draft.lifetime <= chrono::Duration::zero() {
            return Err(RequestFlowError::Validation("broadcast lifetime must be greater than zero".to_string()));
        }
        let request = self.store.insert_instant(draft).await?;
        debug!(
            "🔄️📦️ Instant request {} created for {}, broadcasting {}km until {:?}",
            request.request_id,
            request.current_price,
            request.broadcast_radius_km.unwrap_or_default(),
            request.expires_at
        );
        Ok(request)
    }

    /// Submit a new scheduled request. No radius, no expiry; optionally pinned to a preferred provider.
    pub async fn create_scheduled_request(
        &self,
        draft: NewScheduledRequest,
    ) -> Result<ServiceRequest, RequestFlowError> {
        validate_common(&draft.price, &draft.description, &draft.buyer_location)?;
        if draft.scheduled_time_slot.trim().is_empty() {
            return Err(RequestFlowError::Validation("a scheduled request needs a time slot".to_string()));
        }
        let request = self.store.insert_scheduled(draft).await?;
        debug!("🔄️📦️ Scheduled request {} created for {:?}", request.request_id, request.scheduled_date);
        Ok(request)
    }

    /// Fetch a single request by id, with its full price history.
    pub async fn fetch_request(&self, id: &RequestId) -> Result<ServiceRequest, RequestFlowError> {
        self.store.fetch_request(id).await?.ok_or_else(|| RequestFlowError::NotFound(id.clone()))
    }

    /// Raise the offered price on an open request.
    ///
    /// The new price must exceed the current price and may not exceed three times it. Boosting moves the request
    /// to `PriceBoosted` and appends to the price history, but deliberately does **not** extend the expiry
    /// deadline: the clock keeps the pressure on the buyer.
    pub async fn boost_price(&self, id: &RequestId, new_price: Price) -> Result<ServiceRequest, RequestFlowError> {
        if !new_price.is_positive() {
            return Err(RequestFlowError::Validation(format!("boost price {new_price} must be positive")));
        }
        let request = self.store.try_boost(id, new_price, Utc::now()).await?;
        let old_price = request
            .price_history
            .iter()
            .rev()
            .nth(1)
            .map(|entry| entry.price)
            .unwrap_or(request.initial_price);
        debug!("🔄️💰️ Request {id} boosted from {old_price} to {new_price}");
        self.call_price_boosted_hook(&request, old_price).await;
        Ok(request)
    }

    /// Accept the request on behalf of `provider_id`.
    ///
    /// Exactly-once semantics: if two providers call this concurrently on the same request, one receives the
    /// accepted record and the other a [`RequestFlowError::Conflict`]; there is no silent overwrite and no
    /// partial state. This is the single correctness property the whole broker exists to guarantee.
    pub async fn accept_request(
        &self,
        id: &RequestId,
        provider_id: &str,
    ) -> Result<ServiceRequest, RequestFlowError> {
        let request = self.store.try_accept(id, provider_id, Utc::now()).await?;
        info!("🔄️🤝️ Request {id} accepted by provider {provider_id} at {}", request.current_price);
        self.call_request_accepted_hook(&request).await;
        Ok(request)
    }

    /// Cancel an unfinished request. Legal while the request is open, accepted, or in progress. The acting party
    /// has been authorised upstream; it is recorded in the logs only.
    pub async fn cancel_request(&self, id: &RequestId, actor_id: &str) -> Result<ServiceRequest, RequestFlowError> {
        let request = self.store.try_transition(id, RequestEvent::Cancel, None, Utc::now()).await?;
        info!("🔄️❌️ Request {id} cancelled by {actor_id}");
        Ok(request)
    }

    /// Mark an open instant request as converted to a scheduled one. This only marks the origin record; creating
    /// the successor scheduled request is the caller's job.
    pub async fn convert_to_scheduled(&self, id: &RequestId) -> Result<ServiceRequest, RequestFlowError> {
        let request = self.store.try_transition(id, RequestEvent::Convert, None, Utc::now()).await?;
        info!("🔄️📅️ Request {id} marked as converted to a scheduled request");
        Ok(request)
    }

    /// The accepting provider starts the work.
    pub async fn start_work(&self, id: &RequestId, provider_id: &str) -> Result<ServiceRequest, RequestFlowError> {
        let request = self.store.try_transition(id, RequestEvent::Start, Some(provider_id), Utc::now()).await?;
        debug!("🔄️🔧️ Provider {provider_id} started work on request {id}");
        Ok(request)
    }

    /// The accepting provider finishes the work.
    pub async fn complete_request(
        &self,
        id: &RequestId,
        provider_id: &str,
    ) -> Result<ServiceRequest, RequestFlowError> {
        let request = self.store.try_transition(id, RequestEvent::Complete, Some(provider_id), Utc::now()).await?;
        info!("🔄️✅️ Provider {provider_id} completed request {id}");
        Ok(request)
    }

    /// The polling broadcast feed for one provider.
    ///
    /// Returns the open instant requests whose category the provider serves and whose buyer broadcast radius
    /// covers the provider's location. Requests past their deadline are withheld even if the expiry sweep has not
    /// caught them yet. No per-provider state is kept; callers simply poll.
    pub async fn feed(
        &self,
        filter: &ProviderFilter,
        order: FeedOrder,
    ) -> Result<Vec<ServiceRequest>, RequestFlowError> {
        let now = Utc::now();
        let pool = self.store.fetch_open_instant().await?;
        let live: Vec<ServiceRequest> = pool.into_iter().filter(|r| !r.is_past_deadline(now)).collect();
        let feed = matcher::assemble_feed(filter, order, live);
        trace!("🔄️📡️ Feed assembled: {} visible requests", feed.len());
        Ok(feed)
    }

    async fn call_request_accepted_hook(&self, request: &ServiceRequest) {
        for emitter in &self.producers.request_accepted_producer {
            debug!("🔄️🤝️ Notifying request-accepted hook subscribers");
            let event = RequestAcceptedEvent::new(request.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_price_boosted_hook(&self, request: &ServiceRequest, old_price: Price) {
        for emitter in &self.producers.price_boosted_producer {
            debug!("🔄️💰️ Notifying price-boosted hook subscribers");
            let event = PriceBoostedEvent::new(request.clone(), old_price);
            emitter.publish_event(event).await;
        }
    }

    pub fn store(&self) -> &B {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut B {
        &mut self.store
    }
}

fn validate_common(price: &Price, description: &str, location: &Location) -> Result<(), RequestFlowError> {
    if !price.is_positive() {
        return Err(RequestFlowError::Validation(format!("price {price} must be positive")));
    }
    if description.trim().len() < MIN_DESCRIPTION_LEN {
        return Err(RequestFlowError::Validation(format!(
            "description must be at least {MIN_DESCRIPTION_LEN} characters"
        )));
    }
    if location.address.trim().is_empty() {
        return Err(RequestFlowError::Validation("a request needs a location address".to_string()));
    }
    Ok(())
}
