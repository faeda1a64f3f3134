use jobcast_common::Price;
use serde::{Deserialize, Serialize};

use crate::db_types::ServiceRequest;

/// Fired when a provider wins the acceptance race for a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestAcceptedEvent {
    pub request: ServiceRequest,
    pub provider_id: String,
}

impl RequestAcceptedEvent {
    pub fn new(request: ServiceRequest) -> Self {
        let provider_id = request.accepted_by.clone().unwrap_or_default();
        Self { request, provider_id }
    }
}

/// Fired when a buyer raises the offered price on an open request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBoostedEvent {
    pub request: ServiceRequest,
    pub old_price: Price,
    pub new_price: Price,
}

impl PriceBoostedEvent {
    pub fn new(request: ServiceRequest, old_price: Price) -> Self {
        let new_price = request.current_price;
        Self { request, old_price, new_price }
    }
}

/// Fired by the expiry sweep for each instant request whose broadcast window lapsed unaccepted. The buyer-facing
/// layer typically reacts by offering conversion to a scheduled request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestExpiredEvent {
    pub request: ServiceRequest,
}

impl RequestExpiredEvent {
    pub fn new(request: ServiceRequest) -> Self {
        Self { request }
    }
}

#[derive(Debug, Clone)]
pub enum RequestEventType {
    Accepted(RequestAcceptedEvent),
    PriceBoosted(PriceBoostedEvent),
    Expired(RequestExpiredEvent),
}
