use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use jobcast_common::Price;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(String);

//--------------------------------------      RequestId      ---------------------------------------------------------
/// An opaque, unique identifier for a service request, assigned at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Generates a fresh random id. Uniqueness comes from 64 bits of randomness, which is ample at the scale of a
    /// human-driven request pool.
    pub fn random() -> Self {
        Self(format!("req-{:016x}", rand::random::<u64>()))
    }
}

impl FromStr for RequestId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------     RequestType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    /// Broadcast to nearby providers for a bounded time window, expiring if unaccepted.
    Instant,
    /// Bound to a future date and time slot. No broadcast radius, no expiry.
    Scheduled,
}

impl Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestType::Instant => write!(f, "Instant"),
            RequestType::Scheduled => write!(f, "Scheduled"),
        }
    }
}

impl FromStr for RequestType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Instant" => Ok(Self::Instant),
            "Scheduled" => Ok(Self::Scheduled),
            s => Err(ConversionError(format!("Invalid request type: {s}"))),
        }
    }
}

//--------------------------------------    RequestStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Newly created; open for acceptance and price boosts.
    Pending,
    /// The buyer has raised the price at least once. Still open for acceptance.
    PriceBoosted,
    /// Exactly one provider has accepted the request.
    Accepted,
    /// The accepting provider has started the work.
    InProgress,
    /// The work is done. Terminal.
    Completed,
    /// Cancelled by the buyer or an admin. Terminal.
    Cancelled,
    /// The instant broadcast window lapsed with no acceptance. Terminal.
    Expired,
    /// The origin record of an instant request that was converted into a scheduled one. Terminal for this record;
    /// the successor scheduled request is created by the caller.
    ConvertedToScheduled,
}

impl RequestStatus {
    /// Open requests are visible in the broadcast feed and may still be accepted or boosted.
    pub fn is_open(&self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::PriceBoosted)
    }

    /// The statuses in which a request is still broadcast and mutable by buyers/providers.
    pub fn open_statuses() -> &'static [RequestStatus] {
        &[RequestStatus::Pending, RequestStatus::PriceBoosted]
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Completed
                | RequestStatus::Cancelled
                | RequestStatus::Expired
                | RequestStatus::ConvertedToScheduled
        )
    }
}

impl Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStatus::Pending => write!(f, "Pending"),
            RequestStatus::PriceBoosted => write!(f, "PriceBoosted"),
            RequestStatus::Accepted => write!(f, "Accepted"),
            RequestStatus::InProgress => write!(f, "InProgress"),
            RequestStatus::Completed => write!(f, "Completed"),
            RequestStatus::Cancelled => write!(f, "Cancelled"),
            RequestStatus::Expired => write!(f, "Expired"),
            RequestStatus::ConvertedToScheduled => write!(f, "ConvertedToScheduled"),
        }
    }
}

impl FromStr for RequestStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "PriceBoosted" => Ok(Self::PriceBoosted),
            "Accepted" => Ok(Self::Accepted),
            "InProgress" => Ok(Self::InProgress),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            "Expired" => Ok(Self::Expired),
            "ConvertedToScheduled" => Ok(Self::ConvertedToScheduled),
            s => Err(ConversionError(format!("Invalid request status: {s}"))),
        }
    }
}

//--------------------------------------      Location       ---------------------------------------------------------
/// A geographic point with a human-readable address. Immutable once attached to a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
}

impl Location {
    pub fn new(lat: f64, lng: f64, address: impl Into<String>) -> Self {
        Self { lat, lng, address: address.into() }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:.4}, {:.4})", self.address, self.lat, self.lng)
    }
}

//--------------------------------------  PriceHistoryEntry  ---------------------------------------------------------
/// One step of a request's price trajectory. The history is append-only, chronological, and strictly increasing in
/// price; the first entry is the immutable initial price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceHistoryEntry {
    pub price: Price,
    pub timestamp: DateTime<Utc>,
}

//--------------------------------------    ServiceRequest   ---------------------------------------------------------
/// The canonical service request record. Only the request store may mutate one of these; everything handed to
/// callers is a read-only snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: i64,
    pub request_id: RequestId,
    pub buyer_id: String,
    pub buyer_location: Location,
    pub category_id: String,
    pub category_name: String,
    pub description: String,
    pub request_type: RequestType,
    pub initial_price: Price,
    pub current_price: Price,
    pub price_history: Vec<PriceHistoryEntry>,
    /// Instant only: how far (km) the buyer chose to broadcast.
    pub broadcast_radius_km: Option<f64>,
    /// Instant only: the moment the broadcast window closes.
    pub expires_at: Option<DateTime<Utc>>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub scheduled_time_slot: Option<String>,
    pub preferred_seller_id: Option<String>,
    pub accepted_by: Option<String>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceRequest {
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// True for an instant request whose deadline has passed, whether or not the expiry sweep has caught it yet.
    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|t| now >= t).unwrap_or(false)
    }
}

//--------------------------------------  NewInstantRequest  ---------------------------------------------------------
/// Draft for an instant request. The broadcast window is given as a lifetime; the store stamps the absolute
/// `expires_at` at insertion time.
#[derive(Debug, Clone)]
pub struct NewInstantRequest {
    pub buyer_id: String,
    pub buyer_location: Location,
    pub category_id: String,
    pub category_name: String,
    pub description: String,
    pub price: Price,
    pub broadcast_radius_km: f64,
    pub lifetime: Duration,
}

impl NewInstantRequest {
    pub fn new(
        buyer_id: impl Into<String>,
        buyer_location: Location,
        category_name: impl Into<String>,
        price: Price,
        broadcast_radius_km: f64,
        lifetime: Duration,
    ) -> Self {
        let category_name = category_name.into();
        Self {
            buyer_id: buyer_id.into(),
            buyer_location,
            category_id: category_name.to_lowercase().replace(' ', "-"),
            category_name,
            description: String::new(),
            price,
            broadcast_radius_km,
            lifetime,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category_id(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = category_id.into();
        self
    }
}

//-------------------------------------- NewScheduledRequest ---------------------------------------------------------
/// Draft for a scheduled request. No radius and no expiry; optionally pinned to a preferred provider.
#[derive(Debug, Clone)]
pub struct NewScheduledRequest {
    pub buyer_id: String,
    pub buyer_location: Location,
    pub category_id: String,
    pub category_name: String,
    pub description: String,
    pub price: Price,
    pub scheduled_date: DateTime<Utc>,
    pub scheduled_time_slot: String,
    pub preferred_seller_id: Option<String>,
}

impl NewScheduledRequest {
    pub fn new(
        buyer_id: impl Into<String>,
        buyer_location: Location,
        category_name: impl Into<String>,
        price: Price,
        scheduled_date: DateTime<Utc>,
        scheduled_time_slot: impl Into<String>,
    ) -> Self {
        let category_name = category_name.into();
        Self {
            buyer_id: buyer_id.into(),
            buyer_location,
            category_id: category_name.to_lowercase().replace(' ', "-"),
            category_name,
            description: String::new(),
            price,
            scheduled_date,
            scheduled_time_slot: scheduled_time_slot.into(),
            preferred_seller_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_preferred_seller(mut self, seller_id: impl Into<String>) -> Self {
        self.preferred_seller_id = Some(seller_id.into());
        self
    }
}
