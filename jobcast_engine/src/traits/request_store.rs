use chrono::{DateTime, Utc};
use jobcast_common::Price;
use thiserror::Error;

use crate::{
    db_types::{NewInstantRequest, NewScheduledRequest, RequestId, RequestStatus, ServiceRequest},
    status::RequestEvent,
};

/// The storage contract for the request broker.
///
/// The store is the single owner of canonical [`ServiceRequest`] records. Every mutating method is a conditional
/// write: the legal source statuses for the transition (taken from [`crate::status::sources`]) are part of the
/// write predicate, so two callers racing on the same request cannot both observe the precondition as true and
/// both succeed. Implementations must return [`RequestFlowError::Conflict`] to the loser, never overwrite silently.
///
/// Readers (`fetch_*`) run against plain snapshots. A feed may briefly show a request that another provider has
/// just accepted; that staleness is resolved by the accept call returning `Conflict`, not by blocking readers.
#[allow(async_fn_in_trait)]
pub trait RequestStore: Clone {
    /// The URL of the backing database.
    fn url(&self) -> &str;

    /// Inserts a validated instant request draft with `Pending` status, stamping `created_at`, the absolute
    /// `expires_at` deadline, and the opening price-history entry in one atomic write.
    async fn insert_instant(&self, draft: NewInstantRequest) -> Result<ServiceRequest, RequestFlowError>;

    /// Inserts a validated scheduled request draft with `Pending` status and its opening price-history entry.
    async fn insert_scheduled(&self, draft: NewScheduledRequest) -> Result<ServiceRequest, RequestFlowError>;

    /// Fetches a request by its public id, with full price history attached.
    async fn fetch_request(&self, id: &RequestId) -> Result<Option<ServiceRequest>, RequestFlowError>;

    /// Read-only snapshot of all requests currently in `status`, ordered by creation time.
    async fn fetch_by_status(&self, status: RequestStatus) -> Result<Vec<ServiceRequest>, RequestFlowError>;

    /// Read-only snapshot of the broadcast pool: instant requests that are still open. The matcher narrows this
    /// set per provider.
    async fn fetch_open_instant(&self) -> Result<Vec<ServiceRequest>, RequestFlowError>;

    /// Atomically claims the request for `provider_id`.
    ///
    /// The write only lands if the request is still open, its deadline (if any) is after `now`, and any preferred
    /// seller pin matches the caller. Exactly one of N concurrent callers wins; the rest get a typed error telling
    /// them why ([`RequestFlowError::Conflict`], [`RequestFlowError::Expired`], ...).
    async fn try_accept(
        &self,
        id: &RequestId,
        provider_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ServiceRequest, RequestFlowError>;

    /// Atomically raises the price to `new_price` and appends the history entry.
    ///
    /// The write predicate requires an open status, `new_price > current_price` and `new_price <= 3 *
    /// current_price`. The expiry deadline is deliberately left untouched.
    async fn try_boost(
        &self,
        id: &RequestId,
        new_price: Price,
        now: DateTime<Utc>,
    ) -> Result<ServiceRequest, RequestFlowError>;

    /// Atomically fires a plain status transition (cancel, convert, start, complete).
    ///
    /// For `Start` and `Complete`, `actor` must be the provider that accepted the request and is part of the write
    /// predicate. For `Cancel` and `Convert` the actor is ignored by the predicate (the caller has already been
    /// authorised upstream).
    async fn try_transition(
        &self,
        id: &RequestId,
        event: RequestEvent,
        actor: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ServiceRequest, RequestFlowError>;

    /// Transitions every open instant request whose deadline is at or before `now` to `Expired`, returning the
    /// expired records. Idempotent: requests already finalised by a concurrent accept are simply not matched.
    async fn expire_due(&self, now: DateTime<Utc>) -> Result<Vec<ServiceRequest>, RequestFlowError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), RequestFlowError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum RequestFlowError {
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("The service request {0} does not exist")]
    NotFound(RequestId),
    #[error("The {event} event is not legal while the request is {status}")]
    IllegalTransition { status: RequestStatus, event: RequestEvent },
    #[error("Request {0} was already finalised by another caller")]
    Conflict(RequestId),
    #[error("Request {0} is reserved for its preferred provider")]
    ReservedForPreferredSeller(RequestId),
    #[error("The broadcast window for request {0} has closed")]
    Expired(RequestId),
    #[error("We have an internal database error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for RequestFlowError {
    fn from(e: sqlx::Error) -> Self {
        RequestFlowError::DatabaseError(e.to_string())
    }
}
