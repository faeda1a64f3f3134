//! `SqliteStore` is the concrete SQLite-backed request store.
//!
//! Every mutation is a single conditional UPDATE whose WHERE clause carries the transition's preconditions, so the
//! per-request serialization the acceptance arbiter depends on comes from the database itself: at most one racing
//! caller matches the row. When a write does not land, the request is re-fetched once to classify the failure into
//! the engine's error taxonomy.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use jobcast_common::Price;
use log::debug;
use sqlx::SqlitePool;

use super::db::{self, price_history, requests};
use crate::{
    db_types::{NewInstantRequest, NewScheduledRequest, RequestId, RequestStatus, ServiceRequest},
    status::{self, RequestEvent},
    traits::{RequestFlowError, RequestStore},
};

#[derive(Clone)]
pub struct SqliteStore {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteStore ({:?})", self.pool)
    }
}

impl SqliteStore {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = db::new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn attach_history(&self, mut request: ServiceRequest) -> Result<ServiceRequest, RequestFlowError> {
        let mut conn = self.pool.acquire().await?;
        request.price_history = price_history::history_for(&request.request_id, &mut conn).await?;
        Ok(request)
    }

    /// Re-fetches the row after a failed accept write and names the reason the caller lost.
    async fn classify_accept_failure(&self, id: &RequestId, now: DateTime<Utc>) -> RequestFlowError {
        let mut conn = match self.pool.acquire().await {
            Ok(conn) => conn,
            Err(e) => return e.into(),
        };
        match requests::fetch_request_by_id(id, &mut conn).await {
            Err(e) => e.into(),
            Ok(None) => RequestFlowError::NotFound(id.clone()),
            Ok(Some(request)) => {
                if request.status == RequestStatus::Expired {
                    RequestFlowError::Expired(id.clone())
                } else if !request.status.is_open() {
                    // Already accepted, or otherwise finalised, by someone else.
                    RequestFlowError::Conflict(id.clone())
                } else if request.is_past_deadline(now) {
                    // Still open but past the deadline; the sweep just hasn't caught it yet.
                    RequestFlowError::Expired(id.clone())
                } else {
                    // The only remaining predicate is the preferred-seller pin.
                    RequestFlowError::ReservedForPreferredSeller(id.clone())
                }
            },
        }
    }

    async fn classify_boost_failure(&self, id: &RequestId, new_price: Price) -> RequestFlowError {
        let mut conn = match self.pool.acquire().await {
            Ok(conn) => conn,
            Err(e) => return e.into(),
        };
        match requests::fetch_request_by_id(id, &mut conn).await {
            Err(e) => e.into(),
            Ok(None) => RequestFlowError::NotFound(id.clone()),
            Ok(Some(request)) if !request.status.is_open() => {
                RequestFlowError::IllegalTransition { status: request.status, event: RequestEvent::Boost }
            },
            Ok(Some(request)) => RequestFlowError::Validation(format!(
                "boost price {new_price} must exceed the current price {} and may not exceed {}",
                request.current_price,
                request.current_price * 3
            )),
        }
    }

    async fn classify_transition_failure(
        &self,
        id: &RequestId,
        event: RequestEvent,
        actor: Option<&str>,
    ) -> RequestFlowError {
        let mut conn = match self.pool.acquire().await {
            Ok(conn) => conn,
            Err(e) => return e.into(),
        };
        match requests::fetch_request_by_id(id, &mut conn).await {
            Err(e) => e.into(),
            Ok(None) => RequestFlowError::NotFound(id.clone()),
            Ok(Some(request)) => {
                let legal_source = status::sources(event).contains(&request.status);
                if legal_source && request.accepted_by.as_deref() != actor {
                    RequestFlowError::Validation(format!(
                        "only the provider that accepted request {id} may fire {event}"
                    ))
                } else {
                    RequestFlowError::IllegalTransition { status: request.status, event }
                }
            },
        }
    }
}

impl RequestStore for SqliteStore {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_instant(&self, draft: NewInstantRequest) -> Result<ServiceRequest, RequestFlowError> {
        let mut tx = self.pool.begin().await?;
        let mut request = requests::insert_instant(draft, &mut tx).await?;
        let opening =
            price_history::append(&request.request_id, request.initial_price, request.created_at, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Request {} has been saved with internal id {}", request.request_id, request.id);
        request.price_history = vec![opening];
        Ok(request)
    }

    async fn insert_scheduled(&self, draft: NewScheduledRequest) -> Result<ServiceRequest, RequestFlowError> {
        let mut tx = self.pool.begin().await?;
        let mut request = requests::insert_scheduled(draft, &mut tx).await?;
        let opening =
            price_history::append(&request.request_id, request.initial_price, request.created_at, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Request {} has been saved with internal id {}", request.request_id, request.id);
        request.price_history = vec![opening];
        Ok(request)
    }

    async fn fetch_request(&self, id: &RequestId) -> Result<Option<ServiceRequest>, RequestFlowError> {
        let mut conn = self.pool.acquire().await?;
        let request = requests::fetch_request_by_id(id, &mut conn).await?;
        match request {
            Some(mut request) => {
                request.price_history = price_history::history_for(id, &mut conn).await?;
                Ok(Some(request))
            },
            None => Ok(None),
        }
    }

    async fn fetch_by_status(&self, status: RequestStatus) -> Result<Vec<ServiceRequest>, RequestFlowError> {
        let mut conn = self.pool.acquire().await?;
        let mut result = requests::fetch_by_status(status, &mut conn).await?;
        for request in &mut result {
            request.price_history = price_history::history_for(&request.request_id, &mut conn).await?;
        }
        Ok(result)
    }

    async fn fetch_open_instant(&self) -> Result<Vec<ServiceRequest>, RequestFlowError> {
        let mut conn = self.pool.acquire().await?;
        let mut result = requests::fetch_open_instant(&mut conn).await?;
        for request in &mut result {
            request.price_history = price_history::history_for(&request.request_id, &mut conn).await?;
        }
        Ok(result)
    }

    async fn try_accept(
        &self,
        id: &RequestId,
        provider_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ServiceRequest, RequestFlowError> {
        let mut conn = self.pool.acquire().await?;
        let won = requests::try_accept(id, provider_id, now, &mut conn).await?;
        drop(conn);
        match won {
            Some(request) => {
                debug!("🗃️ Request {id} accepted by provider {provider_id}");
                self.attach_history(request).await
            },
            None => Err(self.classify_accept_failure(id, now).await),
        }
    }

    async fn try_boost(
        &self,
        id: &RequestId,
        new_price: Price,
        now: DateTime<Utc>,
    ) -> Result<ServiceRequest, RequestFlowError> {
        let mut tx = self.pool.begin().await?;
        let boosted = requests::try_boost(id, new_price, now, &mut tx).await?;
        match boosted {
            Some(request) => {
                price_history::append(id, new_price, now, &mut tx).await?;
                tx.commit().await?;
                debug!("🗃️ Request {id} price boosted to {new_price}");
                self.attach_history(request).await
            },
            None => {
                tx.rollback().await?;
                Err(self.classify_boost_failure(id, new_price).await)
            },
        }
    }

    async fn try_transition(
        &self,
        id: &RequestId,
        event: RequestEvent,
        actor: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ServiceRequest, RequestFlowError> {
        let mut conn = self.pool.acquire().await?;
        let moved = requests::try_transition(id, event, actor, now, &mut conn).await?;
        drop(conn);
        match moved {
            Some(request) => {
                debug!("🗃️ Request {id} moved to {} via {event}", request.status);
                self.attach_history(request).await
            },
            None => Err(self.classify_transition_failure(id, event, actor).await),
        }
    }

    async fn expire_due(&self, now: DateTime<Utc>) -> Result<Vec<ServiceRequest>, RequestFlowError> {
        let mut conn = self.pool.acquire().await?;
        let mut expired = requests::expire_due(now, &mut conn).await?;
        for request in &mut expired {
            request.price_history = price_history::history_for(&request.request_id, &mut conn).await?;
        }
        Ok(expired)
    }

    async fn close(&mut self) -> Result<(), RequestFlowError> {
        self.pool.close().await;
        Ok(())
    }
}
