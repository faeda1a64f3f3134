use chrono::{DateTime, Utc};
use jobcast_common::Price;
use log::debug;
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, Row, Sqlite, SqliteConnection};

use crate::{
    db_types::{
        Location,
        NewInstantRequest,
        NewScheduledRequest,
        RequestId,
        RequestStatus,
        RequestType,
        ServiceRequest,
    },
    status::{self, RequestEvent},
    traits::RequestFlowError,
};

/// Reconstitutes a request from its flat row. The price history lives in its own table and is attached by the
/// caller; see [`super::price_history::history_for`].
impl FromRow<'_, SqliteRow> for ServiceRequest {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let status: RequestStatus = row
            .try_get::<String, _>("status")?
            .parse()
            .map_err(|e| sqlx::Error::ColumnDecode { index: "status".to_string(), source: Box::new(e) })?;
        let request_type: RequestType = row
            .try_get::<String, _>("request_type")?
            .parse()
            .map_err(|e| sqlx::Error::ColumnDecode { index: "request_type".to_string(), source: Box::new(e) })?;
        Ok(ServiceRequest {
            id: row.try_get("id")?,
            request_id: RequestId(row.try_get("request_id")?),
            buyer_id: row.try_get("buyer_id")?,
            buyer_location: Location {
                lat: row.try_get("buyer_lat")?,
                lng: row.try_get("buyer_lng")?,
                address: row.try_get("buyer_address")?,
            },
            category_id: row.try_get("category_id")?,
            category_name: row.try_get("category_name")?,
            description: row.try_get("description")?,
            request_type,
            initial_price: Price::from(row.try_get::<i64, _>("initial_price")?),
            current_price: Price::from(row.try_get::<i64, _>("current_price")?),
            price_history: Vec::new(),
            broadcast_radius_km: row.try_get("broadcast_radius_km")?,
            expires_at: row.try_get("expires_at")?,
            scheduled_date: row.try_get("scheduled_date")?,
            scheduled_time_slot: row.try_get("scheduled_time_slot")?,
            preferred_seller_id: row.try_get("preferred_seller_id")?,
            accepted_by: row.try_get("accepted_by")?,
            accepted_at: row.try_get("accepted_at")?,
            status,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Inserts an instant request with `Pending` status, stamping `created_at` and the absolute deadline.
/// This is not atomic with the opening price-history entry on its own; run it inside a transaction and pass
/// `&mut *tx` as the connection argument.
pub async fn insert_instant(
    draft: NewInstantRequest,
    conn: &mut SqliteConnection,
) -> Result<ServiceRequest, RequestFlowError> {
    let now = Utc::now();
    let request_id = RequestId::random();
    let expires_at = now + draft.lifetime;
    let request: ServiceRequest = sqlx::query_as(
        r#"
            INSERT INTO requests (
                request_id,
                buyer_id,
                buyer_lat,
                buyer_lng,
                buyer_address,
                category_id,
                category_name,
                description,
                request_type,
                initial_price,
                current_price,
                broadcast_radius_km,
                expires_at,
                status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'Instant', $9, $9, $10, $11, 'Pending', $12, $12)
            RETURNING *;
        "#,
    )
    .bind(request_id.as_str())
    .bind(draft.buyer_id)
    .bind(draft.buyer_location.lat)
    .bind(draft.buyer_location.lng)
    .bind(draft.buyer_location.address)
    .bind(draft.category_id)
    .bind(draft.category_name)
    .bind(draft.description)
    .bind(draft.price.value())
    .bind(draft.broadcast_radius_km)
    .bind(expires_at)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Instant request [{}] inserted, broadcasting until {expires_at}", request.request_id);
    Ok(request)
}

/// Inserts a scheduled request with `Pending` status. Same transactional caveat as [`insert_instant`].
pub async fn insert_scheduled(
    draft: NewScheduledRequest,
    conn: &mut SqliteConnection,
) -> Result<ServiceRequest, RequestFlowError> {
    let now = Utc::now();
    let request_id = RequestId::random();
    let request: ServiceRequest = sqlx::query_as(
        r#"
            INSERT INTO requests (
                request_id,
                buyer_id,
                buyer_lat,
                buyer_lng,
                buyer_address,
                category_id,
                category_name,
                description,
                request_type,
                initial_price,
                current_price,
                scheduled_date,
                scheduled_time_slot,
                preferred_seller_id,
                status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'Scheduled', $9, $9, $10, $11, $12, 'Pending', $13, $13)
            RETURNING *;
        "#,
    )
    .bind(request_id.as_str())
    .bind(draft.buyer_id)
    .bind(draft.buyer_location.lat)
    .bind(draft.buyer_location.lng)
    .bind(draft.buyer_location.address)
    .bind(draft.category_id)
    .bind(draft.category_name)
    .bind(draft.description)
    .bind(draft.price.value())
    .bind(draft.scheduled_date)
    .bind(draft.scheduled_time_slot)
    .bind(draft.preferred_seller_id)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Scheduled request [{}] inserted for {:?}", request.request_id, request.scheduled_date);
    Ok(request)
}

pub async fn fetch_request_by_id(
    id: &RequestId,
    conn: &mut SqliteConnection,
) -> Result<Option<ServiceRequest>, sqlx::Error> {
    let request =
        sqlx::query_as("SELECT * FROM requests WHERE request_id = $1").bind(id.as_str()).fetch_optional(conn).await?;
    Ok(request)
}

/// All requests currently in `status`, in creation order.
pub async fn fetch_by_status(
    status: RequestStatus,
    conn: &mut SqliteConnection,
) -> Result<Vec<ServiceRequest>, sqlx::Error> {
    let requests = sqlx::query_as("SELECT * FROM requests WHERE status = $1 ORDER BY id")
        .bind(status.to_string())
        .fetch_all(conn)
        .await?;
    Ok(requests)
}

/// The broadcast pool: open instant requests in creation order.
pub async fn fetch_open_instant(conn: &mut SqliteConnection) -> Result<Vec<ServiceRequest>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM requests WHERE request_type = 'Instant'");
    push_status_predicate(&mut builder, RequestStatus::open_statuses());
    builder.push(" ORDER BY id");
    let requests = builder.build_query_as().fetch_all(conn).await?;
    Ok(requests)
}

/// Appends `AND status IN (...)` to the builder from the given status list.
fn push_status_predicate(builder: &mut QueryBuilder<'_, Sqlite>, statuses: &[RequestStatus]) {
    builder.push(" AND status IN (");
    let mut clause = builder.separated(", ");
    for status in statuses {
        clause.push_bind(status.to_string());
    }
    builder.push(")");
}

/// The single-winner acceptance write. All preconditions ride in the WHERE clause, so the update is atomic: at most
/// one of N racing callers matches the row. `None` means the write did not land; the caller classifies why.
pub async fn try_accept(
    id: &RequestId,
    provider_id: &str,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<ServiceRequest>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE requests SET status = ");
    builder.push_bind(status::target_status(RequestEvent::Accept).to_string());
    builder.push(", accepted_by = ");
    builder.push_bind(provider_id);
    builder.push(", accepted_at = ");
    builder.push_bind(now);
    builder.push(", updated_at = ");
    builder.push_bind(now);
    builder.push(" WHERE request_id = ");
    builder.push_bind(id.as_str());
    push_status_predicate(&mut builder, status::sources(RequestEvent::Accept));
    builder.push(" AND (expires_at IS NULL OR expires_at > ");
    builder.push_bind(now);
    builder.push(") AND (preferred_seller_id IS NULL OR preferred_seller_id = ");
    builder.push_bind(provider_id);
    builder.push(") RETURNING *");
    let request = builder.build_query_as().fetch_optional(conn).await?;
    Ok(request)
}

/// The price escalation write. The range checks (`new > current`, `new <= 3 * current`) ride in the WHERE clause
/// alongside the open-status predicate. The expiry deadline is deliberately not touched. Run inside the same
/// transaction as the history append.
pub async fn try_boost(
    id: &RequestId,
    new_price: Price,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<ServiceRequest>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE requests SET status = ");
    builder.push_bind(status::target_status(RequestEvent::Boost).to_string());
    builder.push(", current_price = ");
    builder.push_bind(new_price.value());
    builder.push(", updated_at = ");
    builder.push_bind(now);
    builder.push(" WHERE request_id = ");
    builder.push_bind(id.as_str());
    push_status_predicate(&mut builder, status::sources(RequestEvent::Boost));
    builder.push(" AND current_price < ");
    builder.push_bind(new_price.value());
    builder.push(" AND ");
    builder.push_bind(new_price.value());
    builder.push(" <= current_price * 3 RETURNING *");
    let request = builder.build_query_as().fetch_optional(conn).await?;
    Ok(request)
}

/// A plain status transition (cancel, convert, start, complete). For the fulfilment events the actor predicate
/// restricts the write to the provider that accepted the request. Cancelling releases any provider claim, so a
/// cancelled record never carries `accepted_by`/`accepted_at`.
pub async fn try_transition(
    id: &RequestId,
    event: RequestEvent,
    actor: Option<&str>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<ServiceRequest>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE requests SET status = ");
    builder.push_bind(status::target_status(event).to_string());
    builder.push(", updated_at = ");
    builder.push_bind(now);
    if matches!(event, RequestEvent::Cancel) {
        builder.push(", accepted_by = NULL, accepted_at = NULL");
    }
    builder.push(" WHERE request_id = ");
    builder.push_bind(id.as_str());
    push_status_predicate(&mut builder, status::sources(event));
    if matches!(event, RequestEvent::Start | RequestEvent::Complete) {
        builder.push(" AND accepted_by = ");
        builder.push_bind(actor.unwrap_or_default().to_string());
    }
    builder.push(" RETURNING *");
    let request = builder.build_query_as().fetch_optional(conn).await?;
    Ok(request)
}

/// The expiry sweep: one set-based conditional update moves every open instant request whose deadline has passed
/// to `Expired`. Requests finalised by a concurrent accept no longer match the predicate, which is what makes the
/// sweep idempotent.
pub async fn expire_due(
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<ServiceRequest>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE requests SET status = ");
    builder.push_bind(status::target_status(RequestEvent::Expire).to_string());
    builder.push(", updated_at = ");
    builder.push_bind(now);
    builder.push(" WHERE request_type = 'Instant'");
    push_status_predicate(&mut builder, status::sources(RequestEvent::Expire));
    builder.push(" AND expires_at <= ");
    builder.push_bind(now);
    builder.push(" RETURNING *");
    let requests = builder.build_query_as().fetch_all(conn).await?;
    Ok(requests)
}
