use chrono::{DateTime, Utc};
use jobcast_common::Price;
use sqlx::{sqlite::SqliteRow, FromRow, Row, SqliteConnection};

use crate::db_types::{PriceHistoryEntry, RequestId};

impl FromRow<'_, SqliteRow> for PriceHistoryEntry {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(PriceHistoryEntry {
            price: Price::from(row.try_get::<i64, _>("price")?),
            timestamp: row.try_get("timestamp")?,
        })
    }
}

/// Appends one entry to the request's price trajectory. The table is append-only; monotonicity is enforced by the
/// conditional update on the `requests` row that shares the transaction with this insert.
pub async fn append(
    request_id: &RequestId,
    price: Price,
    timestamp: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<PriceHistoryEntry, sqlx::Error> {
    let entry = sqlx::query_as(
        r#"
            INSERT INTO price_history (request_id, price, timestamp)
            VALUES ($1, $2, $3)
            RETURNING price, timestamp;
        "#,
    )
    .bind(request_id.as_str())
    .bind(price.value())
    .bind(timestamp)
    .fetch_one(conn)
    .await?;
    Ok(entry)
}

/// The full price trajectory for a request, in append order.
pub async fn history_for(
    request_id: &RequestId,
    conn: &mut SqliteConnection,
) -> Result<Vec<PriceHistoryEntry>, sqlx::Error> {
    let entries = sqlx::query_as("SELECT price, timestamp FROM price_history WHERE request_id = $1 ORDER BY id")
        .bind(request_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(entries)
}
