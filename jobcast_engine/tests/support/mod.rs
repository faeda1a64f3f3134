#![allow(dead_code)]
pub mod prepare_env;

use chrono::Duration;
use jobcast_common::Price;
use jobcast_engine::{
    db_types::{Location, NewInstantRequest},
    events::EventProducers,
    RequestFlowApi,
    RequestStore,
    SqliteStore,
};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use prepare_env::{prepare_test_env, random_db_path};

pub async fn setup() -> RequestFlowApi<SqliteStore> {
    setup_with_producers(EventProducers::default()).await
}

pub async fn setup_with_producers(producers: EventProducers) -> RequestFlowApi<SqliteStore> {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let store = SqliteStore::new_with_url(&url, 5).await.expect("Error creating database");
    RequestFlowApi::new(store, producers)
}

pub async fn tear_down(mut api: RequestFlowApi<SqliteStore>) {
    let url = api.store().url().to_string();
    if let Err(e) = api.store_mut().close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    Sqlite::drop_database(&url).await.unwrap();
}

pub fn lower_manhattan() -> Location {
    Location::new(40.7128, -74.0060, "12 Fulton St, New York")
}

pub fn times_square() -> Location {
    Location::new(40.7580, -73.9855, "Times Square, New York")
}

/// A plumbing job at $150, broadcast 10 km for 60 minutes, matching the canonical scenario used across the tests.
pub fn plumbing_draft() -> NewInstantRequest {
    NewInstantRequest::new(
        "buyer-alice",
        lower_manhattan(),
        "Plumbing",
        Price::from_major(150),
        10.0,
        Duration::minutes(60),
    )
    .with_description("Leaky kitchen tap needs fixing today")
}
