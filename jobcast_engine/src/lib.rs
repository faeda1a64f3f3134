//! Jobcast Engine
//!
//! The engine brokers short-lived, geographically-scoped service requests between buyers and a pool of providers.
//! A buyer posts a job with an offered price and a broadcast radius; nearby providers poll the feed; exactly one
//! provider may accept; an unaccepted instant request expires at its deadline, after which the buyer typically
//! converts it into a scheduled request.
//!
//! The library is divided into three main sections:
//! 1. Storage ([`mod@sqlite`] behind the [`traits::RequestStore`] contract). The store owns the canonical request
//!    records, and every mutation is a conditional write carrying the transition's preconditions; that is where
//!    the single-winner acceptance guarantee comes from. SQLite is the shipped backend.
//! 2. The broker public API ([`RequestFlowApi`]): create, boost, accept, cancel, convert, and the polling
//!    broadcast feed. Ancillary pure modules back it: [`mod@geo`] (Haversine distances), [`mod@status`] (the
//!    transition table every path consults) and [`mod@matcher`] (per-provider feed visibility).
//! 3. Events ([`mod@events`]) and the background expiry sweep ([`mod@expiry`]). Hooks fire on acceptance, price
//!    boosts, and expiry so that notification layers can react without the core knowing about them.
mod broker_api;
mod traits;

pub mod db_types;
pub mod events;
pub mod geo;
pub mod matcher;
pub mod status;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub mod expiry;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
#[cfg(feature = "sqlite")]
pub use sqlite::db;

pub use broker_api::RequestFlowApi;
pub use broker_api::request_flow_api::MIN_DESCRIPTION_LEN;
pub use traits::{RequestFlowError, RequestStore};
