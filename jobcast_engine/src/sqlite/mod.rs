//! SQLite request store.
//!
//! `SqliteStore` is the shipped [`crate::traits::RequestStore`] backend. The broker's scale is human (minutes-long
//! deadlines, a provider pool you could fit in a room), so a single SQLite file with conditional updates gives all
//! the serialization the acceptance arbiter needs.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteStore;
