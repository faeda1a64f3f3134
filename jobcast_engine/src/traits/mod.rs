//! Behaviour traits for request store backends, plus the error taxonomy shared across the engine.

mod request_store;

pub use request_store::{RequestFlowError, RequestStore};
