//! The status state machine for service requests.
//!
//! Every mutation path in the engine funnels through this table. The legal transitions are:
//!
//! | From \ Event          | Boost        | Accept   | Cancel    | Expire  | Convert              | Start      | Complete  |
//! |-----------------------|--------------|----------|-----------|---------|----------------------|------------|-----------|
//! | Pending               | PriceBoosted | Accepted | Cancelled | Expired | ConvertedToScheduled | Err        | Err       |
//! | PriceBoosted          | PriceBoosted | Accepted | Cancelled | Expired | ConvertedToScheduled | Err        | Err       |
//! | Accepted              | Err          | Err      | Cancelled | Err     | Err                  | InProgress | Err       |
//! | InProgress            | Err          | Err      | Cancelled | Err     | Err                  | Err        | Completed |
//! | Completed             | Err          | Err      | Err       | Err     | Err                  | Err        | Err       |
//! | Cancelled             | Err          | Err      | Err       | Err     | Err                  | Err        | Err       |
//! | Expired               | Err          | Err      | Err       | Err     | Err                  | Err        | Err       |
//! | ConvertedToScheduled  | Err          | Err      | Err       | Err     | Err                  | Err        | Err       |
//!
//! Any pair not listed fails closed with [`RequestFlowError::IllegalTransition`] rather than silently no-opping, so
//! that callers can tell an "already in that state" bug apart from a legitimate idempotent retry.

use std::fmt::Display;

use crate::{db_types::RequestStatus, traits::RequestFlowError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestEvent {
    /// The buyer raises the offered price.
    Boost,
    /// A provider claims the request.
    Accept,
    /// The buyer or an admin cancels the request.
    Cancel,
    /// The instant broadcast window lapsed.
    Expire,
    /// The buyer converts the instant request into a scheduled one.
    Convert,
    /// The accepting provider starts the work.
    Start,
    /// The accepting provider finishes the work.
    Complete,
}

impl Display for RequestEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RequestEvent::Boost => "Boost",
            RequestEvent::Accept => "Accept",
            RequestEvent::Cancel => "Cancel",
            RequestEvent::Expire => "Expire",
            RequestEvent::Convert => "Convert",
            RequestEvent::Start => "Start",
            RequestEvent::Complete => "Complete",
        };
        write!(f, "{s}")
    }
}

/// The states an event may legally fire from. Store implementations build their conditional-update predicates from
/// this list, so the table here stays the single authority on what is allowed.
pub fn sources(event: RequestEvent) -> &'static [RequestStatus] {
    use RequestStatus::*;
    match event {
        RequestEvent::Boost | RequestEvent::Accept | RequestEvent::Expire | RequestEvent::Convert => {
            &[Pending, PriceBoosted]
        },
        RequestEvent::Cancel => &[Pending, PriceBoosted, Accepted, InProgress],
        RequestEvent::Start => &[Accepted],
        RequestEvent::Complete => &[InProgress],
    }
}

/// The status an event lands in when it fires from a legal source.
pub fn target_status(event: RequestEvent) -> RequestStatus {
    match event {
        RequestEvent::Boost => RequestStatus::PriceBoosted,
        RequestEvent::Accept => RequestStatus::Accepted,
        RequestEvent::Cancel => RequestStatus::Cancelled,
        RequestEvent::Expire => RequestStatus::Expired,
        RequestEvent::Convert => RequestStatus::ConvertedToScheduled,
        RequestEvent::Start => RequestStatus::InProgress,
        RequestEvent::Complete => RequestStatus::Completed,
    }
}

/// Resolves the successor status for `event` fired from `current`, or fails closed.
pub fn next_status(current: RequestStatus, event: RequestEvent) -> Result<RequestStatus, RequestFlowError> {
    if !sources(event).contains(&current) {
        return Err(RequestFlowError::IllegalTransition { status: current, event });
    }
    Ok(target_status(event))
}
