//! The expiry sweep worker.
//!
//! A background task that periodically moves lapsed open instant requests to `Expired` and publishes a
//! [`RequestExpiredEvent`] for each. The sweep itself is one set-based conditional update (see
//! [`crate::traits::RequestStore::expire_due`]), so firing while a concurrent accept finalises a request is
//! harmless: the accepted request simply no longer matches.
//!
//! Deadlines in this domain are human-scale (minutes to hours), so a periodic scan is plenty; no per-request OS
//! timers are kept, and nothing leaks across a process restart; the next sweep picks up whatever is due.
use std::time::Duration;

use chrono::Utc;
use log::*;
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    db_types::ServiceRequest,
    events::{EventProducers, RequestExpiredEvent},
    traits::RequestStore,
    SqliteStore,
};

/// Controls a running expiry worker. Prefer [`Self::shutdown`] to stop it; dropping the handle also stops the
/// worker, but without waiting for an in-flight sweep.
pub struct ExpiryWorkerHandle {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ExpiryWorkerHandle {
    /// Signals the worker to stop after any in-flight sweep completes, and waits for it to wind down.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.handle.await {
            warn!("🕰️ Expiry worker did not shut down cleanly: {e}");
        }
    }
}

/// Starts the expiry worker, sweeping every `sweep_interval`.
pub fn start_expiry_worker(
    store: SqliteStore,
    producers: EventProducers,
    sweep_interval: Duration,
) -> ExpiryWorkerHandle {
    let (stop, mut stopped) = watch::channel(false);
    let handle = tokio::spawn(async move {
        let mut timer = tokio::time::interval(sweep_interval);
        info!("🕰️ Request expiry worker started, sweeping every {sweep_interval:?}");
        loop {
            tokio::select! {
                _ = timer.tick() => {
                    match store.expire_due(Utc::now()).await {
                        Ok(expired) => {
                            if !expired.is_empty() {
                                info!("🕰️ {} requests expired: {}", expired.len(), request_list(&expired));
                            }
                            publish_expired(&producers, expired).await;
                        },
                        Err(e) => {
                            error!("🕰️ Error running request expiry sweep: {e}");
                        },
                    }
                },
                changed = stopped.changed() => {
                    // A closed channel means the handle was dropped; stop rather than spin.
                    if changed.is_err() || *stopped.borrow() {
                        info!("🕰️ Request expiry worker shutting down");
                        break;
                    }
                },
            }
        }
    });
    ExpiryWorkerHandle { stop, handle }
}

async fn publish_expired(producers: &EventProducers, expired: Vec<ServiceRequest>) {
    for emitter in &producers.request_expired_producer {
        for request in &expired {
            emitter.publish_event(RequestExpiredEvent::new(request.clone())).await;
        }
    }
}

fn request_list(requests: &[ServiceRequest]) -> String {
    requests
        .iter()
        .map(|r| format!("[{}] {} buyer: {}", r.id, r.request_id, r.buyer_id))
        .collect::<Vec<String>>()
        .join(", ")
}
