//! # Worker Registry
//!
//! This module defines the `WorkerRegistry`, the actor that owns the set of
//! busy worker names. It is the "Server" side of the framework: every
//! acquisition, release and listing is a message processed sequentially by a
//! single Tokio task, so the busy set needs no lock.

use crate::client::WorkerClient;
use crate::message::{BusyWorker, WorkerRequest};
use crate::error::FrameworkError;
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Bookkeeping for one granted slot.
#[derive(Debug)]
struct BusyEntry {
    token: u64,
    since: Instant,
}

/// The actor that guarantees at most one running task per worker name.
///
/// # Architecture Note
/// The registry owns the busy map and the receiver end of the channel.
/// Clients and worker guards only hold senders. A name moves `Idle → Busy`
/// when an `Acquire` is granted and back to `Idle` when the matching
/// `Release` arrives; there is no queue, a second `Acquire` for a busy name
/// is rejected with [`FrameworkError::WorkerBusy`] immediately.
///
/// # Usage Pattern
///
/// ```rust
/// use worker_framework::{FrameworkError, WorkerRegistry};
///
/// #[tokio::main]
/// async fn main() {
///     let (registry, client) = WorkerRegistry::new();
///     tokio::spawn(registry.run());
///
///     let worker = client.acquire("worker-m1").await.unwrap();
///     let second = client.acquire("worker-m1").await;
///     assert!(matches!(second, Err(FrameworkError::WorkerBusy(_))));
///
///     // Running the task releases the slot once it completes.
///     worker.run(async { Ok::<(), String>(()) }).await.unwrap();
///     assert!(client.acquire("worker-m1").await.is_ok());
/// }
/// ```
///
/// # Shutdown
///
/// The loop exits once every sender is gone. Worker guards hold a sender
/// too, so a registry whose clients were dropped keeps running until the
/// in-flight tasks have finished and released their slots.
pub struct WorkerRegistry {
    receiver: mpsc::UnboundedReceiver<WorkerRequest>,
    busy: HashMap<String, BusyEntry>,
}

impl WorkerRegistry {
    /// Creates a new registry and the client used to talk to it.
    ///
    /// The channel is unbounded because releases are sent from `Drop`, which
    /// cannot wait for capacity.
    pub fn new() -> (Self, WorkerClient) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let registry = Self {
            receiver,
            busy: HashMap::new(),
        };
        (registry, WorkerClient::new(sender))
    }

    /// Runs the registry loop until all senders are dropped.
    pub async fn run(mut self) {
        info!("Worker registry started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                WorkerRequest::Acquire {
                    name,
                    token,
                    respond_to,
                } => {
                    if self.busy.contains_key(&name) {
                        warn!(worker = %name, "Busy");
                        let _ = respond_to.send(Err(FrameworkError::WorkerBusy(name)));
                        continue;
                    }
                    self.busy.insert(
                        name.clone(),
                        BusyEntry {
                            token,
                            since: Instant::now(),
                        },
                    );
                    if respond_to.send(Ok(())).is_err() {
                        // The caller gave up before the grant arrived.
                        self.busy.remove(&name);
                        debug!(worker = %name, "Acquire abandoned");
                        continue;
                    }
                    debug!(worker = %name, busy = self.busy.len(), "Acquired");
                }
                WorkerRequest::Release { name, token } => {
                    match self.busy.get(&name) {
                        Some(entry) if entry.token == token => {
                            let held = entry.since.elapsed();
                            self.busy.remove(&name);
                            debug!(worker = %name, ?held, busy = self.busy.len(), "Released");
                        }
                        _ => debug!(worker = %name, "Stale release ignored"),
                    }
                }
                WorkerRequest::ListBusy { respond_to } => {
                    let mut workers: Vec<BusyWorker> = self
                        .busy
                        .iter()
                        .map(|(name, entry)| BusyWorker {
                            name: name.clone(),
                            busy_for: entry.since.elapsed(),
                        })
                        .collect();
                    workers.sort_by(|a, b| a.name.cmp(&b.name));
                    let _ = respond_to.send(Ok(workers));
                }
            }
        }

        info!(busy = self.busy.len(), "Worker registry shutdown");
    }
}
