//! # Registry Client
//!
//! This module defines the client used to acquire workers from a running
//! [`WorkerRegistry`](crate::WorkerRegistry).

use crate::error::FrameworkError;
use crate::message::{BusyWorker, WorkerRequest};
use crate::worker::Worker;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument};

/// ## WorkerClient
///
/// A cheap, cloneable handle to the registry. It forwards requests over a
/// Tokio mpsc channel and receives answers on oneshot channels.
///
/// * **Cloneable** – holds a sender and a shared token counter.
/// * **Race free** – the guard is armed before the request is sent, so even a
///   cancelled `acquire` future cannot leave a name stuck in the busy set.
#[derive(Clone, Debug)]
pub struct WorkerClient {
    sender: mpsc::UnboundedSender<WorkerRequest>,
    tokens: Arc<AtomicU64>,
}

impl WorkerClient {
    pub fn new(sender: mpsc::UnboundedSender<WorkerRequest>) -> Self {
        Self {
            sender,
            tokens: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Acquires the worker slot for `name`.
    ///
    /// Fails with [`FrameworkError::WorkerBusy`] if another task still holds
    /// the slot. The returned [`Worker`] releases it when dropped.
    #[instrument(skip(self))]
    pub async fn acquire(&self, name: &str) -> Result<Worker, FrameworkError> {
        let name = name.to_owned();
        let token = self.tokens.fetch_add(1, Ordering::Relaxed);
        let mut worker = Worker::new(name.clone(), token, self.sender.clone());

        let (respond_to, response) = oneshot::channel();
        debug!("Sending request");
        if self
            .sender
            .send(WorkerRequest::Acquire {
                name,
                token,
                respond_to,
            })
            .is_err()
        {
            worker.disarm();
            return Err(FrameworkError::RegistryClosed);
        }

        match response.await {
            Ok(Ok(())) => Ok(worker),
            Ok(Err(e)) => {
                worker.disarm();
                Err(e)
            }
            Err(_) => {
                worker.disarm();
                Err(FrameworkError::RegistryDropped)
            }
        }
    }

    /// Lists the workers that currently hold their slot, sorted by name.
    pub async fn busy(&self) -> Result<Vec<BusyWorker>, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(WorkerRequest::ListBusy { respond_to })
            .map_err(|_| FrameworkError::RegistryClosed)?;
        response.await.map_err(|_| FrameworkError::RegistryDropped)?
    }
}
