//! # Worker Guard
//!
//! A [`Worker`] is the single-use execution slot handed out by the registry.
//! It is an RAII guard: whatever happens to the task it runs (success, error,
//! panic) or even if it never runs a task at all, dropping the guard releases
//! the slot.

use crate::message::WorkerRequest;
use std::fmt::Display;
use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Exclusive execution slot for one worker name.
#[derive(Debug)]
pub struct Worker {
    name: String,
    token: u64,
    sender: Option<mpsc::UnboundedSender<WorkerRequest>>,
}

impl Worker {
    pub(crate) fn new(name: String, token: u64, sender: mpsc::UnboundedSender<WorkerRequest>) -> Self {
        Self {
            name,
            token,
            sender: Some(sender),
        }
    }

    /// The worker name this slot is bound to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Starts `task` in the background under this slot.
    ///
    /// The task is spawned onto its own Tokio task together with the guard,
    /// so the slot is held for exactly as long as the task runs, even if the
    /// returned handle is aborted. A panic inside the task is contained and
    /// reported by the returned handle, which resolves after the slot has been
    /// released and the outcome logged.
    pub fn run<F, E>(self, task: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let name = self.name.clone();
        info!(worker = %name, "starting");

        let inner = tokio::spawn(async move {
            let _slot = self;
            task.await
        });

        tokio::spawn(async move {
            match inner.await {
                Ok(Ok(())) => info!(worker = %name, "finished"),
                Ok(Err(e)) => error!(worker = %name, error = %e, "task failed"),
                Err(e) if e.is_panic() => error!(worker = %name, "task panicked"),
                Err(e) => error!(worker = %name, error = %e, "task aborted"),
            }
        })
    }

    /// Turns the guard into a no-op; used when the registry refused the slot.
    pub(crate) fn disarm(&mut self) {
        self.sender = None;
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if let Some(sender) = self.sender.take() {
            // A closed registry has nothing left to release.
            let _ = sender.send(WorkerRequest::Release {
                name: std::mem::take(&mut self.name),
                token: self.token,
            });
        }
    }
}
