//! # Registry Messages
//!
//! Message types exchanged between [`WorkerClient`](crate::WorkerClient),
//! [`Worker`](crate::Worker) and the [`WorkerRegistry`](crate::WorkerRegistry).

use crate::error::FrameworkError;
use std::time::Duration;
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by the registry.
pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

/// Requests processed by the registry loop.
///
/// All three variants travel through the same channel. Because the registry
/// handles them strictly in arrival order, a `Release` sent when a worker
/// finishes is always applied before any `Acquire` sent afterwards.
///
/// Each acquisition carries a `token` chosen by the client. A `Release` only
/// frees the name when its token matches the one that was granted, so a
/// guard whose acquisition was rejected can never free somebody else's slot.
#[derive(Debug)]
pub enum WorkerRequest {
    Acquire {
        name: String,
        token: u64,
        respond_to: Response<()>,
    },
    Release {
        name: String,
        token: u64,
    },
    ListBusy {
        respond_to: Response<Vec<BusyWorker>>,
    },
}

/// Snapshot of a worker that currently holds its slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusyWorker {
    pub name: String,
    pub busy_for: Duration,
}
