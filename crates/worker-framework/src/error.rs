//! # Framework Errors
//!
//! Errors raised by the worker registry and its clients.

/// Errors that can occur within the worker framework itself.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FrameworkError {
    #[error("Worker registry closed")]
    RegistryClosed,
    #[error("Worker registry dropped response channel")]
    RegistryDropped,
    /// Another task still holds the worker with this name.
    #[error("a task is still being executed by '{0}'")]
    WorkerBusy(String),
}
