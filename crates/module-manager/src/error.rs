//! Error types shared by the orchestrator, the stores and the HTTP layer.

use thiserror::Error;
use worker_framework::FrameworkError;

/// Errors that can occur while managing modules and components.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// The submitted definition or request body is malformed or incomplete.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The request collides with the reserved id or with an active resource.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A call to the config storage or deployment service did not return 200.
    #[error("{call} failed: {detail}")]
    Downstream { call: String, detail: String },

    /// A lifecycle operation is already running for this resource.
    #[error("Busy: {0}")]
    Busy(String),

    /// The resource store could not be read or written.
    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ManagerResult<T> = Result<T, ManagerError>;

impl ManagerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn downstream(call: impl Into<String>, detail: impl ToString) -> Self {
        Self::Downstream {
            call: call.into(),
            detail: detail.to_string(),
        }
    }

    pub fn store(msg: impl ToString) -> Self {
        Self::Store(msg.to_string())
    }
}

impl From<FrameworkError> for ManagerError {
    fn from(err: FrameworkError) -> Self {
        match err {
            FrameworkError::WorkerBusy(_) => ManagerError::Busy(err.to_string()),
            other => ManagerError::Internal(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ManagerError {
    fn from(err: std::io::Error) -> Self {
        ManagerError::Store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_worker_maps_to_busy() {
        let err: ManagerError = FrameworkError::WorkerBusy("worker-module-m1".into()).into();
        assert!(matches!(err, ManagerError::Busy(_)));
        assert_eq!(
            err.to_string(),
            "Busy: a task is still being executed by 'worker-module-m1'"
        );
    }

    #[test]
    fn test_closed_registry_maps_to_internal() {
        let err: ManagerError = FrameworkError::RegistryClosed.into();
        assert!(matches!(err, ManagerError::Internal(_)));
    }

    #[test]
    fn test_downstream_message_names_the_call() {
        let err = ManagerError::downstream("deployment create 'svcA'", "status 500");
        assert_eq!(err.to_string(), "deployment create 'svcA' failed: status 500");
    }
}
