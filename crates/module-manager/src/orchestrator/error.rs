use std::fmt;

use thiserror::Error;

use crate::error::ManagerError;

/// The call a workflow was making when it aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStep {
    Create,
    Start,
    Stop,
    Delete,
    Persist,
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Delete => "delete",
            Self::Persist => "persist",
        })
    }
}

/// An aborted workflow. `target` is the service name, or the resource id
/// for the persist step.
#[derive(Debug, Error)]
#[error("{step} step failed for '{target}': {source}")]
pub struct WorkflowError {
    pub step: WorkflowStep,
    pub target: String,
    #[source]
    pub source: ManagerError,
}
