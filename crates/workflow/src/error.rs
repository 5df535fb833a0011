//! Workflow-level errors.

use crate::service::ServiceError;

/// Errors surfaced by workflow controller methods.
///
/// Job-level failures (a job reporting `failed`, a fetch that will be
/// retried) are never errors here -- they are rendered into the workflow
/// state. These variants cover misuse and operations the backend refused.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The action does not exist in the current step.
    #[error("Action '{action}' is not available in the {step} step")]
    InvalidStep {
        action: &'static str,
        step: &'static str,
    },

    /// A gate blocked the action (file check, approval gate, incomplete
    /// duplicate resolutions).
    #[error("{0}")]
    Blocked(String),

    /// A one-shot service call failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// A status poll is already active for this workflow instance.
    #[error("A status poll is already running for this workflow")]
    PollerActive,

    /// The workflow view was deactivated; the result of an in-flight
    /// operation has been discarded.
    #[error("The workflow has been deactivated")]
    Deactivated,
}

impl From<dataport_core::CoreError> for WorkflowError {
    fn from(err: dataport_core::CoreError) -> Self {
        Self::Blocked(err.to_string())
    }
}
