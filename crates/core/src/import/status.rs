//! Import job lifecycle statuses.

use serde::{Deserialize, Serialize};

/// Status of an import job as reported by the backend.
///
/// The validation phase ends at `Validated` / `ValidationFailed`; the
/// execution phase (after approval) ends at one of the last four variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Pending,
    Validating,
    Validated,
    ValidationFailed,
    Importing,
    Completed,
    PartiallyCompleted,
    Failed,
    Cancelled,
}

impl ImportStatus {
    /// Stable string representation matching serde's `rename_all = "snake_case"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Validating => "validating",
            Self::Validated => "validated",
            Self::ValidationFailed => "validation_failed",
            Self::Importing => "importing",
            Self::Completed => "completed",
            Self::PartiallyCompleted => "partially_completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns `true` once the job will no longer change on its own.
    ///
    /// A terminal job is immutable: polling stops and a new job (or a
    /// retry) is needed for further progress. `Validated` and
    /// `ValidationFailed` are terminal for the validation phase -- the job
    /// only moves again after an explicit approval.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Validated
                | Self::ValidationFailed
                | Self::Completed
                | Self::PartiallyCompleted
                | Self::Failed
                | Self::Cancelled
        )
    }

    /// Returns `true` for the one unconditional success outcome.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns `true` if the retry operation applies to this status.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
