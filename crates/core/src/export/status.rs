//! Export job lifecycle statuses.

use serde::{Deserialize, Serialize};

/// Status of an export job.
///
/// `Downloaded` is special: the transition `Ready -> Downloaded` happens
/// locally when the user clicks download and is never re-polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Pending,
    Processing,
    Ready,
    Downloaded,
    Expired,
    Failed,
}

impl ExportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Downloaded => "downloaded",
            Self::Expired => "expired",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` once the backend will no longer advance the job.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Ready | Self::Downloaded | Self::Expired | Self::Failed
        )
    }

    /// Returns `true` for the outcomes that end the workflow without an
    /// archive to download.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Expired | Self::Failed)
    }
}

impl std::fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
