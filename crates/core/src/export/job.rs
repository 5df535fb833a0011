//! Export job status snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::categories::ExportCategory;
use super::status::ExportStatus;
use crate::error::CoreError;
use crate::types::{ExportId, Timestamp};

/// Point-in-time snapshot of an export job.
///
/// `download_url`, `expires_at`, and `record_counts` are populated once
/// the job reaches `Ready`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportJob {
    pub id: ExportId,
    pub status: ExportStatus,
    pub categories: Vec<ExportCategory>,
    pub download_url: Option<String>,
    pub expires_at: Option<Timestamp>,
    pub file_size_bytes: Option<u64>,
    /// Exported record counts keyed by category name.
    pub record_counts: Option<BTreeMap<String, u64>>,
    /// Error detail, populated when the job failed.
    pub error_message: Option<String>,
}

impl ExportJob {
    /// A fresh snapshot for a just-accepted export request.
    pub fn pending(id: ExportId, categories: Vec<ExportCategory>) -> Self {
        Self {
            id,
            status: ExportStatus::Pending,
            categories,
            download_url: None,
            expires_at: None,
            file_size_bytes: None,
            record_counts: None,
            error_message: None,
        }
    }

    /// Flip `Ready -> Downloaded` locally when the user starts the
    /// download. This is an optimistic client-side transition; the
    /// backend is not re-polled afterwards.
    pub fn mark_downloaded(&mut self) -> Result<(), CoreError> {
        if self.status != ExportStatus::Ready {
            return Err(CoreError::Conflict(format!(
                "Export is {} -- only a ready export can be downloaded",
                self.status
            )));
        }
        self.status = ExportStatus::Downloaded;
        Ok(())
    }
}
