//! Import job status snapshots.

use serde::{Deserialize, Serialize};

use super::status::ImportStatus;
use crate::types::JobId;

/// An error attached to a specific row of the import file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowError {
    /// Row number in the source file (1-indexed).
    pub row_number: u32,
    /// Column the error occurred in, if attributable to one.
    pub column: Option<String>,
    /// Machine-readable error code (e.g. `INVALID_EMAIL`).
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// The offending value as it appeared in the file.
    pub original_value: Option<String>,
}

/// Point-in-time snapshot of an import job, as returned by a status fetch.
///
/// Snapshots are read-only from the workflow's perspective: each poll
/// replaces the previous snapshot wholesale, and once `status` is terminal
/// no further snapshot is fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportJob {
    pub id: JobId,
    pub status: ImportStatus,
    /// Total rows in the file, once counted.
    pub total_rows: Option<u32>,
    pub processed_rows: u32,
    pub successful_rows: u32,
    pub failed_rows: u32,
    pub skipped_rows: u32,
    /// Overall progress in percent (0–100).
    pub progress_percent: u8,
    /// First N row errors, in row order. The full list may be longer.
    #[serde(default)]
    pub error_summary: Vec<RowError>,
}

impl ImportJob {
    /// A fresh snapshot for a just-accepted job.
    pub fn pending(id: JobId) -> Self {
        Self {
            id,
            status: ImportStatus::Pending,
            total_rows: None,
            processed_rows: 0,
            successful_rows: 0,
            failed_rows: 0,
            skipped_rows: 0,
            progress_percent: 0,
            error_summary: Vec::new(),
        }
    }

    /// Check the row accounting identity that holds at completion:
    /// every processed row was either imported, failed, or skipped.
    pub fn row_accounting_consistent(&self) -> bool {
        self.processed_rows == self.successful_rows + self.failed_rows + self.skipped_rows
    }

    /// Replace this snapshot with a newer one for the same job.
    ///
    /// Last write wins for every field except `progress_percent`, which is
    /// kept monotonically non-decreasing while the job is non-terminal (a
    /// lagging read replica must not make the progress bar move backwards).
    /// Terminal snapshots are taken verbatim.
    pub fn merge_update(&mut self, newer: ImportJob) {
        debug_assert_eq!(self.id, newer.id);
        let floor = self.progress_percent;
        let terminal = newer.status.is_terminal();
        *self = newer;
        if !terminal && self.progress_percent < floor {
            self.progress_percent = floor;
        }
    }
}
