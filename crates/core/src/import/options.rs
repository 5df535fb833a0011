//! Options carried with an upload request.

use serde::{Deserialize, Serialize};

/// Behavioural switches for an import run, chosen before upload.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Skip rows with validation errors instead of failing the job.
    pub skip_errors: bool,
    /// Update existing records when a match is found.
    pub update_existing: bool,
    /// Validate only; never write anything.
    pub dry_run: bool,
}
