//! The migration service boundary.
//!
//! The engine never parses files, persists records, or matches
//! duplicates itself -- those are backend concerns behind these traits.
//! The workflow controllers are written against the traits so that the
//! transport (HTTP today, long-poll or streaming later) stays swappable
//! and tests can drive the state machines with deterministic fakes.

use std::collections::BTreeMap;

use async_trait::async_trait;

use dataport_core::export::categories::{CategoryInfo, ExportCategory, PrivacyOptions};
use dataport_core::export::job::ExportJob;
use dataport_core::import::duplicates::Resolution;
use dataport_core::import::job::ImportJob;
use dataport_core::import::options::ImportOptions;
use dataport_core::import::preview::ImportPreview;
use dataport_core::types::{ExportId, JobId, TemplateId};

/// Errors crossing the service boundary.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The request never produced a usable response (network, timeout).
    /// Transient by assumption: polling retries these.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend understood and refused the request.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The referenced job or resource does not exist.
    #[error("Not found")]
    NotFound,
}

/// A candidate file as handed over by the UI layer.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl FileUpload {
    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Everything the upload operation needs.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub template_id: TemplateId,
    pub file: FileUpload,
    pub options: ImportOptions,
}

/// Result of an accepted upload. The preview may be delivered inline;
/// when it is not, the workflow fetches it separately before entering
/// the preview step.
#[derive(Debug, Clone)]
pub struct UploadAccepted {
    pub job_id: JobId,
    pub preview: Option<ImportPreview>,
}

/// Backend operations behind the import workflow.
#[async_trait]
pub trait ImportService: Send + Sync {
    /// Upload a file and start validation. Returns the job id and,
    /// optionally, an inline validation preview.
    async fn upload(&self, request: UploadRequest) -> Result<UploadAccepted, ServiceError>;

    /// Fetch the current snapshot of an import job.
    async fn fetch_status(&self, job_id: JobId) -> Result<ImportJob, ServiceError>;

    /// Fetch the validation preview for an uploaded file.
    async fn fetch_preview(&self, job_id: JobId) -> Result<ImportPreview, ServiceError>;

    /// Submit duplicate resolutions. The mapping must cover every
    /// detected duplicate (the workflow enforces this before calling).
    async fn resolve_duplicates(
        &self,
        job_id: JobId,
        resolutions: BTreeMap<u32, Resolution>,
    ) -> Result<(), ServiceError>;

    /// Approve a validated job for execution.
    async fn approve(&self, job_id: JobId, acknowledge_warnings: bool) -> Result<(), ServiceError>;

    /// Retry a failed or cancelled job. Returns the job id to poll --
    /// the backend may reset the job in place or issue a new one.
    async fn retry(&self, job_id: JobId) -> Result<JobId, ServiceError>;

    /// Request cancellation of a running job. The cancellation shows up
    /// as a `cancelled` status on a later fetch.
    async fn cancel(&self, job_id: JobId) -> Result<(), ServiceError>;
}

/// Backend operations behind the export workflow.
#[async_trait]
pub trait ExportService: Send + Sync {
    /// The category catalog with record counts and privacy flags.
    async fn categories(&self) -> Result<Vec<CategoryInfo>, ServiceError>;

    /// Start an export job for the given categories.
    async fn start(
        &self,
        categories: Vec<ExportCategory>,
        privacy: PrivacyOptions,
    ) -> Result<ExportId, ServiceError>;

    /// Fetch the current snapshot of an export job.
    async fn fetch_status(&self, export_id: ExportId) -> Result<ExportJob, ServiceError>;

    /// Fetch the archive behind a ready export's download URL.
    async fn download(&self, url: &str) -> Result<Vec<u8>, ServiceError>;
}
