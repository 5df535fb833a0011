//! Scripted fake services for driving the workflows deterministically.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use dataport_core::export::categories::{CategoryInfo, ExportCategory, PrivacyOptions};
use dataport_core::export::job::ExportJob;
use dataport_core::export::status::ExportStatus;
use dataport_core::import::duplicates::{DuplicateRecord, Resolution};
use dataport_core::import::job::ImportJob;
use dataport_core::import::preview::{ImportPreview, RecordCounts};
use dataport_core::import::status::ImportStatus;
use dataport_core::template::{ImportDataType, TemplateSummary};
use dataport_core::types::{ExportId, JobId};
use dataport_workflow::service::{
    ExportService, FileUpload, ImportService, ServiceError, UploadAccepted, UploadRequest,
};

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn template() -> TemplateSummary {
    TemplateSummary {
        id: Uuid::new_v4(),
        name: "Residents Import".to_string(),
        data_type: ImportDataType::Residents,
    }
}

pub fn csv_file(name: &str) -> FileUpload {
    FileUpload {
        file_name: name.to_string(),
        content_type: "text/csv".to_string(),
        data: b"name,email\nAlice,alice@example.com\n".to_vec(),
    }
}

pub fn preview(job_id: JobId, total: u32, error_rows: u32, warning_rows: u32) -> ImportPreview {
    ImportPreview {
        job_id,
        is_valid: error_rows == 0,
        total_rows: total,
        importable_rows: total - error_rows,
        error_rows,
        warning_rows,
        record_counts: RecordCounts {
            new_records: total - error_rows,
            updates: 0,
            skipped: 0,
        },
        issues: vec![],
        total_issue_count: 0,
        duplicates: vec![],
        sample_records: vec![],
        column_mapping: vec![],
    }
}

pub fn duplicate(import_row: u32, confidence: u8) -> DuplicateRecord {
    DuplicateRecord {
        import_row,
        existing_id: Uuid::new_v4(),
        matched_fields: vec!["email".to_string()],
        confidence,
        differences: vec![],
    }
}

pub fn import_snapshot(job_id: JobId, status: ImportStatus, progress: u8) -> ImportJob {
    ImportJob {
        status,
        progress_percent: progress,
        ..ImportJob::pending(job_id)
    }
}

pub fn export_snapshot(
    export_id: ExportId,
    status: ExportStatus,
    categories: Vec<ExportCategory>,
) -> ExportJob {
    ExportJob {
        status,
        ..ExportJob::pending(export_id, categories)
    }
}

pub fn catalog() -> Vec<CategoryInfo> {
    vec![
        CategoryInfo {
            id: ExportCategory::Buildings,
            name: "Buildings".to_string(),
            description: "Building master data".to_string(),
            record_count: 45,
            contains_personal_data: false,
        },
        CategoryInfo {
            id: ExportCategory::Residents,
            name: "Residents".to_string(),
            description: "Resident and owner information".to_string(),
            record_count: 580,
            contains_personal_data: true,
        },
    ]
}

// ---------------------------------------------------------------------------
// Fake import service
// ---------------------------------------------------------------------------

/// Scripted import backend. Status fetches pop from a queue, repeating
/// the last snapshot once the script runs out.
pub struct FakeImportService {
    pub job_id: JobId,
    pub preview: Mutex<ImportPreview>,
    /// When `false`, the upload response omits the preview and the
    /// workflow must fetch it separately.
    pub inline_preview: bool,
    pub statuses: Mutex<VecDeque<ImportJob>>,
    pub upload_calls: AtomicUsize,
    pub preview_fetches: AtomicUsize,
    pub status_fetches: AtomicUsize,
    pub approvals: Mutex<Vec<(JobId, bool)>>,
    pub resolutions: Mutex<Vec<(JobId, BTreeMap<u32, Resolution>)>>,
    /// Job id handed out by `retry`.
    pub retry_job_id: JobId,
    pub cancels: Mutex<Vec<JobId>>,
}

impl FakeImportService {
    pub fn new(preview: ImportPreview) -> Self {
        Self {
            job_id: preview.job_id,
            preview: Mutex::new(preview),
            inline_preview: true,
            statuses: Mutex::new(VecDeque::new()),
            upload_calls: AtomicUsize::new(0),
            preview_fetches: AtomicUsize::new(0),
            status_fetches: AtomicUsize::new(0),
            approvals: Mutex::new(Vec::new()),
            resolutions: Mutex::new(Vec::new()),
            retry_job_id: Uuid::new_v4(),
            cancels: Mutex::new(Vec::new()),
        }
    }

    pub fn script_statuses(&self, snapshots: Vec<ImportJob>) {
        *self.statuses.lock().unwrap() = snapshots.into();
    }
}

#[async_trait]
impl ImportService for FakeImportService {
    async fn upload(&self, _request: UploadRequest) -> Result<UploadAccepted, ServiceError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        let preview = self.preview.lock().unwrap().clone();
        Ok(UploadAccepted {
            job_id: self.job_id,
            preview: self.inline_preview.then_some(preview),
        })
    }

    async fn fetch_status(&self, _job_id: JobId) -> Result<ImportJob, ServiceError> {
        self.status_fetches.fetch_add(1, Ordering::SeqCst);
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            Ok(statuses.pop_front().unwrap())
        } else {
            statuses
                .front()
                .cloned()
                .ok_or_else(|| ServiceError::Transport("no scripted status".to_string()))
        }
    }

    async fn fetch_preview(&self, _job_id: JobId) -> Result<ImportPreview, ServiceError> {
        self.preview_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.preview.lock().unwrap().clone())
    }

    async fn resolve_duplicates(
        &self,
        job_id: JobId,
        resolutions: BTreeMap<u32, Resolution>,
    ) -> Result<(), ServiceError> {
        self.resolutions.lock().unwrap().push((job_id, resolutions));
        Ok(())
    }

    async fn approve(&self, job_id: JobId, acknowledge_warnings: bool) -> Result<(), ServiceError> {
        self.approvals
            .lock()
            .unwrap()
            .push((job_id, acknowledge_warnings));
        Ok(())
    }

    async fn retry(&self, _job_id: JobId) -> Result<JobId, ServiceError> {
        Ok(self.retry_job_id)
    }

    async fn cancel(&self, job_id: JobId) -> Result<(), ServiceError> {
        self.cancels.lock().unwrap().push(job_id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fake export service
// ---------------------------------------------------------------------------

pub struct FakeExportService {
    pub export_id: ExportId,
    pub catalog: Vec<CategoryInfo>,
    pub statuses: Mutex<VecDeque<ExportJob>>,
    pub starts: Mutex<Vec<(Vec<ExportCategory>, PrivacyOptions)>>,
    pub status_fetches: AtomicUsize,
    pub downloads: Mutex<Vec<String>>,
}

impl FakeExportService {
    pub fn new(catalog: Vec<CategoryInfo>) -> Self {
        Self {
            export_id: Uuid::new_v4(),
            catalog,
            statuses: Mutex::new(VecDeque::new()),
            starts: Mutex::new(Vec::new()),
            status_fetches: AtomicUsize::new(0),
            downloads: Mutex::new(Vec::new()),
        }
    }

    pub fn script_statuses(&self, snapshots: Vec<ExportJob>) {
        *self.statuses.lock().unwrap() = snapshots.into();
    }
}

#[async_trait]
impl ExportService for FakeExportService {
    async fn categories(&self) -> Result<Vec<CategoryInfo>, ServiceError> {
        Ok(self.catalog.clone())
    }

    async fn start(
        &self,
        categories: Vec<ExportCategory>,
        privacy: PrivacyOptions,
    ) -> Result<ExportId, ServiceError> {
        self.starts.lock().unwrap().push((categories, privacy));
        Ok(self.export_id)
    }

    async fn fetch_status(&self, _export_id: ExportId) -> Result<ExportJob, ServiceError> {
        self.status_fetches.fetch_add(1, Ordering::SeqCst);
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            Ok(statuses.pop_front().unwrap())
        } else {
            statuses
                .front()
                .cloned()
                .ok_or_else(|| ServiceError::Transport("no scripted status".to_string()))
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ServiceError> {
        self.downloads.lock().unwrap().push(url.to_string());
        Ok(b"PK\x03\x04fake-zip".to_vec())
    }
}
