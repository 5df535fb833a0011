//! The export workflow state machine.
//!
//! Three steps: category selection (with the privacy panel rule), the
//! export run, and completion with download. Structurally the import
//! workflow's upload/import pair without a validation stage; the same
//! status poller tracks the job.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use dataport_core::export::categories::{
    privacy_review_required, CategoryInfo, ExportCategory, PrivacyOptions,
};
use dataport_core::export::job::ExportJob;
use dataport_core::export::status::ExportStatus;

use crate::error::WorkflowError;
use crate::history::{ExportHistoryEntry, HistoryStore};
use crate::poller;
use crate::service::ExportService;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Where the export workflow currently is.
#[derive(Debug, Clone)]
pub enum ExportState {
    /// Choosing categories and privacy options. The catalog is empty
    /// until [`ExportWorkflow::load_catalog`] has run.
    Select {
        catalog: Vec<CategoryInfo>,
        selected: BTreeSet<ExportCategory>,
        privacy: PrivacyOptions,
        error: Option<String>,
    },
    /// The backend is packaging the archive; we poll for status.
    ///
    /// An expired or failed export stays here with its terminal snapshot
    /// and an error message, so the user can go back and retry.
    Exporting {
        job: ExportJob,
        error: Option<String>,
    },
    /// The archive is ready (or already downloaded).
    Complete { job: ExportJob },
}

impl ExportState {
    pub fn step_name(&self) -> &'static str {
        match self {
            Self::Select { .. } => "select",
            Self::Exporting { .. } => "exporting",
            Self::Complete { .. } => "complete",
        }
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Controls one export workflow instance.
pub struct ExportWorkflow<S> {
    service: Arc<S>,
    poll_interval: Duration,
    history: Option<Arc<dyn HistoryStore>>,
    cancel: CancellationToken,
    state_tx: watch::Sender<ExportState>,
    poll_guard: tokio::sync::Mutex<()>,
}

impl<S: ExportService> ExportWorkflow<S> {
    pub fn new(
        service: Arc<S>,
        poll_interval: Duration,
        history: Option<Arc<dyn HistoryStore>>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ExportState::Select {
            catalog: Vec::new(),
            selected: BTreeSet::new(),
            privacy: PrivacyOptions::default(),
            error: None,
        });
        Self {
            service,
            poll_interval,
            history,
            cancel: CancellationToken::new(),
            state_tx,
            poll_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ExportState> {
        self.state_tx.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ExportState {
        self.state_tx.borrow().clone()
    }

    /// Deactivate the workflow (the owning view unmounted).
    pub fn deactivate(&self) {
        self.cancel.cancel();
    }

    // -- select step -----------------------------------------------------------

    /// Fetch the category catalog into the select step.
    pub async fn load_catalog(&self) -> Result<(), WorkflowError> {
        match self.state() {
            ExportState::Select { .. } => {}
            other => return Err(self.invalid_step("load_catalog", &other)),
        }

        let catalog = self.service.categories().await?;
        self.ensure_active()?;

        self.state_tx.send_modify(|state| {
            if let ExportState::Select {
                catalog: slot,
                selected,
                ..
            } = state
            {
                // Drop selections that no longer exist in the catalog.
                selected.retain(|id| catalog.iter().any(|info| info.id == *id));
                *slot = catalog;
            }
        });
        Ok(())
    }

    /// Toggle a category in or out of the selection.
    pub fn toggle_category(&self, category: ExportCategory) -> Result<(), WorkflowError> {
        let mut toggled = false;
        self.state_tx.send_modify(|state| {
            if let ExportState::Select { selected, .. } = state {
                if !selected.remove(&category) {
                    selected.insert(category);
                }
                toggled = true;
            }
        });
        if toggled {
            Ok(())
        } else {
            Err(self.invalid_step("toggle_category", &self.state()))
        }
    }

    /// Set the privacy options for the upcoming export.
    pub fn set_privacy(&self, privacy: PrivacyOptions) -> Result<(), WorkflowError> {
        let mut applied = false;
        self.state_tx.send_modify(|state| {
            if let ExportState::Select { privacy: slot, .. } = state {
                *slot = privacy;
                applied = true;
            }
        });
        if applied {
            Ok(())
        } else {
            Err(self.invalid_step("set_privacy", &self.state()))
        }
    }

    /// Whether the privacy panel must be shown: any selected category is
    /// flagged as containing personal data. (The panel offers the
    /// options; it never forces them.)
    pub fn privacy_review_required(&self) -> bool {
        match self.state() {
            ExportState::Select {
                catalog, selected, ..
            } => {
                let selected: Vec<ExportCategory> = selected.iter().copied().collect();
                privacy_review_required(&selected, &catalog)
            }
            _ => false,
        }
    }

    /// `select -> exporting`: start the export job.
    pub async fn start(&self) -> Result<(), WorkflowError> {
        let (selected, privacy) = match self.state() {
            ExportState::Select {
                selected, privacy, ..
            } => (selected, privacy),
            other => return Err(self.invalid_step("start", &other)),
        };

        if selected.is_empty() {
            return Err(WorkflowError::Blocked(
                "Select at least one category to export".to_string(),
            ));
        }

        let categories: Vec<ExportCategory> = selected.iter().copied().collect();
        let export_id = match self.service.start(categories.clone(), privacy).await {
            Ok(id) => id,
            Err(e) => {
                self.stamp_select_error(&e.to_string());
                return Err(e.into());
            }
        };
        self.ensure_active()?;

        tracing::info!(export_id = %export_id, categories = ?categories, "Export started");
        self.state_tx.send_replace(ExportState::Exporting {
            job: ExportJob::pending(export_id, categories),
            error: None,
        });
        Ok(())
    }

    // -- exporting step --------------------------------------------------------

    /// Poll the export job until it reaches a terminal status.
    ///
    /// `Ready` advances to `Complete`; `Expired`/`Failed` stay in
    /// `Exporting` with an error message. Returns the terminal status,
    /// or `None` if the workflow was deactivated first.
    pub async fn run(&self) -> Result<Option<ExportStatus>, WorkflowError> {
        let export_id = match self.state() {
            ExportState::Exporting { ref job, .. } => job.id,
            ref other => return Err(self.invalid_step("run", other)),
        };

        let _guard = self
            .poll_guard
            .try_lock()
            .map_err(|_| WorkflowError::PollerActive)?;
        let activation = self.cancel.child_token();

        let state_tx = &self.state_tx;
        let final_job = poller::poll_until_terminal(
            || {
                let service = Arc::clone(&self.service);
                async move { service.fetch_status(export_id).await }
            },
            |job: &ExportJob| job.status.is_terminal(),
            self.poll_interval,
            &activation,
            |snapshot: &ExportJob| {
                state_tx.send_modify(|state| {
                    if let ExportState::Exporting { job, .. } = state {
                        if job.id == snapshot.id {
                            *job = snapshot.clone();
                        }
                    }
                });
            },
        )
        .await;

        let Some(final_job) = final_job else {
            return Ok(None);
        };

        let status = final_job.status;
        tracing::info!(export_id = %export_id, status = %status, "Export run finished");
        self.record_history(&final_job);

        if status.is_failure() {
            let message = final_job
                .error_message
                .clone()
                .unwrap_or_else(|| format!("Export {status}"));
            self.state_tx.send_modify(|state| {
                if let ExportState::Exporting { error, .. } = state {
                    *error = Some(message);
                }
            });
        } else {
            self.state_tx
                .send_replace(ExportState::Complete { job: final_job });
        }
        Ok(Some(status))
    }

    // -- complete step ---------------------------------------------------------

    /// Download the archive.
    ///
    /// Flips the job to `downloaded` locally first (the optimistic
    /// transition -- the backend is not re-polled), then fetches the
    /// archive bytes.
    pub async fn download(&self) -> Result<Vec<u8>, WorkflowError> {
        let job = match self.state() {
            ExportState::Complete { job } => job,
            other => return Err(self.invalid_step("download", &other)),
        };

        let url = job.download_url.clone().ok_or_else(|| {
            WorkflowError::Blocked("The export has no download URL".to_string())
        })?;

        let mut flipped = Ok(());
        self.state_tx.send_modify(|state| {
            if let ExportState::Complete { job } = state {
                flipped = job.mark_downloaded();
            }
        });
        flipped.map_err(WorkflowError::from)?;
        self.bump_download_count(job.id);

        let bytes = self.service.download(&url).await?;
        tracing::info!(export_id = %job.id, size = bytes.len(), "Export archive downloaded");
        Ok(bytes)
    }

    /// Back to category selection with the previous selection preserved.
    /// The retry path after a failed or expired export, and the "start
    /// new" path after a download. The catalog must be reloaded before
    /// starting again.
    pub fn start_new(&self) -> Result<(), WorkflowError> {
        let keep: BTreeSet<ExportCategory> = match self.state() {
            ExportState::Exporting { job, .. } if job.status.is_terminal() => {
                job.categories.iter().copied().collect()
            }
            ExportState::Complete { job } => job.categories.iter().copied().collect(),
            other => return Err(self.invalid_step("start_new", &other)),
        };

        self.state_tx.send_replace(ExportState::Select {
            catalog: Vec::new(),
            selected: keep,
            privacy: PrivacyOptions::default(),
            error: None,
        });
        Ok(())
    }

    // -- helpers ---------------------------------------------------------------

    fn invalid_step(&self, action: &'static str, state: &ExportState) -> WorkflowError {
        WorkflowError::InvalidStep {
            action,
            step: state.step_name(),
        }
    }

    fn ensure_active(&self) -> Result<(), WorkflowError> {
        if self.cancel.is_cancelled() {
            Err(WorkflowError::Deactivated)
        } else {
            Ok(())
        }
    }

    fn stamp_select_error(&self, message: &str) {
        self.state_tx.send_modify(|state| {
            if let ExportState::Select { error, .. } = state {
                *error = Some(message.to_string());
            }
        });
    }

    /// Append the finished job to history. Store failures are logged,
    /// never fatal.
    fn record_history(&self, job: &ExportJob) {
        let Some(store) = self.history.as_deref() else {
            return;
        };
        let result = store.load().and_then(|mut entries| {
            entries.push(ExportHistoryEntry {
                export_id: job.id,
                status: job.status,
                categories: job.categories.clone(),
                file_size_bytes: job.file_size_bytes,
                finished_at: chrono::Utc::now(),
                download_count: 0,
            });
            store.save(&entries)
        });
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to record export history");
        }
    }

    fn bump_download_count(&self, export_id: dataport_core::types::ExportId) {
        let Some(store) = self.history.as_deref() else {
            return;
        };
        let result = store.load().and_then(|mut entries| {
            if let Some(entry) = entries.iter_mut().find(|e| e.export_id == export_id) {
                entry.download_count += 1;
                entry.status = ExportStatus::Downloaded;
            }
            store.save(&entries)
        });
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to update export history");
        }
    }
}
