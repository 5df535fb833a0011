//! The import workflow state machine.
//!
//! Five steps: template selection, upload, validation preview (with
//! duplicate review), the import run, and completion. Each user action is
//! a method; every network operation goes through the [`ImportService`]
//! boundary, and the import run is tracked with
//! [`poller::poll_until_terminal`].
//!
//! All failures are rendered into the state (and returned to the caller);
//! a job-level failure leaves the workflow in the `Importing` step with
//! retry/cancel available rather than advancing or crashing.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use dataport_core::file_check::{validate_upload, FileCheckConfig};
use dataport_core::import::duplicates::{Resolution, ResolutionPlan};
use dataport_core::import::job::ImportJob;
use dataport_core::import::options::ImportOptions;
use dataport_core::import::preview::ImportPreview;
use dataport_core::import::review;
use dataport_core::import::status::ImportStatus;
use dataport_core::template::TemplateSummary;
use dataport_core::types::JobId;

use crate::error::WorkflowError;
use crate::poller;
use crate::service::{FileUpload, ImportService, UploadRequest};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Where the import workflow currently is.
///
/// Each variant carries exactly the data that step owns; moving between
/// steps drops what the old step owned (cancel edges included).
#[derive(Debug, Clone)]
pub enum ImportState {
    /// Waiting for the user to choose a field-mapping template.
    SelectTemplate,
    /// Template chosen; waiting for a file.
    Upload {
        template: TemplateSummary,
        /// Inline message from a rejected file or failed upload.
        error: Option<String>,
    },
    /// File validated server-side; the user reviews issues and duplicates.
    Preview {
        template: TemplateSummary,
        job_id: JobId,
        preview: ImportPreview,
        /// Per-row duplicate resolutions, owned by this step.
        plan: ResolutionPlan,
        resolutions_submitted: bool,
        error: Option<String>,
    },
    /// Approved; the backend is executing and we poll for status.
    ///
    /// This step is also where a partial, failed, or cancelled run ends
    /// up (the terminal snapshot stays visible with retry/cancel
    /// actions) -- only a fully successful run advances to `Complete`.
    Importing {
        template: TemplateSummary,
        job: ImportJob,
        error: Option<String>,
    },
    /// The run completed with full success.
    Complete { job: ImportJob },
}

impl ImportState {
    /// Step name for messages and logging.
    pub fn step_name(&self) -> &'static str {
        match self {
            Self::SelectTemplate => "select_template",
            Self::Upload { .. } => "upload",
            Self::Preview { .. } => "preview",
            Self::Importing { .. } => "importing",
            Self::Complete { .. } => "complete",
        }
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Controls one import workflow instance.
///
/// The instance exclusively owns its job state: nothing else polls the
/// job, and observers only see snapshots through [`subscribe`](Self::subscribe).
pub struct ImportWorkflow<S> {
    service: Arc<S>,
    file_check: FileCheckConfig,
    poll_interval: Duration,
    /// Cancelled when the owning view goes away. Poll activations run on
    /// child tokens.
    cancel: CancellationToken,
    state_tx: watch::Sender<ImportState>,
    /// Held while a poll activation runs; guarantees a single activation
    /// per controller instance.
    poll_guard: tokio::sync::Mutex<()>,
}

impl<S: ImportService> ImportWorkflow<S> {
    pub fn new(service: Arc<S>, file_check: FileCheckConfig, poll_interval: Duration) -> Self {
        let (state_tx, _) = watch::channel(ImportState::SelectTemplate);
        Self {
            service,
            file_check,
            poll_interval,
            cancel: CancellationToken::new(),
            state_tx,
            poll_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ImportState> {
        self.state_tx.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ImportState {
        self.state_tx.borrow().clone()
    }

    /// Deactivate the workflow (the owning view unmounted). Stops any
    /// active poll and discards results of in-flight operations.
    pub fn deactivate(&self) {
        self.cancel.cancel();
    }

    // -- select_template step ------------------------------------------------

    /// `select_template -> upload`: carry the chosen template forward.
    pub fn select_template(&self, template: TemplateSummary) -> Result<(), WorkflowError> {
        self.expect_step("select_template", |state| {
            matches!(state, ImportState::SelectTemplate)
        })?;
        tracing::info!(template_id = %template.id, template_name = %template.name, "Template selected");
        self.state_tx.send_replace(ImportState::Upload {
            template,
            error: None,
        });
        Ok(())
    }

    // -- upload step -----------------------------------------------------------

    /// `upload -> select_template` (cancel): clears the selected template.
    pub fn cancel_upload(&self) -> Result<(), WorkflowError> {
        self.expect_step("cancel_upload", |state| {
            matches!(state, ImportState::Upload { .. })
        })?;
        self.state_tx.send_replace(ImportState::SelectTemplate);
        Ok(())
    }

    /// Upload a file and enter the preview step.
    ///
    /// The file gate runs first: a wrong type or oversized file is
    /// rejected before any network call and the step does not advance.
    /// If the backend does not return a preview inline, one is fetched
    /// before entering `Preview`.
    pub async fn upload(
        &self,
        file: FileUpload,
        options: ImportOptions,
    ) -> Result<(), WorkflowError> {
        let template = match self.state() {
            ImportState::Upload { template, .. } => template,
            other => return Err(self.invalid_step("upload", &other)),
        };

        if let Err(gate) =
            validate_upload(&file.file_name, &file.content_type, file.size_bytes(), &self.file_check)
        {
            let message = gate.to_string();
            self.stamp_upload_error(&message);
            return Err(WorkflowError::Blocked(message));
        }

        let file_name = file.file_name.clone();
        let request = UploadRequest {
            template_id: template.id,
            file,
            options,
        };

        let accepted = match self.service.upload(request).await {
            Ok(accepted) => accepted,
            Err(e) => {
                self.stamp_upload_error(&e.to_string());
                return Err(e.into());
            }
        };
        self.ensure_active()?;

        let preview = match accepted.preview {
            Some(preview) => preview,
            None => match self.service.fetch_preview(accepted.job_id).await {
                Ok(preview) => preview,
                Err(e) => {
                    self.stamp_upload_error(&e.to_string());
                    return Err(e.into());
                }
            },
        };
        self.ensure_active()?;

        if !preview.is_consistent() {
            tracing::warn!(
                job_id = %accepted.job_id,
                error_rows = preview.error_rows,
                is_valid = preview.is_valid,
                "Preview payload is internally inconsistent",
            );
        }

        tracing::info!(
            job_id = %accepted.job_id,
            file_name = %file_name,
            total_rows = preview.total_rows,
            error_rows = preview.error_rows,
            warning_rows = preview.warning_rows,
            duplicates = preview.duplicates.len(),
            "Upload accepted, preview ready",
        );

        let plan = ResolutionPlan::with_defaults(&preview.duplicates);
        self.state_tx.send_replace(ImportState::Preview {
            template,
            job_id: accepted.job_id,
            preview,
            plan,
            resolutions_submitted: false,
            error: None,
        });
        Ok(())
    }

    // -- preview step ----------------------------------------------------------

    /// `preview -> upload` (cancel): clears the preview, keeps the template.
    pub fn cancel_preview(&self) -> Result<(), WorkflowError> {
        let template = match self.state() {
            ImportState::Preview { template, .. } => template,
            other => return Err(self.invalid_step("cancel_preview", &other)),
        };
        self.state_tx.send_replace(ImportState::Upload {
            template,
            error: None,
        });
        Ok(())
    }

    /// Override the resolution for one duplicate row.
    pub fn set_resolution(&self, import_row: u32, resolution: Resolution) -> Result<(), WorkflowError> {
        let mut result = Err(self.invalid_step("set_resolution", &self.state()));
        self.state_tx.send_modify(|state| {
            if let ImportState::Preview { plan, .. } = state {
                result = plan.set(import_row, resolution).map_err(WorkflowError::from);
            }
        });
        result
    }

    /// Apply one resolution to every duplicate row, overwriting all
    /// prior choices.
    pub fn bulk_apply_resolution(&self, resolution: Resolution) -> Result<(), WorkflowError> {
        let mut applied = false;
        self.state_tx.send_modify(|state| {
            if let ImportState::Preview { plan, .. } = state {
                plan.bulk_apply(resolution);
                applied = true;
            }
        });
        if applied {
            Ok(())
        } else {
            Err(self.invalid_step("bulk_apply_resolution", &self.state()))
        }
    }

    /// Submit the duplicate resolutions for this job.
    ///
    /// Fails without calling the backend if any duplicate row is still
    /// unresolved. A batch without duplicates submits nothing.
    pub async fn submit_resolutions(&self) -> Result<(), WorkflowError> {
        let (job_id, preview, plan) = match self.state() {
            ImportState::Preview {
                job_id, preview, plan, ..
            } => (job_id, preview, plan),
            other => return Err(self.invalid_step("submit_resolutions", &other)),
        };

        if preview.duplicates.is_empty() {
            return Ok(());
        }

        let mapping = plan.into_complete(&preview.duplicates)?;

        if let Err(e) = self.service.resolve_duplicates(job_id, mapping).await {
            self.stamp_preview_error(&e.to_string());
            return Err(e.into());
        }
        self.ensure_active()?;

        tracing::info!(job_id = %job_id, count = preview.duplicates.len(), "Duplicate resolutions submitted");
        self.state_tx.send_modify(|state| {
            if let ImportState::Preview {
                resolutions_submitted,
                ..
            } = state
            {
                *resolutions_submitted = true;
            }
        });
        Ok(())
    }

    /// Whether approval would pass right now.
    pub fn can_approve(&self, acknowledge_warnings: bool) -> bool {
        match self.state() {
            ImportState::Preview { preview, .. } => review::can_approve(&preview, acknowledge_warnings),
            _ => false,
        }
    }

    /// `preview -> importing`: approve the job for execution.
    ///
    /// The gate is evaluated at call time: errors always block, warnings
    /// block unless `acknowledge_warnings` is set. The flag is passed to
    /// the backend verbatim.
    pub async fn approve(&self, acknowledge_warnings: bool) -> Result<(), WorkflowError> {
        let (template, job_id, preview) = match self.state() {
            ImportState::Preview {
                template,
                job_id,
                preview,
                ..
            } => (template, job_id, preview),
            other => return Err(self.invalid_step("approve", &other)),
        };

        if !review::can_approve(&preview, acknowledge_warnings) {
            let message = if preview.error_rows > 0 {
                format!(
                    "{} row(s) have validation errors; fix the file and upload again",
                    preview.error_rows
                )
            } else {
                format!(
                    "{} row(s) have warnings; acknowledge them to proceed",
                    preview.warning_rows
                )
            };
            return Err(WorkflowError::Blocked(message));
        }

        if let Err(e) = self.service.approve(job_id, acknowledge_warnings).await {
            self.stamp_preview_error(&e.to_string());
            return Err(e.into());
        }
        self.ensure_active()?;

        tracing::info!(job_id = %job_id, acknowledge_warnings, "Import approved");

        let mut job = ImportJob::pending(job_id);
        job.status = ImportStatus::Importing;
        self.state_tx.send_replace(ImportState::Importing {
            template,
            job,
            error: None,
        });
        Ok(())
    }

    // -- importing step --------------------------------------------------------

    /// Poll the running job until it reaches a terminal status.
    ///
    /// Every snapshot replaces the previous one in the `Importing` state
    /// (progress stays monotonic while running). On full success the
    /// workflow advances to `Complete`; a partial, failed, or cancelled
    /// run stays in `Importing` with its terminal snapshot so the user
    /// can retry or walk away.
    ///
    /// Returns the terminal status, or `None` if the workflow was
    /// deactivated first. At most one activation runs per instance.
    pub async fn run(&self) -> Result<Option<ImportStatus>, WorkflowError> {
        let job_id = match self.state() {
            ImportState::Importing { ref job, .. } => job.id,
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
                async move { service.fetch_status(job_id).await }
            },
            |job: &ImportJob| job.status.is_terminal(),
            self.poll_interval,
            &activation,
            |snapshot: &ImportJob| {
                state_tx.send_modify(|state| {
                    if let ImportState::Importing { job, .. } = state {
                        if job.id == snapshot.id {
                            job.merge_update(snapshot.clone());
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
        tracing::info!(
            job_id = %job_id,
            status = %status,
            successful_rows = final_job.successful_rows,
            failed_rows = final_job.failed_rows,
            "Import run finished",
        );

        if status.is_success() {
            self.state_tx
                .send_replace(ImportState::Complete { job: final_job });
        }
        Ok(Some(status))
    }

    /// Retry a failed or cancelled run. The backend may reset the job or
    /// issue a fresh one; polling starts over either way.
    pub async fn retry(&self) -> Result<(), WorkflowError> {
        let (template, job) = match self.state() {
            ImportState::Importing { template, job, .. } => (template, job),
            other => return Err(self.invalid_step("retry", &other)),
        };

        if !job.status.is_retryable() {
            return Err(WorkflowError::Blocked(format!(
                "A {} job cannot be retried",
                job.status
            )));
        }

        let new_job_id = match self.service.retry(job.id).await {
            Ok(id) => id,
            Err(e) => {
                self.stamp_importing_error(&e.to_string());
                return Err(e.into());
            }
        };
        self.ensure_active()?;

        tracing::info!(old_job_id = %job.id, new_job_id = %new_job_id, "Import retried");
        self.state_tx.send_replace(ImportState::Importing {
            template,
            job: ImportJob::pending(new_job_id),
            error: None,
        });
        Ok(())
    }

    /// Ask the backend to cancel the running job. The cancellation is
    /// observed by the active poll as a `cancelled` status.
    pub async fn cancel_job(&self) -> Result<(), WorkflowError> {
        let job = match self.state() {
            ImportState::Importing { job, .. } => job,
            other => return Err(self.invalid_step("cancel_job", &other)),
        };

        if job.status.is_terminal() {
            return Err(WorkflowError::Blocked(format!(
                "The job already finished as {}",
                job.status
            )));
        }

        self.service.cancel(job.id).await?;
        tracing::info!(job_id = %job.id, "Import cancellation requested");
        Ok(())
    }

    // -- complete step ---------------------------------------------------------

    /// "Start new": reset all transient state back to template selection.
    ///
    /// Available from `Complete`, and from `Importing` once the run ended
    /// in a terminal non-success status (the walk-away path).
    pub fn start_new(&self) -> Result<(), WorkflowError> {
        let allowed = match self.state() {
            ImportState::Complete { .. } => true,
            ImportState::Importing { ref job, .. } => job.status.is_terminal(),
            _ => false,
        };
        if !allowed {
            return Err(self.invalid_step("start_new", &self.state()));
        }
        self.state_tx.send_replace(ImportState::SelectTemplate);
        Ok(())
    }

    // -- helpers ---------------------------------------------------------------

    fn expect_step(
        &self,
        action: &'static str,
        predicate: impl Fn(&ImportState) -> bool,
    ) -> Result<(), WorkflowError> {
        let state = self.state();
        if predicate(&state) {
            Ok(())
        } else {
            Err(self.invalid_step(action, &state))
        }
    }

    fn invalid_step(&self, action: &'static str, state: &ImportState) -> WorkflowError {
        WorkflowError::InvalidStep {
            action,
            step: state.step_name(),
        }
    }

    /// Reject results that resolve after the view went away.
    fn ensure_active(&self) -> Result<(), WorkflowError> {
        if self.cancel.is_cancelled() {
            Err(WorkflowError::Deactivated)
        } else {
            Ok(())
        }
    }

    fn stamp_upload_error(&self, message: &str) {
        self.state_tx.send_modify(|state| {
            if let ImportState::Upload { error, .. } = state {
                *error = Some(message.to_string());
            }
        });
    }

    fn stamp_preview_error(&self, message: &str) {
        self.state_tx.send_modify(|state| {
            if let ImportState::Preview { error, .. } = state {
                *error = Some(message.to_string());
            }
        });
    }

    fn stamp_importing_error(&self, message: &str) {
        self.state_tx.send_modify(|state| {
            if let ImportState::Importing { error, .. } = state {
                *error = Some(message.to_string());
            }
        });
    }
}
