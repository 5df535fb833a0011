//! Orchestration for the bulk data migration workflows.
//!
//! The import workflow walks template selection, upload, validation
//! preview (with duplicate review), approval, and the import run; the
//! export workflow walks category selection, the export run, and
//! download. Both delegate every network operation to a
//! [`service::ImportService`] / [`service::ExportService`] implementation
//! and track asynchronous jobs with the status poller in [`poller`].
//!
//! State machines publish their current step through
//! [`tokio::sync::watch`] channels so a UI can observe transitions
//! without owning the controller.

pub mod error;
pub mod export;
pub mod history;
pub mod import;
pub mod poller;
pub mod service;

pub use error::WorkflowError;
pub use export::{ExportState, ExportWorkflow};
pub use import::{ImportState, ImportWorkflow};
