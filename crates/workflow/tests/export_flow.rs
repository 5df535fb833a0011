//! End-to-end export workflow scenarios against a scripted backend.

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;

use common::{catalog, export_snapshot, FakeExportService};
use dataport_core::export::categories::{ExportCategory, PrivacyOptions};
use dataport_core::export::job::ExportJob;
use dataport_core::export::status::ExportStatus;
use dataport_workflow::history::{HistoryStore, InMemoryHistoryStore};
use dataport_workflow::{ExportState, ExportWorkflow, WorkflowError};

const POLL_INTERVAL: Duration = Duration::from_secs(3);

fn workflow(
    service: Arc<FakeExportService>,
    history: Option<Arc<dyn HistoryStore>>,
) -> ExportWorkflow<FakeExportService> {
    ExportWorkflow::new(service, POLL_INTERVAL, history)
}

fn ready_snapshot(service: &FakeExportService, categories: Vec<ExportCategory>) -> ExportJob {
    ExportJob {
        download_url: Some(format!(
            "https://storage.example.com/exports/{}.zip",
            service.export_id
        )),
        file_size_bytes: Some(15_234_567),
        record_counts: Some(BTreeMap::from([
            ("buildings".to_string(), 45),
            ("residents".to_string(), 580),
        ])),
        ..export_snapshot(service.export_id, ExportStatus::Ready, categories)
    }
}

/// Selecting a personal-data category surfaces the privacy panel; the
/// export then runs to ready and downloads without re-polling.
#[tokio::test(start_paused = true)]
async fn personal_data_export_runs_and_downloads() {
    let service = Arc::new(FakeExportService::new(catalog()));
    let selected = vec![ExportCategory::Buildings, ExportCategory::Residents];
    service.script_statuses(vec![
        export_snapshot(service.export_id, ExportStatus::Processing, selected.clone()),
        ready_snapshot(&service, selected.clone()),
    ]);
    let history: Arc<dyn HistoryStore> = Arc::new(InMemoryHistoryStore::default());
    let wf = workflow(Arc::clone(&service), Some(Arc::clone(&history)));

    wf.load_catalog().await.unwrap();
    wf.toggle_category(ExportCategory::Buildings).unwrap();
    assert!(!wf.privacy_review_required());

    wf.toggle_category(ExportCategory::Residents).unwrap();
    // residents.contains_personal_data => the panel must be offered.
    assert!(wf.privacy_review_required());

    wf.set_privacy(PrivacyOptions {
        anonymize_personal_data: true,
        ..PrivacyOptions::default()
    })
    .unwrap();

    wf.start().await.unwrap();
    assert_matches!(wf.state(), ExportState::Exporting { .. });
    {
        let starts = service.starts.lock().unwrap();
        assert_eq!(starts.len(), 1);
        assert_eq!(starts[0].0, selected);
        assert!(starts[0].1.anonymize_personal_data);
    }

    let outcome = wf.run().await.unwrap();
    assert_eq!(outcome, Some(ExportStatus::Ready));
    assert_matches!(
        wf.state(),
        ExportState::Complete { ref job }
            if job.record_counts.as_ref().unwrap()["residents"] == 580
    );

    // Download flips ready -> downloaded locally, without another poll.
    let fetches = service.status_fetches.load(std::sync::atomic::Ordering::SeqCst);
    let bytes = wf.download().await.unwrap();
    assert!(!bytes.is_empty());
    assert_matches!(
        wf.state(),
        ExportState::Complete { ref job } if job.status == ExportStatus::Downloaded
    );
    assert_eq!(
        service.status_fetches.load(std::sync::atomic::Ordering::SeqCst),
        fetches
    );
    assert_eq!(service.downloads.lock().unwrap().len(), 1);

    // History recorded the export and the download.
    let entries = history.load().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, ExportStatus::Downloaded);
    assert_eq!(entries[0].download_count, 1);
}

/// Starting with nothing selected is blocked.
#[tokio::test(start_paused = true)]
async fn empty_selection_cannot_start() {
    let service = Arc::new(FakeExportService::new(catalog()));
    let wf = workflow(Arc::clone(&service), None);

    wf.load_catalog().await.unwrap();
    assert_matches!(wf.start().await, Err(WorkflowError::Blocked(_)));
    assert!(service.starts.lock().unwrap().is_empty());
}

/// A failed export stays in the exporting step with the error rendered;
/// going back preserves the selection for a retry.
#[tokio::test(start_paused = true)]
async fn failed_export_surfaces_error_and_keeps_selection() {
    let service = Arc::new(FakeExportService::new(catalog()));
    let selected = vec![ExportCategory::Buildings];
    service.script_statuses(vec![
        export_snapshot(service.export_id, ExportStatus::Processing, selected.clone()),
        ExportJob {
            error_message: Some("Archive packaging failed".to_string()),
            ..export_snapshot(service.export_id, ExportStatus::Failed, selected.clone())
        },
    ]);
    let wf = workflow(Arc::clone(&service), None);

    wf.load_catalog().await.unwrap();
    wf.toggle_category(ExportCategory::Buildings).unwrap();
    wf.start().await.unwrap();

    let outcome = wf.run().await.unwrap();
    assert_eq!(outcome, Some(ExportStatus::Failed));
    assert_matches!(
        wf.state(),
        ExportState::Exporting { error: Some(ref msg), .. } if msg.contains("packaging failed")
    );

    // Downloading a failed export is not a thing.
    assert_matches!(wf.download().await, Err(WorkflowError::InvalidStep { .. }));

    wf.start_new().unwrap();
    assert_matches!(
        wf.state(),
        ExportState::Select { ref selected, .. } if selected.contains(&ExportCategory::Buildings)
    );
}

/// Deactivating mid-poll stops fetching and leaves the state untouched.
#[tokio::test(start_paused = true)]
async fn deactivation_stops_export_polling() {
    let service = Arc::new(FakeExportService::new(catalog()));
    let selected = vec![ExportCategory::Buildings];
    service.script_statuses(vec![export_snapshot(
        service.export_id,
        ExportStatus::Processing,
        selected,
    )]);
    let wf = Arc::new(workflow(Arc::clone(&service), None));

    wf.load_catalog().await.unwrap();
    wf.toggle_category(ExportCategory::Buildings).unwrap();
    wf.start().await.unwrap();

    let runner = Arc::clone(&wf);
    let handle = tokio::spawn(async move { runner.run().await });
    tokio::time::sleep(Duration::from_secs(7)).await;
    wf.deactivate();

    let outcome = handle.await.unwrap().unwrap();
    assert_eq!(outcome, None);
    assert_matches!(
        wf.state(),
        ExportState::Exporting { ref job, .. } if job.status == ExportStatus::Processing
    );

    let fetches = service.status_fetches.load(std::sync::atomic::Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(
        service.status_fetches.load(std::sync::atomic::Ordering::SeqCst),
        fetches
    );
}

/// An expired export is a failure outcome, not a downloadable one.
#[tokio::test(start_paused = true)]
async fn expired_export_is_a_failure_outcome() {
    let service = Arc::new(FakeExportService::new(catalog()));
    let selected = vec![ExportCategory::Buildings];
    service.script_statuses(vec![export_snapshot(
        service.export_id,
        ExportStatus::Expired,
        selected,
    )]);
    let wf = workflow(Arc::clone(&service), None);

    wf.load_catalog().await.unwrap();
    wf.toggle_category(ExportCategory::Buildings).unwrap();
    wf.start().await.unwrap();

    let outcome = wf.run().await.unwrap();
    assert_eq!(outcome, Some(ExportStatus::Expired));
    assert_matches!(wf.state(), ExportState::Exporting { error: Some(_), .. });
}
