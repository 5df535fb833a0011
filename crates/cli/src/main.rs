//! Command-line driver for the migration workflows.
//!
//! `dataport import <template-id> <file> [--acknowledge-warnings]`
//! uploads a spreadsheet, reviews the validation preview, submits
//! default duplicate resolutions, approves, and follows the run.
//! `dataport export <category>...` starts an export and downloads the
//! archive once ready.

mod config;

use std::sync::Arc;

use anyhow::{bail, Context};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use dataport_client::MigrationClient;
use dataport_core::export::categories::ExportCategory;
use dataport_core::import::options::ImportOptions;
use dataport_core::import::preview::unmapped_required_columns;
use dataport_core::import::review::IssueBreakdown;
use dataport_core::import::status::ImportStatus;
use dataport_core::template::{ImportDataType, TemplateSummary};
use dataport_workflow::service::FileUpload;
use dataport_workflow::{ExportState, ExportWorkflow, ImportState, ImportWorkflow};

use config::CliConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dataport=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CliConfig::from_env();
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("import") => run_import(&config, &args[1..]).await,
        Some("export") => run_export(&config, &args[1..]).await,
        _ => {
            eprintln!("Usage:");
            eprintln!("  dataport import <template-id> <file> [--acknowledge-warnings]");
            eprintln!("  dataport export <category>...");
            std::process::exit(2);
        }
    }
}

async fn run_import(config: &CliConfig, args: &[String]) -> anyhow::Result<()> {
    let (template_id, file_path) = match args {
        [id, path, ..] => (id, path),
        _ => bail!("import needs a template id and a file path"),
    };
    let acknowledge_warnings = args.iter().any(|a| a == "--acknowledge-warnings");

    let template_id: Uuid = template_id
        .parse()
        .context("template id must be a UUID")?;
    let data = tokio::fs::read(file_path)
        .await
        .with_context(|| format!("failed to read {file_path}"))?;
    let file_name = std::path::Path::new(file_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_path.clone());

    let service = Arc::new(MigrationClient::new(config.api_url.clone()));
    let workflow = ImportWorkflow::new(
        Arc::clone(&service),
        config.file_check(),
        config.import_poll_interval,
    );

    workflow.select_template(TemplateSummary {
        id: template_id,
        name: file_name.clone(),
        data_type: ImportDataType::Custom,
    })?;

    let content_type = content_type_for(&file_name);
    workflow
        .upload(
            FileUpload {
                file_name,
                content_type: content_type.to_string(),
                data,
            },
            ImportOptions::default(),
        )
        .await?;

    let ImportState::Preview { preview, .. } = workflow.state() else {
        bail!("upload did not produce a preview");
    };
    let breakdown = IssueBreakdown::from_preview(&preview);
    println!(
        "Preview: {} rows, {} importable, {} error rows, {} warning rows ({} issues: {}E/{}W/{}I)",
        preview.total_rows,
        preview.importable_rows,
        preview.error_rows,
        preview.warning_rows,
        preview.total_issue_count,
        breakdown.errors,
        breakdown.warnings,
        breakdown.infos,
    );
    for issue in &preview.issues {
        println!(
            "  [{}] row {} {}: {}",
            issue.severity.as_str(),
            issue.row_number.map_or("-".to_string(), |r| r.to_string()),
            issue.column.as_deref().unwrap_or("-"),
            issue.message,
        );
    }

    let unmapped = unmapped_required_columns(&preview.column_mapping);
    if !unmapped.is_empty() {
        bail!("required columns are not mapped: {}", unmapped.join(", "));
    }

    if preview.error_rows > 0 {
        bail!(
            "{} row(s) have validation errors; fix the file and try again",
            preview.error_rows
        );
    }
    if preview.warning_rows > 0 && !acknowledge_warnings {
        bail!(
            "{} row(s) have warnings; re-run with --acknowledge-warnings to proceed",
            preview.warning_rows
        );
    }

    if !preview.duplicates.is_empty() {
        println!(
            "{} duplicate candidate(s); submitting default resolutions",
            preview.duplicates.len()
        );
        workflow.submit_resolutions().await?;
    }

    workflow.approve(acknowledge_warnings).await?;

    let mut updates = workflow.subscribe();
    let progress = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            if let ImportState::Importing { job, .. } = &*updates.borrow() {
                println!(
                    "  {}% -- {}/{} rows",
                    job.progress_percent,
                    job.processed_rows,
                    job.total_rows.map_or("?".to_string(), |t| t.to_string()),
                );
            }
        }
    });

    let outcome = workflow.run().await?;
    progress.abort();

    match outcome {
        Some(ImportStatus::Completed) => {
            if let ImportState::Complete { job } = workflow.state() {
                println!(
                    "Import completed: {} imported, {} skipped",
                    job.successful_rows, job.skipped_rows
                );
            }
            Ok(())
        }
        Some(status) => {
            if let ImportState::Importing { job, .. } = workflow.state() {
                println!(
                    "Import ended as {status}: {} imported, {} failed, {} skipped",
                    job.successful_rows, job.failed_rows, job.skipped_rows
                );
                for error in &job.error_summary {
                    println!("  row {}: {}", error.row_number, error.message);
                }
            }
            std::process::exit(1);
        }
        None => bail!("import polling was cancelled"),
    }
}

async fn run_export(config: &CliConfig, args: &[String]) -> anyhow::Result<()> {
    if args.is_empty() {
        bail!("export needs at least one category");
    }
    let categories: Vec<ExportCategory> = args
        .iter()
        .map(|raw| raw.parse().map_err(anyhow::Error::from))
        .collect::<anyhow::Result<_>>()?;

    let service = Arc::new(MigrationClient::new(config.api_url.clone()));
    let workflow = ExportWorkflow::new(Arc::clone(&service), config.export_poll_interval, None);

    workflow.load_catalog().await?;
    for category in &categories {
        workflow.toggle_category(*category)?;
    }

    if workflow.privacy_review_required() {
        println!(
            "Note: the selection contains personal data; privacy options \
             can be set via the web app before sharing the archive"
        );
    }

    workflow.start().await?;
    let outcome = workflow.run().await?;

    match outcome {
        Some(status) if !status.is_failure() => {
            let bytes = workflow.download().await?;
            let file_name = match workflow.state() {
                ExportState::Complete { job } => format!("export_{}.zip", job.id),
                _ => "export.zip".to_string(),
            };
            tokio::fs::write(&file_name, &bytes)
                .await
                .with_context(|| format!("failed to write {file_name}"))?;
            println!("Export ready: {} ({} bytes)", file_name, bytes.len());
            Ok(())
        }
        Some(status) => {
            if let ExportState::Exporting { error: Some(message), .. } = workflow.state() {
                eprintln!("Export {status}: {message}");
            }
            std::process::exit(1);
        }
        None => bail!("export polling was cancelled"),
    }
}

/// MIME type for an upload, from the file extension.
fn content_type_for(file_name: &str) -> &'static str {
    match file_name.rsplit('.').next().map(str::to_lowercase).as_deref() {
        Some("csv") => "text/csv",
        Some("xls") => "application/vnd.ms-excel",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}
