use std::time::Duration;

use dataport_core::file_check::FileCheckConfig;
use dataport_workflow::poller::{DEFAULT_EXPORT_POLL_INTERVAL, DEFAULT_IMPORT_POLL_INTERVAL};

/// CLI configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Migration API root (default: `http://localhost:3000/api/v1/migration`).
    pub api_url: String,
    /// Seconds between import status fetches (default: `2`).
    pub import_poll_interval: Duration,
    /// Seconds between export status fetches (default: `3`).
    pub export_poll_interval: Duration,
    /// Maximum upload size in megabytes (default: `100`).
    pub max_upload_size_mb: u64,
}

impl CliConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                                   |
    /// |-----------------------------|-------------------------------------------|
    /// | `MIGRATION_API_URL`         | `http://localhost:3000/api/v1/migration`  |
    /// | `IMPORT_POLL_INTERVAL_SECS` | `2`                                       |
    /// | `EXPORT_POLL_INTERVAL_SECS` | `3`                                       |
    /// | `MAX_UPLOAD_SIZE_MB`        | `100`                                     |
    pub fn from_env() -> Self {
        let api_url = std::env::var("MIGRATION_API_URL")
            .unwrap_or_else(|_| "http://localhost:3000/api/v1/migration".into());

        let import_poll_secs: u64 = std::env::var("IMPORT_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| DEFAULT_IMPORT_POLL_INTERVAL.as_secs().to_string())
            .parse()
            .expect("IMPORT_POLL_INTERVAL_SECS must be a valid u64");

        let export_poll_secs: u64 = std::env::var("EXPORT_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| DEFAULT_EXPORT_POLL_INTERVAL.as_secs().to_string())
            .parse()
            .expect("EXPORT_POLL_INTERVAL_SECS must be a valid u64");

        let max_upload_size_mb: u64 = std::env::var("MAX_UPLOAD_SIZE_MB")
            .unwrap_or_else(|_| "100".into())
            .parse()
            .expect("MAX_UPLOAD_SIZE_MB must be a valid u64");

        Self {
            api_url,
            import_poll_interval: Duration::from_secs(import_poll_secs),
            export_poll_interval: Duration::from_secs(export_poll_secs),
            max_upload_size_mb,
        }
    }

    pub fn file_check(&self) -> FileCheckConfig {
        FileCheckConfig {
            max_file_size_bytes: self.max_upload_size_mb * 1024 * 1024,
        }
    }
}
