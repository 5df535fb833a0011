//! HTTP implementation of the migration service boundary.
//!
//! [`MigrationClient`] wraps the platform's migration REST API
//! (`/api/v1/migration/...`) using [`reqwest`] and implements the
//! workflow crate's [`ImportService`] and [`ExportService`] traits, so a
//! UI can drive the state machines against a real backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;

use dataport_core::export::categories::{CategoryInfo, ExportCategory, PrivacyOptions};
use dataport_core::export::job::ExportJob;
use dataport_core::import::duplicates::Resolution;
use dataport_core::import::job::ImportJob;
use dataport_core::import::preview::ImportPreview;
use dataport_core::types::{ExportId, JobId};
use dataport_workflow::service::{
    ExportService, ImportService, ServiceError, UploadAccepted, UploadRequest,
};

/// HTTP client for the migration API of one platform deployment.
pub struct MigrationClient {
    client: reqwest::Client,
    base_url: String,
}

/// Errors from the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// A request body could not be encoded.
    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    /// The backend returned a non-2xx status code.
    #[error("Migration API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl From<ClientError> for ServiceError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Request(e) => ServiceError::Transport(e.to_string()),
            ClientError::Encode(e) => ServiceError::Rejected(e.to_string()),
            ClientError::Api { status: 404, .. } => ServiceError::NotFound,
            ClientError::Api { status, body } => {
                ServiceError::Rejected(format!("{status}: {body}"))
            }
        }
    }
}

// -- wire shapes the API returns that are not core types ---------------------

#[derive(Debug, Deserialize)]
struct UploadResponse {
    job_id: JobId,
    #[serde(default)]
    preview: Option<ImportPreview>,
}

#[derive(Debug, Deserialize)]
struct RetryResponse {
    job_id: JobId,
}

#[derive(Debug, Deserialize)]
struct StartExportResponse {
    export_id: ExportId,
}

#[derive(Debug, Deserialize)]
struct CategoriesResponse {
    categories: Vec<CategoryInfo>,
}

impl MigrationClient {
    /// Create a client for a deployment.
    ///
    /// * `base_url` - API root, e.g. `https://host/api/v1/migration`.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling).
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ClientError::Api`] with the
    /// status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ClientError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl ImportService for MigrationClient {
    /// `POST /import/upload` as multipart: template id, options, file.
    async fn upload(&self, request: UploadRequest) -> Result<UploadAccepted, ServiceError> {
        let options =
            serde_json::to_string(&request.options).map_err(ClientError::from)?;
        let file_part = reqwest::multipart::Part::bytes(request.file.data)
            .file_name(request.file.file_name)
            .mime_str(&request.file.content_type)
            .map_err(ClientError::from)?;
        let form = reqwest::multipart::Form::new()
            .text("template_id", request.template_id.to_string())
            .text("options", options)
            .part("file", file_part);

        let response = self
            .client
            .post(self.url("/import/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(ClientError::from)?;

        let accepted: UploadResponse =
            Self::parse_response(response).await?;
        Ok(UploadAccepted {
            job_id: accepted.job_id,
            preview: accepted.preview,
        })
    }

    /// `GET /import/jobs/{id}`.
    async fn fetch_status(&self, job_id: JobId) -> Result<ImportJob, ServiceError> {
        let response = self
            .client
            .get(self.url(&format!("/import/jobs/{job_id}")))
            .send()
            .await
            .map_err(ClientError::from)?;
        Ok(Self::parse_response(response).await?)
    }

    /// `GET /import/jobs/{id}/preview`.
    async fn fetch_preview(&self, job_id: JobId) -> Result<ImportPreview, ServiceError> {
        let response = self
            .client
            .get(self.url(&format!("/import/jobs/{job_id}/preview")))
            .send()
            .await
            .map_err(ClientError::from)?;
        Ok(Self::parse_response(response).await?)
    }

    /// `POST /import/jobs/{id}/duplicates/resolve`.
    async fn resolve_duplicates(
        &self,
        job_id: JobId,
        resolutions: BTreeMap<u32, Resolution>,
    ) -> Result<(), ServiceError> {
        let body = serde_json::json!({ "resolutions": resolutions });
        let response = self
            .client
            .post(self.url(&format!("/import/jobs/{job_id}/duplicates/resolve")))
            .json(&body)
            .send()
            .await
            .map_err(ClientError::from)?;
        Ok(Self::check_status(response).await?)
    }

    /// `POST /import/jobs/{id}/approve`.
    async fn approve(&self, job_id: JobId, acknowledge_warnings: bool) -> Result<(), ServiceError> {
        let body = serde_json::json!({ "acknowledge_warnings": acknowledge_warnings });
        let response = self
            .client
            .post(self.url(&format!("/import/jobs/{job_id}/approve")))
            .json(&body)
            .send()
            .await
            .map_err(ClientError::from)?;
        Ok(Self::check_status(response).await?)
    }

    /// `POST /import/jobs/{id}/retry`.
    async fn retry(&self, job_id: JobId) -> Result<JobId, ServiceError> {
        let response = self
            .client
            .post(self.url(&format!("/import/jobs/{job_id}/retry")))
            .send()
            .await
            .map_err(ClientError::from)?;
        let retried: RetryResponse = Self::parse_response(response).await?;
        Ok(retried.job_id)
    }

    /// `POST /import/jobs/{id}/cancel`.
    async fn cancel(&self, job_id: JobId) -> Result<(), ServiceError> {
        let response = self
            .client
            .post(self.url(&format!("/import/jobs/{job_id}/cancel")))
            .send()
            .await
            .map_err(ClientError::from)?;
        Ok(Self::check_status(response).await?)
    }
}

#[async_trait]
impl ExportService for MigrationClient {
    /// `GET /categories/export`.
    async fn categories(&self) -> Result<Vec<CategoryInfo>, ServiceError> {
        let response = self
            .client
            .get(self.url("/categories/export"))
            .send()
            .await
            .map_err(ClientError::from)?;
        let catalog: CategoriesResponse = Self::parse_response(response).await?;
        Ok(catalog.categories)
    }

    /// `POST /export`.
    async fn start(
        &self,
        categories: Vec<ExportCategory>,
        privacy: PrivacyOptions,
    ) -> Result<ExportId, ServiceError> {
        let body = serde_json::json!({
            "categories": categories,
            "privacy_options": privacy,
        });
        let response = self
            .client
            .post(self.url("/export"))
            .json(&body)
            .send()
            .await
            .map_err(ClientError::from)?;
        let started: StartExportResponse = Self::parse_response(response).await?;
        Ok(started.export_id)
    }

    /// `GET /export/{id}`.
    async fn fetch_status(&self, export_id: ExportId) -> Result<ExportJob, ServiceError> {
        let response = self
            .client
            .get(self.url(&format!("/export/{export_id}")))
            .send()
            .await
            .map_err(ClientError::from)?;
        Ok(Self::parse_response(response).await?)
    }

    /// Fetch the archive. The URL comes from the export snapshot and may
    /// point at a storage host outside the API.
    async fn download(&self, url: &str) -> Result<Vec<u8>, ServiceError> {
        let absolute = if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            self.url(url)
        };
        let response = self
            .client
            .get(absolute)
            .send()
            .await
            .map_err(ClientError::from)?;
        let response = Self::ensure_success(response)
            .await
            .map_err(ServiceError::from)?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
