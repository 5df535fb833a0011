/// Import jobs, export jobs, and templates are identified by UUIDs
/// assigned by the backend.
pub type JobId = uuid::Uuid;

/// Export job identifier.
pub type ExportId = uuid::Uuid;

/// Field-mapping template identifier.
pub type TemplateId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
