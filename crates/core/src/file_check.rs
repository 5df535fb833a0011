//! Client-side gate for candidate import files.
//!
//! A file is checked before any network call: wrong extension/MIME type or
//! an oversized file is rejected inline and the upload step never starts.

use crate::error::CoreError;

// ── Constants ────────────────────────────────────────────────────────

/// Spreadsheet extensions accepted for import, lowercase, without the dot.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["csv", "xlsx", "xls"];

/// MIME types accepted for import. Browsers are inconsistent about CSV,
/// so both the RFC type and the legacy Excel types are allowed.
pub const ACCEPTED_MIME_TYPES: &[&str] = &[
    "text/csv",
    "application/csv",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

/// Default upload size ceiling: 100 MB.
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 100 * 1024 * 1024;

// ── Config ───────────────────────────────────────────────────────────

/// Tunable limits for the pre-upload file gate.
#[derive(Debug, Clone)]
pub struct FileCheckConfig {
    /// Maximum accepted file size in bytes.
    pub max_file_size_bytes: u64,
}

impl Default for FileCheckConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
        }
    }
}

// ── Checks ───────────────────────────────────────────────────────────

/// Returns `true` if the extension (without dot, any case) is accepted.
pub fn is_accepted_extension(extension: &str) -> bool {
    ACCEPTED_EXTENSIONS.contains(&extension.to_lowercase().as_str())
}

/// Returns `true` if the MIME type is accepted. Parameters after `;`
/// (e.g. `text/csv; charset=utf-8`) are ignored.
pub fn is_accepted_mime_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();
    ACCEPTED_MIME_TYPES.contains(&essence.as_str())
}

/// Extract a lowercase extension from a file name, if any.
fn extension_of(file_name: &str) -> Option<String> {
    match file_name.rfind('.') {
        Some(pos) if pos > 0 && pos + 1 < file_name.len() => {
            Some(file_name[pos + 1..].to_lowercase())
        }
        _ => None,
    }
}

/// Validate a candidate import file against the gate.
///
/// A file passes when its extension OR its MIME type is accepted (either
/// signal is enough -- exports from some tools carry a generic MIME type
/// with a correct extension) AND its size is within the configured limit.
pub fn validate_upload(
    file_name: &str,
    content_type: &str,
    size_bytes: u64,
    config: &FileCheckConfig,
) -> Result<(), CoreError> {
    let extension_ok = extension_of(file_name)
        .map(|ext| is_accepted_extension(&ext))
        .unwrap_or(false);

    if !extension_ok && !is_accepted_mime_type(content_type) {
        return Err(CoreError::Validation(format!(
            "Unsupported file type for \"{file_name}\". Accepted formats: {}",
            ACCEPTED_EXTENSIONS.join(", ")
        )));
    }

    if size_bytes > config.max_file_size_bytes {
        return Err(CoreError::Validation(format!(
            "File exceeds the maximum size of {} MB",
            config.max_file_size_bytes / 1024 / 1024
        )));
    }

    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────
