//! Validation preview types for the dry-run analysis of an uploaded file.

use serde::{Deserialize, Serialize};

use super::duplicates::DuplicateRecord;
use crate::types::JobId;

/// How serious a validation issue is.
///
/// Ordered for gating: errors block approval unconditionally, warnings
/// block until acknowledged, info never blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Ordinal rank: higher means more severe.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Error => 2,
            Self::Warning => 1,
            Self::Info => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// A single issue found while validating the uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Row number (1-indexed); `None` for file-level issues.
    pub row_number: Option<u32>,
    /// Column the issue belongs to, if attributable to one.
    pub column: Option<String>,
    pub severity: Severity,
    /// Machine-readable issue code (e.g. `PHONE_FORMAT`).
    pub code: String,
    pub message: String,
    /// The value as it appeared in the file.
    pub original_value: Option<String>,
    /// A proposed corrected value, when the validator can offer one.
    pub suggested_value: Option<String>,
}

/// How the previewed rows break down by planned action.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RecordCounts {
    /// New records to create.
    pub new_records: u32,
    /// Existing records to update.
    pub updates: u32,
    /// Rows to skip.
    pub skipped: u32,
}

/// Mapping state of one source column against the selected template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Column header as it appears in the file.
    pub source_column: String,
    /// Target field in the platform, when a mapping was found.
    pub target_field: Option<String>,
    pub is_mapped: bool,
    pub is_required: bool,
    /// A few sample values from the file, for display.
    #[serde(default)]
    pub sample_values: Vec<String>,
}

/// Source columns that are required by the template but not mapped.
pub fn unmapped_required_columns(mappings: &[ColumnMapping]) -> Vec<&str> {
    mappings
        .iter()
        .filter(|m| m.is_required && !m.is_mapped)
        .map(|m| m.source_column.as_str())
        .collect()
}

/// The aggregated validation preview for an uploaded file.
///
/// `issues` may be truncated by the backend; `total_issue_count` always
/// carries the full count. `is_valid` means "no error rows" -- warnings do
/// not make a preview invalid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportPreview {
    pub job_id: JobId,
    pub is_valid: bool,
    pub total_rows: u32,
    /// Rows that would be imported if approved as-is.
    pub importable_rows: u32,
    pub error_rows: u32,
    pub warning_rows: u32,
    pub record_counts: RecordCounts,
    pub issues: Vec<ValidationIssue>,
    pub total_issue_count: u32,
    /// Duplicate candidates detected against existing records.
    #[serde(default)]
    pub duplicates: Vec<DuplicateRecord>,
    /// First few parsed records, for display.
    #[serde(default)]
    pub sample_records: Vec<serde_json::Value>,
    #[serde(default)]
    pub column_mapping: Vec<ColumnMapping>,
}

impl ImportPreview {
    /// Check the internal consistency a preview payload should satisfy.
    pub fn is_consistent(&self) -> bool {
        self.is_valid == (self.error_rows == 0)
            && self.total_issue_count as usize >= self.issues.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn issue(severity: Severity) -> ValidationIssue {
        ValidationIssue {
            row_number: Some(1),
            column: None,
            severity,
            code: "X".into(),
            message: "x".into(),
            original_value: None,
            suggested_value: None,
        }
    }

    fn preview(error_rows: u32, is_valid: bool) -> ImportPreview {
        ImportPreview {
            job_id: Uuid::nil(),
            is_valid,
            total_rows: 10,
            importable_rows: 10 - error_rows,
            error_rows,
            warning_rows: 0,
            record_counts: RecordCounts::default(),
            issues: vec![],
            total_issue_count: 0,
            duplicates: vec![],
            sample_records: vec![],
            column_mapping: vec![],
        }
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Error.rank() > Severity::Warning.rank());
        assert!(Severity::Warning.rank() > Severity::Info.rank());
    }

    #[test]
    fn consistent_preview() {
        assert!(preview(0, true).is_consistent());
        assert!(preview(3, false).is_consistent());
    }

    #[test]
    fn inconsistent_validity_flag() {
        assert!(!preview(3, true).is_consistent());
        assert!(!preview(0, false).is_consistent());
    }

    #[test]
    fn truncated_issue_list_is_consistent() {
        let mut p = preview(0, true);
        p.issues = vec![issue(Severity::Info)];
        p.total_issue_count = 15;
        assert!(p.is_consistent());
    }

    #[test]
    fn issue_count_below_list_length_is_inconsistent() {
        let mut p = preview(0, true);
        p.issues = vec![issue(Severity::Info), issue(Severity::Info)];
        p.total_issue_count = 1;
        assert!(!p.is_consistent());
    }

    #[test]
    fn unmapped_required_columns_found() {
        let mappings = vec![
            ColumnMapping {
                source_column: "Building Name".into(),
                target_field: Some("name".into()),
                is_mapped: true,
                is_required: true,
                sample_values: vec![],
            },
            ColumnMapping {
                source_column: "Unit Number".into(),
                target_field: None,
                is_mapped: false,
                is_required: true,
                sample_values: vec![],
            },
            ColumnMapping {
                source_column: "Notes".into(),
                target_field: None,
                is_mapped: false,
                is_required: false,
                sample_values: vec![],
            },
        ];

        assert_eq!(unmapped_required_columns(&mappings), vec!["Unit Number"]);
    }
}
