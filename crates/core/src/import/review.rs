//! Aggregation and gating logic for the validation preview screen.
//!
//! Pure given its inputs: counts issues by severity, decides whether the
//! import may be approved, and filters the issue list for the browser.

use super::preview::{ImportPreview, Severity, ValidationIssue};

// ---------------------------------------------------------------------------
// Issue breakdown & approval gate
// ---------------------------------------------------------------------------

/// Issue counts partitioned by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssueBreakdown {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

impl IssueBreakdown {
    /// Partition a preview's issue list by severity.
    pub fn from_preview(preview: &ImportPreview) -> Self {
        Self::from_issues(&preview.issues)
    }

    pub fn from_issues(issues: &[ValidationIssue]) -> Self {
        let mut breakdown = Self {
            errors: 0,
            warnings: 0,
            infos: 0,
        };
        for issue in issues {
            match issue.severity {
                Severity::Error => breakdown.errors += 1,
                Severity::Warning => breakdown.warnings += 1,
                Severity::Info => breakdown.infos += 1,
            }
        }
        breakdown
    }
}

/// Decide whether an import may be approved right now.
///
/// Errors are never approvable around: an invalid preview (any error rows)
/// blocks regardless of acknowledgement. Warnings block until the user
/// explicitly acknowledges them. Info issues never block.
pub fn can_approve(preview: &ImportPreview, acknowledge_warnings: bool) -> bool {
    if !preview.is_valid || preview.error_rows > 0 {
        return false;
    }
    preview.warning_rows == 0 || acknowledge_warnings
}

// ---------------------------------------------------------------------------
// Issue filtering
// ---------------------------------------------------------------------------

/// Filter for the full-issue browser. All set fields must match (AND).
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    pub severity: Option<Severity>,
    pub column: Option<String>,
    /// Case-insensitive substring match against message, code, or
    /// original value.
    pub text: Option<String>,
}

impl IssueFilter {
    pub fn matches(&self, issue: &ValidationIssue) -> bool {
        if let Some(severity) = self.severity {
            if issue.severity != severity {
                return false;
            }
        }
        if let Some(ref column) = self.column {
            if issue.column.as_deref() != Some(column.as_str()) {
                return false;
            }
        }
        if let Some(ref text) = self.text {
            let needle = text.to_lowercase();
            let haystacks = [
                Some(issue.message.as_str()),
                Some(issue.code.as_str()),
                issue.original_value.as_deref(),
            ];
            if !haystacks
                .iter()
                .flatten()
                .any(|h| h.to_lowercase().contains(&needle))
            {
                return false;
            }
        }
        true
    }

    /// Apply the filter to an issue list, preserving order.
    pub fn apply<'a>(&self, issues: &'a [ValidationIssue]) -> Vec<&'a ValidationIssue> {
        issues.iter().filter(|i| self.matches(i)).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
