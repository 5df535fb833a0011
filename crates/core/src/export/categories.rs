//! Exportable data categories and privacy options.

use serde::{Deserialize, Serialize};

/// Data categories available for export. The archive contains one CSV
/// per selected category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportCategory {
    Buildings,
    Units,
    Residents,
    Financials,
    Faults,
    Documents,
    Votes,
    Meters,
}

impl ExportCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buildings => "buildings",
            Self::Units => "units",
            Self::Residents => "residents",
            Self::Financials => "financials",
            Self::Faults => "faults",
            Self::Documents => "documents",
            Self::Votes => "votes",
            Self::Meters => "meters",
        }
    }
}

impl std::fmt::Display for ExportCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExportCategory {
    type Err = crate::error::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buildings" => Ok(Self::Buildings),
            "units" => Ok(Self::Units),
            "residents" => Ok(Self::Residents),
            "financials" => Ok(Self::Financials),
            "faults" => Ok(Self::Faults),
            "documents" => Ok(Self::Documents),
            "votes" => Ok(Self::Votes),
            "meters" => Ok(Self::Meters),
            other => Err(crate::error::CoreError::Validation(format!(
                "Unknown export category '{other}'"
            ))),
        }
    }
}

/// Catalog entry describing one exportable category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub id: ExportCategory,
    pub name: String,
    pub description: String,
    /// Approximate record count for the organization.
    pub record_count: u64,
    /// Whether exporting this category includes personal data.
    pub contains_personal_data: bool,
}

/// Anonymization choices offered before an export starts.
///
/// All default to off -- offering them is mandatory when personal data is
/// in the selection, applying them is the user's call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PrivacyOptions {
    /// Replace names, emails, and phone numbers with placeholders.
    pub anonymize_personal_data: bool,
    /// Mask account and payment identifiers.
    pub mask_financial_data: bool,
    /// Export document metadata only, not contents.
    pub exclude_document_contents: bool,
    /// Replace record IDs with salted hashes.
    pub hash_identifiers: bool,
}

/// Returns `true` when the privacy panel must be shown for a selection:
/// any selected category is flagged as containing personal data.
pub fn privacy_review_required(selected: &[ExportCategory], catalog: &[CategoryInfo]) -> bool {
    catalog
        .iter()
        .any(|info| info.contains_personal_data && selected.contains(&info.id))
}
