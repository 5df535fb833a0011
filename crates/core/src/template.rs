//! Field-mapping template summaries.
//!
//! Template CRUD and field editing live elsewhere; the workflow only
//! needs to know which template was chosen and what it imports.

use serde::{Deserialize, Serialize};

use crate::types::TemplateId;

/// Kind of data a template imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportDataType {
    Buildings,
    Units,
    Residents,
    Financials,
    Faults,
    Documents,
    Meters,
    Votes,
    Custom,
}

impl ImportDataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buildings => "buildings",
            Self::Units => "units",
            Self::Residents => "residents",
            Self::Financials => "financials",
            Self::Faults => "faults",
            Self::Documents => "documents",
            Self::Meters => "meters",
            Self::Votes => "votes",
            Self::Custom => "custom",
        }
    }
}

impl std::fmt::Display for ImportDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The template selection carried through the import workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub id: TemplateId,
    pub name: String,
    pub data_type: ImportDataType,
}
