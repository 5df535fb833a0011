//! Duplicate-candidate model and the resolution policy.
//!
//! Validation may match import rows against existing records. Each match
//! carries a confidence score; the policy assigns a default resolution per
//! candidate, lets the user override individually or in bulk, and refuses
//! to produce a submittable mapping while any candidate is unresolved.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Candidates at or above this confidence are treated as certain
/// duplicates and default to `Skip`; below it, data is preserved by
/// defaulting to `CreateNew`.
pub const CONFIDENT_DUPLICATE_THRESHOLD: u8 = 90;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How one duplicate candidate should be handled on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Do not import the row; the existing record stands.
    Skip,
    /// Overwrite the existing record with the row's values.
    Update,
    /// Import the row as a new, distinct record.
    CreateNew,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Update => "update",
            Self::CreateNew => "create_new",
        }
    }
}

/// One field whose value differs between the import row and the matched
/// existing record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDifference {
    pub field: String,
    pub import_value: Option<String>,
    pub existing_value: Option<String>,
}

/// An import row matched against an existing record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateRecord {
    /// Row number in the import file; unique within a batch.
    pub import_row: u32,
    /// The matched existing record.
    pub existing_id: uuid::Uuid,
    /// Key fields that matched.
    pub matched_fields: Vec<String>,
    /// Match confidence, 0–100.
    pub confidence: u8,
    /// Fields whose values differ.
    #[serde(default)]
    pub differences: Vec<FieldDifference>,
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Default resolution for a candidate with the given confidence.
pub fn default_resolution(confidence: u8) -> Resolution {
    if confidence >= CONFIDENT_DUPLICATE_THRESHOLD {
        Resolution::Skip
    } else {
        Resolution::CreateNew
    }
}

/// The user's working set of per-row resolutions for one duplicate batch.
///
/// Rows are keyed by `import_row`. The plan starts fully populated with
/// defaults, so there is always a choice to display for every candidate;
/// overrides mutate individual entries, bulk-apply rewrites all of them.
#[derive(Debug, Clone, Default)]
pub struct ResolutionPlan {
    choices: BTreeMap<u32, Resolution>,
}

impl ResolutionPlan {
    /// Build a plan with the default resolution for every candidate.
    pub fn with_defaults(duplicates: &[DuplicateRecord]) -> Self {
        Self {
            choices: duplicates
                .iter()
                .map(|d| (d.import_row, default_resolution(d.confidence)))
                .collect(),
        }
    }

    /// The current choice for a row, if the row is part of the batch.
    pub fn get(&self, import_row: u32) -> Option<Resolution> {
        self.choices.get(&import_row).copied()
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    /// Override the resolution for a single row.
    ///
    /// The policy never invents entries for rows outside the duplicate
    /// set, so overriding an unknown row is rejected.
    pub fn set(&mut self, import_row: u32, resolution: Resolution) -> Result<(), CoreError> {
        match self.choices.get_mut(&import_row) {
            Some(entry) => {
                *entry = resolution;
                Ok(())
            }
            None => Err(CoreError::Validation(format!(
                "Row {import_row} is not part of the duplicate set"
            ))),
        }
    }

    /// Apply one resolution to every row, overwriting all prior choices.
    pub fn bulk_apply(&mut self, resolution: Resolution) {
        for entry in self.choices.values_mut() {
            *entry = resolution;
        }
    }

    /// Returns `true` when every candidate in `duplicates` has a choice.
    pub fn covers(&self, duplicates: &[DuplicateRecord]) -> bool {
        duplicates
            .iter()
            .all(|d| self.choices.contains_key(&d.import_row))
    }

    /// Finalize the plan for submission.
    ///
    /// Fails if any candidate is still unresolved -- a partial mapping must
    /// never reach the backend, where missing rows would be dropped
    /// silently.
    pub fn into_complete(
        self,
        duplicates: &[DuplicateRecord],
    ) -> Result<BTreeMap<u32, Resolution>, CoreError> {
        let missing: Vec<u32> = duplicates
            .iter()
            .map(|d| d.import_row)
            .filter(|row| !self.choices.contains_key(row))
            .collect();

        if !missing.is_empty() {
            return Err(CoreError::Validation(format!(
                "{} duplicate row(s) have no resolution (rows: {})",
                missing.len(),
                missing
                    .iter()
                    .map(|r| r.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        Ok(self.choices)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(import_row: u32, confidence: u8) -> DuplicateRecord {
        DuplicateRecord {
            import_row,
            existing_id: uuid::Uuid::nil(),
            matched_fields: vec!["email".into()],
            confidence,
            differences: vec![],
        }
    }

    // -- defaults ------------------------------------------------------------

    #[test]
    fn high_confidence_defaults_to_skip() {
        assert_eq!(default_resolution(95), Resolution::Skip);
        assert_eq!(default_resolution(100), Resolution::Skip);
    }

    #[test]
    fn low_confidence_defaults_to_create_new() {
        assert_eq!(default_resolution(60), Resolution::CreateNew);
        assert_eq!(default_resolution(0), Resolution::CreateNew);
    }

    #[test]
    fn threshold_is_inclusive_on_the_skip_side() {
        assert_eq!(default_resolution(90), Resolution::Skip);
        assert_eq!(default_resolution(89), Resolution::CreateNew);
    }

    #[test]
    fn plan_starts_with_defaults_for_every_candidate() {
        let dups = vec![candidate(1, 95), candidate(2, 60)];
        let plan = ResolutionPlan::with_defaults(&dups);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.get(1), Some(Resolution::Skip));
        assert_eq!(plan.get(2), Some(Resolution::CreateNew));
    }

    // -- overrides -----------------------------------------------------------

    #[test]
    fn individual_override() {
        let dups = vec![candidate(1, 95), candidate(2, 60)];
        let mut plan = ResolutionPlan::with_defaults(&dups);
        plan.set(2, Resolution::Update).unwrap();
        assert_eq!(plan.get(1), Some(Resolution::Skip));
        assert_eq!(plan.get(2), Some(Resolution::Update));
    }

    #[test]
    fn override_outside_the_set_is_rejected() {
        let dups = vec![candidate(1, 95)];
        let mut plan = ResolutionPlan::with_defaults(&dups);
        let result = plan.set(99, Resolution::Skip);
        assert!(result.is_err());
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn bulk_apply_overwrites_every_choice() {
        let dups = vec![candidate(1, 95), candidate(2, 60), candidate(3, 91)];
        let mut plan = ResolutionPlan::with_defaults(&dups);
        plan.set(2, Resolution::Update).unwrap();

        plan.bulk_apply(Resolution::Skip);
        for row in [1, 2, 3] {
            assert_eq!(plan.get(row), Some(Resolution::Skip));
        }
    }

    // -- submission ----------------------------------------------------------

    #[test]
    fn complete_plan_submits() {
        let dups = vec![candidate(1, 95), candidate(2, 60)];
        let mut plan = ResolutionPlan::with_defaults(&dups);
        plan.set(2, Resolution::Update).unwrap();

        let mapping = plan.into_complete(&dups).unwrap();
        assert_eq!(mapping[&1], Resolution::Skip);
        assert_eq!(mapping[&2], Resolution::Update);
    }

    #[test]
    fn incomplete_plan_fails_submission() {
        let dups = vec![candidate(1, 95), candidate(2, 60)];
        // An empty plan rather than one built via with_defaults.
        let plan = ResolutionPlan::default();
        let result = plan.into_complete(&dups);
        assert!(result.is_err());
        let message = result.unwrap_err().to_string();
        assert!(message.contains("no resolution"));
        assert!(message.contains('1') && message.contains('2'));
    }

    #[test]
    fn covers_tracks_missing_rows() {
        let dups = vec![candidate(1, 95), candidate(2, 60)];
        let plan = ResolutionPlan::with_defaults(&dups[..1]);
        assert!(!plan.covers(&dups));
        assert!(plan.covers(&dups[..1]));
    }

    #[test]
    fn resolution_serde_uses_snake_case() {
        let json = serde_json::to_string(&Resolution::CreateNew).unwrap();
        assert_eq!(json, "\"create_new\"");
    }
}
