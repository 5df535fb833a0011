//! Export history as an injected store.
//!
//! History is persisted state with an explicit load/save lifecycle, not
//! an ambient global: the export workflow receives a [`HistoryStore`]
//! and rewrites the full list on change. The in-memory implementation
//! backs tests and the CLI; a real deployment persists to disk.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use dataport_core::export::categories::ExportCategory;
use dataport_core::export::status::ExportStatus;
use dataport_core::types::{ExportId, Timestamp};

/// One finished (or failed) export, as remembered across sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportHistoryEntry {
    pub export_id: ExportId,
    pub status: ExportStatus,
    pub categories: Vec<ExportCategory>,
    pub file_size_bytes: Option<u64>,
    pub finished_at: Timestamp,
    pub download_count: u32,
}

/// A history store failed to load or save.
#[derive(Debug, thiserror::Error)]
#[error("History store error: {0}")]
pub struct HistoryError(pub String);

/// Persistence boundary for export history.
pub trait HistoryStore: Send + Sync {
    fn load(&self) -> Result<Vec<ExportHistoryEntry>, HistoryError>;
    fn save(&self, entries: &[ExportHistoryEntry]) -> Result<(), HistoryError>;
}

/// Volatile store for tests and the CLI.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    entries: Mutex<Vec<ExportHistoryEntry>>,
}

impl HistoryStore for InMemoryHistoryStore {
    fn load(&self) -> Result<Vec<ExportHistoryEntry>, HistoryError> {
        Ok(self.entries.lock().unwrap().clone())
    }

    fn save(&self, entries: &[ExportHistoryEntry]) -> Result<(), HistoryError> {
        *self.entries.lock().unwrap() = entries.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn entry(download_count: u32) -> ExportHistoryEntry {
        ExportHistoryEntry {
            export_id: Uuid::new_v4(),
            status: ExportStatus::Ready,
            categories: vec![ExportCategory::Buildings],
            file_size_bytes: Some(1024),
            finished_at: chrono::Utc::now(),
            download_count,
        }
    }

    #[test]
    fn in_memory_store_round_trips() {
        let store = InMemoryHistoryStore::default();
        assert!(store.load().unwrap().is_empty());

        let entries = vec![entry(0), entry(2)];
        store.save(&entries).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].download_count, 2);
    }

    #[test]
    fn save_replaces_previous_contents() {
        let store = InMemoryHistoryStore::default();
        store.save(&[entry(0)]).unwrap();
        store.save(&[entry(1), entry(2), entry(3)]).unwrap();
        assert_eq!(store.load().unwrap().len(), 3);
    }
}
