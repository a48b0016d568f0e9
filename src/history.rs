//! Session history store
//!
//! Completed sessions are kept most-recent-first in `history.json` inside
//! the data directory. Every mutation is written back immediately.

use crate::analysis::SessionAnalysis;
use crate::live::Turn;
use crate::scenario::Scenario;
use crate::storage::{self, StorageError};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File name of the history document
pub const HISTORY_FILE: &str = "history.json";

/// A completed, persisted consultation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    /// Local creation time, `%Y-%m-%d %H:%M`
    pub date: String,
    pub transcript: Vec<Turn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<SessionAnalysis>,
    pub scenario: Scenario,
}

impl SessionRecord {
    /// Build a record for a finished session
    ///
    /// Pass `SessionAnalysis::unavailable` when the analysis request failed.
    pub fn new(transcript: Vec<Turn>, scenario: Scenario, analysis: SessionAnalysis) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            date: Local::now().format("%Y-%m-%d %H:%M").to_string(),
            transcript,
            analysis: Some(analysis),
            scenario,
        }
    }
}

/// Most-recent-first collection of session records backed by a JSON file
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    records: Vec<SessionRecord>,
}

impl HistoryStore {
    /// Load the store from `path`
    ///
    /// A missing file yields an empty store. An unreadable or corrupt file is
    /// logged and also yields an empty store; it is overwritten on the next
    /// mutation.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match storage::read_json::<Vec<SessionRecord>>(&path) {
            Ok(Some(records)) => {
                info!(path = %path.display(), count = records.len(), "Loaded session history");
                records
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Session history unreadable, starting empty");
                Vec::new()
            }
        };
        Self { path, records }
    }

    /// Load `history.json` from a data directory
    pub fn in_dir(dir: &Path) -> Self {
        Self::load(dir.join(HISTORY_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> Result<(), StorageError> {
        storage::write_json(&self.path, &self.records)
    }

    /// Insert a record at the front and persist
    ///
    /// On a failed write the record is taken back out, so memory matches disk.
    pub fn append(&mut self, record: SessionRecord) -> Result<(), StorageError> {
        info!(id = %record.id, scenario = %record.scenario, "Saving session to history");
        self.records.insert(0, record);
        if let Err(e) = self.save() {
            self.records.remove(0);
            return Err(e);
        }
        Ok(())
    }

    /// Remove the record with `id` and persist
    ///
    /// Returns `false` and leaves the file untouched when no record matches.
    /// On a failed write the record is restored at its old position.
    pub fn remove(&mut self, id: &str) -> Result<bool, StorageError> {
        let Some(index) = self.records.iter().position(|r| r.id == id) else {
            return Ok(false);
        };
        let removed = self.records.remove(index);
        if let Err(e) = self.save() {
            self.records.insert(index, removed);
            return Err(e);
        }
        info!(id = %id, "Removed session from history");
        Ok(true)
    }

    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&SessionRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::Role;
    use std::fs;

    fn record(text: &str) -> SessionRecord {
        SessionRecord::new(
            vec![Turn::new(Role::User, text)],
            Scenario::WitnessPreparation,
            SessionAnalysis {
                strong_points: vec!["Consistent".into()],
                improvements: vec![],
            },
        )
    }

    #[test]
    fn test_new_record_carries_analysis_and_id() {
        let a = record("one");
        let b = record("two");
        assert!(a.analysis.is_some());
        assert_ne!(a.id, b.id);
        assert_eq!(a.date.len(), "2024-01-01 10:00".len());
    }

    #[test]
    fn test_record_json_layout() {
        let mut rec = record("hello");
        rec.id = "abc".into();
        rec.date = "2024-05-01 09:30".into();
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "abc",
                "date": "2024-05-01 09:30",
                "transcript": [{"role": "user", "text": "hello"}],
                "analysis": {"strongPoints": ["Consistent"], "improvements": []},
                "scenario": "witness_preparation"
            })
        );
    }

    #[test]
    fn test_record_without_analysis_loads() {
        let json = r#"{"id":"x","date":"2024-05-01 09:30","transcript":[],"scenario":"courtroom_practice"}"#;
        let rec: SessionRecord = serde_json::from_str(json).unwrap();
        assert!(rec.analysis.is_none());
        assert_eq!(rec.scenario, Scenario::CourtroomPractice);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::in_dir(dir.path());
        assert!(store.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HISTORY_FILE);
        fs::write(&path, "{not json").unwrap();
        let store = HistoryStore::load(&path);
        assert!(store.is_empty());
    }

    #[test]
    fn test_append_prepends_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = HistoryStore::in_dir(dir.path());
        let first = record("first");
        let second = record("second");
        store.append(first.clone()).unwrap();
        store.append(second.clone()).unwrap();

        assert_eq!(store.records()[0], second);
        assert_eq!(store.records()[1], first);

        let reloaded = HistoryStore::in_dir(dir.path());
        assert_eq!(reloaded.records(), store.records());
    }

    #[test]
    fn test_remove_only_matching_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = HistoryStore::in_dir(dir.path());
        let keep = record("keep");
        let drop = record("drop");
        store.append(keep.clone()).unwrap();
        store.append(drop.clone()).unwrap();

        assert!(store.remove(&drop.id).unwrap());
        assert_eq!(store.records(), &[keep.clone()]);
        assert!(store.get(&drop.id).is_none());

        let reloaded = HistoryStore::in_dir(dir.path());
        assert_eq!(reloaded.records(), &[keep]);
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = HistoryStore::in_dir(dir.path());
        store.append(record("only")).unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        assert!(!store.remove("missing").unwrap());
        assert_eq!(store.records().len(), 1);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn test_failed_append_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let mut store = HistoryStore::in_dir(&blocker);

        assert!(store.append(record("lost")).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_failed_remove_restores_record() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        let mut store = HistoryStore::in_dir(&data);
        let first = record("first");
        let second = record("second");
        store.append(first.clone()).unwrap();
        store.append(second.clone()).unwrap();

        // Swap the data directory for a plain file so the next write fails
        fs::remove_dir_all(&data).unwrap();
        fs::write(&data, "not a directory").unwrap();

        assert!(store.remove(&first.id).is_err());
        assert_eq!(store.records(), &[second, first]);
    }
}
