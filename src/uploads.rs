//! Case attachments
//!
//! `UploadList` is the in-memory set of files attached to the current
//! matter. A redacted image replaces its original in place. `RecentUploads`
//! remembers the last few attachment names across runs.

use crate::storage::{self, StorageError};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// File name of the recent-uploads document
pub const RECENT_UPLOADS_FILE: &str = "recent_uploads.json";

/// Number of entries kept in the recent-uploads list
pub const MAX_RECENT_UPLOADS: usize = 10;

/// An attachment held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Ordered list of attachments for the current matter
#[derive(Debug, Default)]
pub struct UploadList {
    files: Vec<UploadedFile>,
}

impl UploadList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, file: UploadedFile) {
        self.files.push(file);
    }

    /// Swap the file named `original` for `replacement`, keeping its position
    ///
    /// Appends when `original` is not in the list. Returns whether a file
    /// was replaced.
    pub fn replace(&mut self, original: &str, replacement: UploadedFile) -> bool {
        match self.files.iter_mut().find(|f| f.name == original) {
            Some(slot) => {
                *slot = replacement;
                true
            }
            None => {
                self.files.push(replacement);
                false
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<UploadedFile> {
        let index = self.files.iter().position(|f| f.name == name)?;
        Some(self.files.remove(index))
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }
}

/// One entry of the persisted recent-uploads list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentUpload {
    pub name: String,
    pub date: String,
}

/// Newest-first list of recently attached file names
#[derive(Debug)]
pub struct RecentUploads {
    path: PathBuf,
    entries: Vec<RecentUpload>,
}

impl RecentUploads {
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut entries = match storage::read_json::<Vec<RecentUpload>>(&path) {
            Ok(entries) => entries.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Recent uploads unreadable, starting empty");
                Vec::new()
            }
        };
        entries.truncate(MAX_RECENT_UPLOADS);
        Self { path, entries }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::load(dir.join(RECENT_UPLOADS_FILE))
    }

    /// Record `name` as the newest upload and persist
    ///
    /// An existing entry with the same name moves to the front.
    pub fn record(&mut self, name: &str) -> Result<(), StorageError> {
        self.entries.retain(|e| e.name != name);
        self.entries.insert(
            0,
            RecentUpload {
                name: name.to_string(),
                date: Local::now().format("%Y-%m-%d %H:%M").to_string(),
            },
        );
        self.entries.truncate(MAX_RECENT_UPLOADS);
        storage::write_json(&self.path, &self.entries)
    }

    pub fn entries(&self) -> &[RecentUpload] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, bytes: &[u8]) -> UploadedFile {
        UploadedFile {
            name: name.to_string(),
            mime_type: "image/png".to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut list = UploadList::new();
        list.add(file("lease.png", b"a"));
        list.add(file("id.png", b"b"));

        assert!(list.replace("lease.png", file("redacted_lease.png", b"c")));
        let names: Vec<_> = list.files().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["redacted_lease.png", "id.png"]);
    }

    #[test]
    fn test_replace_missing_appends() {
        let mut list = UploadList::new();
        assert!(!list.replace("gone.png", file("redacted_gone.png", b"x")));
        assert_eq!(list.files().len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut list = UploadList::new();
        list.add(file("a.png", b"a"));
        assert!(list.remove("b.png").is_none());
        assert_eq!(list.remove("a.png").unwrap().name, "a.png");
        assert!(list.files().is_empty());
    }

    #[test]
    fn test_recent_uploads_capped_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut recent = RecentUploads::in_dir(dir.path());
        for i in 0..12 {
            recent.record(&format!("file{}.png", i)).unwrap();
        }
        assert_eq!(recent.entries().len(), MAX_RECENT_UPLOADS);
        assert_eq!(recent.entries()[0].name, "file11.png");
        assert_eq!(recent.entries()[9].name, "file2.png");

        let reloaded = RecentUploads::in_dir(dir.path());
        assert_eq!(reloaded.entries(), recent.entries());
    }

    #[test]
    fn test_recent_uploads_moves_duplicate_to_front() {
        let dir = tempfile::tempdir().unwrap();
        let mut recent = RecentUploads::in_dir(dir.path());
        recent.record("a.png").unwrap();
        recent.record("b.png").unwrap();
        recent.record("a.png").unwrap();
        let names: Vec<_> = recent.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.png"]);
    }
}
