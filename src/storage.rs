//! Local storage helpers
//!
//! JSON documents (session history, recent uploads) live in the data
//! directory. Session reports are exported as markdown to the user's
//! Documents folder, or a custom location if configured in preferences.

use crate::history::SessionRecord;
use crate::live::Role;
use crate::preferences::Preferences;
use chrono::Local;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Ensure a directory exists
pub fn ensure_dir(dir: &Path) -> Result<(), StorageError> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| StorageError::CreateDirectory {
            path: dir.to_path_buf(),
            source: e,
        })?;
        info!("Created directory: {:?}", dir);
    }
    Ok(())
}

/// Path of a document inside the configured data directory
pub fn data_file(prefs: &Preferences, name: &str) -> Result<PathBuf, StorageError> {
    prefs
        .data_dir()
        .map(|dir| dir.join(name))
        .ok_or(StorageError::NoDataDir)
}

/// Read a JSON document, returning `None` if the file doesn't exist
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path).map_err(|e| StorageError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    let value = serde_json::from_str(&contents).map_err(|e| StorageError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(Some(value))
}

/// Write a JSON document, creating the parent directory if needed
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|e| StorageError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;
    fs::write(path, json).map_err(|e| StorageError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Render a session record as markdown
pub fn render_markdown(record: &SessionRecord) -> String {
    let mut out = format!("# {}\n\n_{}_\n\n## Transcript\n\n", record.scenario, record.date);
    for turn in &record.transcript {
        let speaker = match turn.role {
            Role::User => "You",
            Role::Assistant => "Counsel",
        };
        out.push_str(&format!("**{}:** {}\n\n", speaker, turn.text.trim()));
    }

    if let Some(analysis) = &record.analysis {
        out.push_str("## Strong Points\n\n");
        for point in &analysis.strong_points {
            out.push_str(&format!("- {}\n", point));
        }
        out.push_str("\n## Improvements\n\n");
        for point in &analysis.improvements {
            out.push_str(&format!("- {}\n", point));
        }
    }
    out
}

/// Export a session record to a markdown file in `dir`
///
/// Returns the path to the saved file
pub fn export_markdown(record: &SessionRecord, dir: &Path) -> Result<PathBuf, StorageError> {
    ensure_dir(dir)?;

    // Generate filename with timestamp
    let timestamp = Local::now().format("%Y-%m-%d-%H-%M-%S");
    let filename = format!("session-{}.md", timestamp);
    let filepath = dir.join(&filename);

    let mut file = fs::File::create(&filepath).map_err(|e| StorageError::CreateFile {
        path: filepath.clone(),
        source: e,
    })?;

    file.write_all(render_markdown(record).as_bytes())
        .and_then(|_| file.flush())
        .map_err(|e| StorageError::WriteFile {
            path: filepath.clone(),
            source: e,
        })?;

    info!("Exported session {} to: {:?}", record.id, filepath);
    Ok(filepath)
}

/// Storage errors with contextual information
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Could not determine a data directory")]
    NoDataDir,

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create file {path}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
