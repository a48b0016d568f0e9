//! User preferences storage
//!
//! Handles saving and loading user preferences to a JSON file
//! in the user's config directory.

use crate::locale;
use crate::scenario::Scenario;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// User preferences
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Locale for the assistant and the analysis (e.g., "en", "es")
    /// Defaults to "en" if not set
    pub locale: Option<String>,
    /// Scenario used when none is given on the command line
    pub scenario: Option<Scenario>,
    /// Custom directory for session history and recent uploads
    pub data_location: Option<PathBuf>,
    /// Custom directory for exported session reports
    pub export_location: Option<PathBuf>,
}

impl Preferences {
    pub fn locale(&self) -> String {
        self.locale
            .as_deref()
            .map(locale::normalize)
            .unwrap_or_else(|| locale::DEFAULT_LOCALE.to_string())
    }

    pub fn scenario(&self) -> Scenario {
        self.scenario.unwrap_or_default()
    }

    /// Directory holding history.json and recent_uploads.json
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data_location
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("Lexvox")))
    }

    /// Directory for markdown session exports
    pub fn export_dir(&self) -> Option<PathBuf> {
        self.export_location
            .clone()
            .or_else(default_export_location)
    }
}

/// Changes to apply to stored preferences; `None` keeps the current value
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PreferencesUpdate {
    pub locale: Option<String>,
    pub scenario: Option<Scenario>,
    pub data_location: Option<PathBuf>,
    pub export_location: Option<PathBuf>,
}

impl PreferencesUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Preferences {
    pub fn apply(&mut self, update: PreferencesUpdate) {
        if let Some(code) = update.locale {
            self.locale = Some(locale::normalize(&code));
        }
        if let Some(scenario) = update.scenario {
            self.scenario = Some(scenario);
        }
        if let Some(dir) = update.data_location {
            self.data_location = Some(dir);
        }
        if let Some(dir) = update.export_location {
            self.export_location = Some(dir);
        }
    }
}

/// Get the preferences file path
fn preferences_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("Lexvox").join("preferences.json"))
}

/// Get the default export location
pub fn default_export_location() -> Option<PathBuf> {
    dirs::document_dir().map(|d| d.join("Lexvox").join("sessions"))
}

/// Load preferences from disk
///
/// Returns default preferences if the file doesn't exist or can't be read
pub fn load_preferences() -> Preferences {
    match preferences_path() {
        Some(path) => load_preferences_from(&path),
        None => Preferences::default(),
    }
}

pub(crate) fn load_preferences_from(path: &Path) -> Preferences {
    if !path.exists() {
        return Preferences::default();
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(prefs) => prefs,
            Err(e) => {
                error!("Failed to parse preferences: {}", e);
                Preferences::default()
            }
        },
        Err(e) => {
            error!("Failed to read preferences file: {}", e);
            Preferences::default()
        }
    }
}

/// Save preferences to disk
pub fn save_preferences(prefs: &Preferences) -> Result<(), PreferencesError> {
    let path = preferences_path().ok_or(PreferencesError::NoConfigDir)?;
    save_preferences_to(&path, prefs)
}

pub(crate) fn save_preferences_to(path: &Path, prefs: &Preferences) -> Result<(), PreferencesError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
            info!("Created preferences directory: {:?}", parent);
        }
    }

    let json = serde_json::to_string_pretty(prefs)?;
    fs::write(path, json)?;
    info!("Saved preferences to: {:?}", path);

    Ok(())
}

/// Preferences errors
#[derive(Debug, thiserror::Error)]
pub enum PreferencesError {
    #[error("Could not find config directory")]
    NoConfigDir,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_update_keeps_unset_fields() {
        let mut prefs = Preferences {
            locale: Some("fr".to_string()),
            data_location: Some(PathBuf::from("/data")),
            ..Default::default()
        };
        prefs.apply(PreferencesUpdate {
            locale: Some("ES".to_string()),
            scenario: Some(Scenario::CourtroomPractice),
            ..Default::default()
        });
        assert_eq!(prefs.locale(), "es");
        assert_eq!(prefs.scenario(), Scenario::CourtroomPractice);
        assert_eq!(prefs.data_location, Some(PathBuf::from("/data")));
        assert!(PreferencesUpdate::default().is_empty());
    }

    #[test]
    fn test_applied_update_survives_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Lexvox").join("preferences.json");
        let mut prefs = load_preferences_from(&path);
        prefs.apply(PreferencesUpdate {
            export_location: Some(PathBuf::from("/exports")),
            ..Default::default()
        });
        save_preferences_to(&path, &prefs).unwrap();
        assert_eq!(load_preferences_from(&path), prefs);
    }

    #[test]
    fn test_default_preferences() {
        let prefs = Preferences::default();
        assert_eq!(prefs.locale(), "en");
        assert_eq!(prefs.scenario(), Scenario::InitialConsultation);
        assert!(prefs.data_location.is_none());
    }

    #[test]
    fn test_preferences_path() {
        let path = preferences_path();
        assert!(path.is_some());
        assert!(path.unwrap().ends_with("Lexvox/preferences.json"));
    }

    #[test]
    fn test_save_and_load_preferences() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("preferences.json");
        let prefs = Preferences {
            locale: Some("es-MX".to_string()),
            scenario: Some(Scenario::CourtroomPractice),
            data_location: Some(dir.path().to_path_buf()),
            export_location: None,
        };

        save_preferences_to(&path, &prefs).unwrap();
        let loaded = load_preferences_from(&path);
        assert_eq!(loaded, prefs);
        assert_eq!(loaded.locale(), "es");
        assert_eq!(loaded.data_dir().unwrap(), dir.path());
    }

    #[test]
    fn test_corrupt_preferences_fall_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(load_preferences_from(&path), Preferences::default());
    }
}
