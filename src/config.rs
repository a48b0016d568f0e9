//! Service configuration embedded from config.toml

use crate::error::AppError;
use serde::Deserialize;

const CONFIG_TOML: &str = include_str!("../config.toml");

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub realtime: RealtimeConfig,
    pub analysis: AnalysisConfig,
}

/// Realtime session endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Base WebSocket URL, without query string
    pub url: String,
    /// Conversation model
    pub model: String,
    /// Model used to transcribe the user's speech
    pub transcription_model: String,
}

/// Post-session analysis endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Chat Completions URL
    pub url: String,
    pub model: String,
}

/// Load configuration from embedded config.toml
pub fn load_config() -> Result<AppConfig, AppError> {
    parse_config(CONFIG_TOML)
}

fn parse_config(text: &str) -> Result<AppConfig, AppError> {
    toml::from_str(text).map_err(|e| AppError::Config(e.to_string()))
}
