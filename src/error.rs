use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Credentials error: {0}")]
    Credentials(#[from] CredentialsError),
}

/// Errors from the post-session analysis request
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Transcript is empty, nothing to analyze")]
    EmptyTranscript,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Analysis request timed out after {0} seconds")]
    Timeout(u64),
}

/// Credential lookup errors
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{0} is empty")]
    Empty(&'static str),
}
