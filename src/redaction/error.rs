//! Redaction error types

/// The source image could not be loaded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("No image source was provided")]
    NoSource,

    #[error("Image could not be loaded from any source: {}", .attempts.join("; "))]
    AllOriginsFailed { attempts: Vec<String> },
}

/// Errors from editing or exporting a redacted image
#[derive(Debug, thiserror::Error)]
pub enum RedactionError {
    #[error("No image is loaded")]
    NotLoaded,

    #[error("Failed to encode redacted image: {0}")]
    Encode(#[from] image::ImageError),
}
