//! Error types for the live session module

/// WebSocket connection timeout in seconds
pub(crate) const WS_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur while connecting or talking to a live session
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    #[error("A live session is already connecting or active")]
    AlreadyConnected,

    #[error("No live session is active")]
    NotConnected,

    #[error("The connection attempt was cancelled by a disconnect")]
    Cancelled,

    #[error("Connection error: {0}")]
    Transport(String),

    #[error("Connection timeout - the service did not respond within {WS_CONNECT_TIMEOUT_SECS} seconds")]
    Timeout,
}
