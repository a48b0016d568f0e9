//! Transport seam between the session manager and the streaming service

use super::error::ConnectionError;
use super::turns::Role;
use crate::audio::AudioChunk;
use crate::scenario::Scenario;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Parameters for opening a transport session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub locale: String,
    pub scenario: Scenario,
}

/// Inbound event from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A speech or text fragment tagged with its speaker
    Fragment { role: Role, text: String },
    /// Error reported by the service that does not end the session
    ServiceError { message: String },
    /// The connection dropped or was closed by the server
    Failed { reason: String },
}

/// Outbound input from the user
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    Audio(AudioChunk),
    Text(String),
}

/// An open transport session
///
/// Dropping `outbound` asks the IO task to close the connection cleanly;
/// `events` ends once the IO task is gone.
pub struct TransportSession {
    pub events: mpsc::Receiver<TransportEvent>,
    pub outbound: mpsc::Sender<OutboundMessage>,
    pub io_task: Option<JoinHandle<()>>,
}

/// Opens streaming voice/text sessions
#[async_trait]
pub trait LiveTransport: Send + Sync {
    async fn open(&self, request: &SessionRequest) -> Result<TransportSession, ConnectionError>;
}
