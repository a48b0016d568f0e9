//! Live consultation sessions
//!
//! [`LiveSessionManager`] owns the lifecycle of a single realtime
//! voice/text connection. It turns transport events into three observable
//! effects: status transitions, full transcript updates, and service
//! notices. Transport errors end the session; there is no automatic
//! reconnect, the caller retries by connecting again.

mod connection;
mod error;
mod helpers;
mod messages;
mod status;
mod transport;
mod turns;

pub use connection::RealtimeTransport;
pub use error::ConnectionError;
pub use status::ConnectionStatus;
pub use transport::{
    LiveTransport, OutboundMessage, SessionRequest, TransportEvent, TransportSession,
};
pub use turns::{transcript_text, Role, TranscriptBuffer, Turn};

use crate::audio::AudioChunk;
use crate::scenario::Scenario;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Upper bound on the whole connect attempt
const CONNECT_TIMEOUT_SECS: u64 = error::WS_CONNECT_TIMEOUT_SECS + 5;

/// Time allowed for the transport to close and the pump to drain
const DISCONNECT_TIMEOUT_SECS: u64 = 5;

/// Event for subscribers
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LiveEvent {
    /// Connection status changed
    Status(ConnectionStatus),
    /// Full turn list after a fragment was coalesced
    Transcript(Vec<Turn>),
    /// Non-fatal error reported by the service
    ServiceError { message: String },
}

/// Handles for the transport session currently in use
struct ActiveSession {
    outbound: mpsc::Sender<OutboundMessage>,
    closing: Arc<AtomicBool>,
    stop_pump: Option<oneshot::Sender<()>>,
    pump: Option<JoinHandle<()>>,
    io_task: Option<JoinHandle<()>>,
}

impl ActiveSession {
    /// Close the transport and wait for buffered fragments to be coalesced
    async fn shutdown(mut self) {
        self.closing.store(true, Ordering::SeqCst);
        // Replacing the sender drops ours, which closes the outbound
        // channel once callers release their clones
        drop(std::mem::replace(&mut self.outbound, mpsc::channel(1).0));

        if let Some(io_task) = self.io_task.take() {
            let abort = io_task.abort_handle();
            if timeout(Duration::from_secs(DISCONNECT_TIMEOUT_SECS), io_task)
                .await
                .is_err()
            {
                warn!("Transport did not close in time, aborting");
                abort.abort();
            }
        }
        // Whatever the transport delivered before closing is still coalesced
        if let Some(stop) = self.stop_pump.take() {
            let _ = stop.send(());
        }
        if let Some(pump) = self.pump.take() {
            let abort = pump.abort_handle();
            if timeout(Duration::from_secs(DISCONNECT_TIMEOUT_SECS), pump)
                .await
                .is_err()
            {
                warn!("Event pump did not drain in time, aborting");
                abort.abort();
            }
        }
    }
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        if let Some(io_task) = self.io_task.take() {
            io_task.abort();
        }
    }
}

/// State shared between the manager and its event pump
struct Shared {
    status: Mutex<ConnectionStatus>,
    turns: Mutex<TranscriptBuffer>,
    event_tx: broadcast::Sender<LiveEvent>,
    /// Bumped on every connect and disconnect; stale pumps check it
    generation: AtomicU64,
}

impl Shared {
    fn status(&self) -> MutexGuard<'_, ConnectionStatus> {
        lock_or_recover(&self.status)
    }

    fn turns(&self) -> MutexGuard<'_, TranscriptBuffer> {
        lock_or_recover(&self.turns)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn set_status(&self, status: ConnectionStatus) {
        *self.status() = status.clone();
        debug!(?status, "Live session status changed");
        let _ = self.event_tx.send(LiveEvent::Status(status));
    }

    /// Set status only if `generation` is still the current session
    fn set_status_for(&self, generation: u64, status: ConnectionStatus) -> bool {
        let mut current = self.status();
        if !self.is_current(generation) {
            return false;
        }
        *current = status.clone();
        drop(current);
        debug!(?status, "Live session status changed");
        let _ = self.event_tx.send(LiveEvent::Status(status));
        true
    }
}

fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("Live session mutex was poisoned, recovering data");
            poisoned.into_inner()
        }
    }
}

/// Manager for a single live consultation connection
pub struct LiveSessionManager {
    transport: Arc<dyn LiveTransport>,
    scenario: Mutex<Scenario>,
    shared: Arc<Shared>,
    active: Mutex<Option<ActiveSession>>,
}

impl LiveSessionManager {
    pub fn new(transport: Arc<dyn LiveTransport>, scenario: Scenario) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            transport,
            scenario: Mutex::new(scenario),
            shared: Arc::new(Shared {
                status: Mutex::new(ConnectionStatus::Disconnected),
                turns: Mutex::new(TranscriptBuffer::default()),
                event_tx,
                generation: AtomicU64::new(0),
            }),
            active: Mutex::new(None),
        }
    }

    /// Subscribe to status and transcript events
    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.shared.event_tx.subscribe()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.status().clone()
    }

    /// Snapshot of the coalesced transcript
    pub fn transcript(&self) -> Vec<Turn> {
        self.shared.turns().turns().to_vec()
    }

    pub fn scenario(&self) -> Scenario {
        *lock_or_recover(&self.scenario)
    }

    /// Select the scenario for the next connection
    pub fn set_scenario(&self, scenario: Scenario) {
        *lock_or_recover(&self.scenario) = scenario;
    }

    /// Begin a connection attempt
    ///
    /// Rejected with [`ConnectionError::AlreadyConnected`] while a session
    /// is connecting or active, so at most one transport session exists.
    pub async fn connect(&self, locale: &str) -> Result<(), ConnectionError> {
        let generation = {
            let mut status = self.shared.status();
            if status.is_busy() {
                warn!(status = ?*status, "Ignoring connect while a session is in progress");
                return Err(ConnectionError::AlreadyConnected);
            }
            *status = ConnectionStatus::Connecting;
            self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1
        };
        let _ = self
            .shared
            .event_tx
            .send(LiveEvent::Status(ConnectionStatus::Connecting));

        // Leftovers from a session that ended in error
        let stale = lock_or_recover(&self.active).take();
        drop(stale);

        self.shared.turns().clear();
        let _ = self.shared.event_tx.send(LiveEvent::Transcript(Vec::new()));

        let request = SessionRequest {
            locale: locale.to_string(),
            scenario: self.scenario(),
        };
        info!(locale = %request.locale, scenario = %request.scenario.tag(), "Starting live session");

        let opened = match timeout(
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            self.transport.open(&request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::Timeout),
        };

        let session = match opened {
            Ok(session) => session,
            Err(e) => {
                error!("Live session connection failed: {}", e);
                self.shared.set_status_for(
                    generation,
                    ConnectionStatus::Errored {
                        reason: e.to_string(),
                    },
                );
                return Err(e);
            }
        };

        if !self.shared.is_current(generation) {
            // Disconnected while connecting; dropping the session closes it
            info!("Live session cancelled while connecting");
            return Err(ConnectionError::Cancelled);
        }

        let closing = Arc::new(AtomicBool::new(false));
        let (stop_tx, stop_rx) = oneshot::channel();
        let pump = tokio::spawn(pump_events(
            session.events,
            stop_rx,
            self.shared.clone(),
            generation,
            closing.clone(),
        ));

        *lock_or_recover(&self.active) = Some(ActiveSession {
            outbound: session.outbound,
            closing,
            stop_pump: Some(stop_tx),
            pump: Some(pump),
            io_task: session.io_task,
        });

        self.shared
            .set_status_for(generation, ConnectionStatus::Active);
        info!("Live session active");
        Ok(())
    }

    /// Terminate the connection
    ///
    /// Always safe to call. Status is `Disconnected` when this returns, so
    /// post-processing can start right away.
    pub async fn disconnect(&self) {
        let active = lock_or_recover(&self.active).take();
        let was_idle = matches!(*self.shared.status(), ConnectionStatus::Disconnected);
        if was_idle && active.is_none() {
            debug!("Disconnect on idle live session, nothing to do");
            return;
        }

        if let Some(active) = active {
            active.shutdown().await;
        }

        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.set_status(ConnectionStatus::Disconnected);
        info!(
            turns = self.shared.turns().turns().len(),
            "Live session disconnected"
        );
    }

    /// Send typed text to the assistant
    pub async fn send_text(&self, text: &str) -> Result<(), ConnectionError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        self.send(OutboundMessage::Text(text.to_string())).await?;
        // Typed input is not echoed by the service
        self.record_fragment(Role::User, text);
        Ok(())
    }

    /// Send a chunk of microphone audio
    pub async fn send_audio(&self, chunk: AudioChunk) -> Result<(), ConnectionError> {
        self.send(OutboundMessage::Audio(chunk)).await
    }

    async fn send(&self, message: OutboundMessage) -> Result<(), ConnectionError> {
        if !matches!(self.status(), ConnectionStatus::Active) {
            return Err(ConnectionError::NotConnected);
        }
        let outbound = lock_or_recover(&self.active)
            .as_ref()
            .map(|active| active.outbound.clone())
            .ok_or(ConnectionError::NotConnected)?;
        outbound
            .send(message)
            .await
            .map_err(|_| ConnectionError::NotConnected)
    }

    fn record_fragment(&self, role: Role, text: &str) {
        coalesce_and_publish(&self.shared, role, text);
    }
}

fn coalesce_and_publish(shared: &Shared, role: Role, text: &str) {
    let snapshot = {
        let mut turns = shared.turns();
        if !turns.push_fragment(role, text) {
            return;
        }
        turns.turns().to_vec()
    };
    let _ = shared.event_tx.send(LiveEvent::Transcript(snapshot));
}

/// Relay transport events for one session in arrival order
///
/// On `stop` the events already queued are drained before returning.
#[tracing::instrument(skip(events, stop, shared, closing))]
async fn pump_events(
    mut events: mpsc::Receiver<TransportEvent>,
    mut stop: oneshot::Receiver<()>,
    shared: Arc<Shared>,
    generation: u64,
    closing: Arc<AtomicBool>,
) {
    loop {
        let event = tokio::select! {
            biased;

            event = events.recv() => event,
            _ = &mut stop => {
                while let Ok(event) = events.try_recv() {
                    if !relay_event(&shared, generation, &closing, event) {
                        break;
                    }
                }
                return;
            }
        };

        match event {
            Some(event) => {
                if !relay_event(&shared, generation, &closing, event) {
                    return;
                }
            }
            None => {
                if !closing.load(Ordering::SeqCst) {
                    warn!("Live session transport ended unexpectedly");
                    shared.set_status_for(
                        generation,
                        ConnectionStatus::Errored {
                            reason: "connection lost".to_string(),
                        },
                    );
                }
                return;
            }
        }
    }
}

/// Apply one transport event; returns false when the session is over
fn relay_event(
    shared: &Shared,
    generation: u64,
    closing: &AtomicBool,
    event: TransportEvent,
) -> bool {
    if !shared.is_current(generation) {
        return false;
    }
    match event {
        TransportEvent::Fragment { role, text } => {
            coalesce_and_publish(shared, role, &text);
            true
        }
        TransportEvent::ServiceError { message } => {
            let _ = shared.event_tx.send(LiveEvent::ServiceError { message });
            true
        }
        TransportEvent::Failed { reason } => {
            if !closing.load(Ordering::SeqCst) {
                error!("Live session transport failed: {}", reason);
                shared.set_status_for(generation, ConnectionStatus::Errored { reason });
            }
            false
        }
    }
}
