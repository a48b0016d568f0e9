//! Realtime API WebSocket transport
//!
//! Opens the WebSocket, configures the conversation and runs one receive and
//! one send task per session. The receive task turns server messages into
//! [`TransportEvent`]s; the send task forwards user audio and text and keeps
//! the connection alive with pings.

use super::error::{ConnectionError, WS_CONNECT_TIMEOUT_SECS};
use super::helpers::{encode_pcm16, generate_ws_key};
use super::messages::{
    ConversationItem, RealtimeClientMessage, RealtimeServerMessage, RealtimeSessionConfig,
};
use super::transport::{
    LiveTransport, OutboundMessage, SessionRequest, TransportEvent, TransportSession,
};
use crate::config::RealtimeConfig;
use crate::credentials::OpenAICredentials;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, trace, warn};

/// Ping interval in seconds to keep WebSocket connections alive
const PING_INTERVAL_SECS: u64 = 30;

/// Time the receive task gets to drain after a client-initiated close
const CLOSE_GRACE_MS: u64 = 2000;

/// Realtime transport over a WebSocket
pub struct RealtimeTransport {
    config: RealtimeConfig,
    credentials: OpenAICredentials,
}

impl RealtimeTransport {
    pub fn new(config: RealtimeConfig, credentials: OpenAICredentials) -> Self {
        Self {
            config,
            credentials,
        }
    }
}

/// Build the WebSocket URL with the model query parameter
pub(crate) fn build_realtime_ws_url(base_url: &str, model: &str) -> Result<url::Url, String> {
    let mut url = url::Url::parse(base_url).map_err(|e| e.to_string())?;
    url.query_pairs_mut().append_pair("model", model);
    Ok(url)
}

/// Build WebSocket request with Bearer token authentication
pub(crate) fn build_realtime_ws_request(
    ws_url: &url::Url,
    api_key: &str,
) -> Result<http::Request<()>, String> {
    let host = ws_url
        .host_str()
        .ok_or_else(|| "Invalid URL: no host".to_string())?;
    http::Request::builder()
        .uri(ws_url.as_str())
        .header("Host", host)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("OpenAI-Beta", "realtime=v1")
        .header("Upgrade", "websocket")
        .header("Connection", "Upgrade")
        .header("Sec-WebSocket-Key", generate_ws_key())
        .header("Sec-WebSocket-Version", "13")
        .body(())
        .map_err(|e| e.to_string())
}

/// Send session configuration
async fn send_session_update<S>(
    ws_sink: &mut S,
    request: &SessionRequest,
    transcription_model: &str,
) -> Result<(), String>
where
    S: SinkExt<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let language = if request.locale.is_empty() {
        None
    } else {
        Some(request.locale.as_str())
    };
    let msg = RealtimeClientMessage::SessionUpdate {
        session: RealtimeSessionConfig::new(
            request.scenario.instructions(&request.locale),
            transcription_model,
            language,
        ),
    };

    let json = serde_json::to_string(&msg).map_err(|e| e.to_string())?;
    debug!("Sending session.update: {}", json);
    ws_sink
        .send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}

#[async_trait]
impl LiveTransport for RealtimeTransport {
    async fn open(&self, request: &SessionRequest) -> Result<TransportSession, ConnectionError> {
        let ws_url = build_realtime_ws_url(&self.config.url, &self.config.model)
            .map_err(ConnectionError::Transport)?;

        info!(
            ws_url = %ws_url,
            locale = %request.locale,
            scenario = %request.scenario.tag(),
            "Connecting to Realtime API"
        );

        let ws_request = build_realtime_ws_request(&ws_url, self.credentials.api_key())
            .map_err(ConnectionError::Transport)?;

        let ws_stream = match timeout(
            Duration::from_secs(WS_CONNECT_TIMEOUT_SECS),
            connect_async(ws_request),
        )
        .await
        {
            Ok(Ok((stream, _response))) => stream,
            Ok(Err(e)) => {
                error!("Realtime WebSocket connection failed: {}", e);
                return Err(ConnectionError::Transport(e.to_string()));
            }
            Err(_) => {
                error!("Realtime WebSocket connection timed out");
                return Err(ConnectionError::Timeout);
            }
        };

        info!("Connected to Realtime API");

        let (mut ws_sink, ws_stream) = ws_stream.split();
        send_session_update(&mut ws_sink, request, &self.config.transcription_model)
            .await
            .map_err(ConnectionError::Transport)?;

        let (event_tx, event_rx) = mpsc::channel(256);
        let (outbound_tx, outbound_rx) = mpsc::channel(600);
        let (connection_lost_tx, connection_lost_rx) = mpsc::channel::<()>(1);

        let recv_task = spawn_receive_task(ws_stream, event_tx, connection_lost_tx);
        let send_task = spawn_send_task(ws_sink, outbound_rx, connection_lost_rx);

        let io_task = tokio::spawn(async move {
            let recv_abort = recv_task.abort_handle();
            let stopped_by_user = send_task.await.unwrap_or(true);
            if stopped_by_user {
                // Let the server's close reply through; the session is over either way
                if timeout(Duration::from_millis(CLOSE_GRACE_MS), recv_task)
                    .await
                    .is_err()
                {
                    debug!("Receive task did not finish after close, aborting");
                    recv_abort.abort();
                }
            } else {
                let _ = recv_task.await;
            }
            info!("Realtime session IO finished");
        });

        Ok(TransportSession {
            events: event_rx,
            outbound: outbound_tx,
            io_task: Some(io_task),
        })
    }
}

/// Spawn the receive task that handles incoming WebSocket messages
fn spawn_receive_task(
    mut ws_stream: impl StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + Unpin
        + Send
        + 'static,
    event_tx: mpsc::Sender<TransportEvent>,
    connection_lost_tx: mpsc::Sender<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut streamed_items: HashSet<String> = HashSet::new();

        while let Some(msg_result) = ws_stream.next().await {
            let event = match msg_result {
                Ok(Message::Text(text)) => {
                    trace!("Realtime message: {}", text);
                    match serde_json::from_str::<RealtimeServerMessage>(&text) {
                        Ok(server_msg) => map_server_message(&server_msg, &mut streamed_items),
                        Err(e) => {
                            warn!("Failed to parse Realtime message: {} - {}", e, text);
                            None
                        }
                    }
                }
                Ok(Message::Close(frame)) => {
                    info!("Realtime WebSocket closed by server: {:?}", frame);
                    let _ = event_tx
                        .send(TransportEvent::Failed {
                            reason: "connection closed by server".to_string(),
                        })
                        .await;
                    break;
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    trace!("Received Realtime WebSocket ping/pong");
                    None
                }
                Err(e) => {
                    error!("Realtime WebSocket receive error: {}", e);
                    let _ = event_tx
                        .send(TransportEvent::Failed {
                            reason: e.to_string(),
                        })
                        .await;
                    break;
                }
                _ => None,
            };

            if let Some(event) = event {
                if event_tx.send(event).await.is_err() {
                    debug!("Event receiver dropped, stopping receive task");
                    break;
                }
            }
        }

        let _ = connection_lost_tx.send(()).await;
    })
}

fn map_server_message(
    server_msg: &RealtimeServerMessage,
    streamed_items: &mut HashSet<String>,
) -> Option<TransportEvent> {
    if let Some(message) = server_msg.error_message() {
        // The "buffer too small" error is expected when closing with an empty buffer
        if message.contains("buffer too small") || message.contains("empty") {
            debug!("Realtime buffer empty on commit (expected): {}", message);
            return None;
        }
        error!("Realtime service error: {}", message);
        return Some(TransportEvent::ServiceError { message });
    }

    if let Some((role, text)) = server_msg.to_fragment(streamed_items) {
        return Some(TransportEvent::Fragment { role, text });
    }

    match server_msg {
        RealtimeServerMessage::SessionCreated => info!("Realtime session created"),
        RealtimeServerMessage::SessionUpdated => info!("Realtime session updated"),
        RealtimeServerMessage::InputAudioBufferSpeechStarted => debug!("VAD: speech started"),
        RealtimeServerMessage::InputAudioBufferSpeechStopped => debug!("VAD: speech stopped"),
        RealtimeServerMessage::ResponseDone => debug!("Assistant response done"),
        _ => {}
    }
    None
}

/// Spawn the send task that forwards user input
///
/// Resolves to true when the session was ended by the client (outbound
/// channel closed), false when the connection was lost.
fn spawn_send_task<S>(
    mut ws_sink: S,
    mut outbound_rx: mpsc::Receiver<OutboundMessage>,
    mut connection_lost_rx: mpsc::Receiver<()>,
) -> tokio::task::JoinHandle<bool>
where
    S: SinkExt<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        info!("Realtime send task started");
        let mut chunks_sent = 0u64;
        let mut sent_audio = false;

        let mut ping_interval = interval(Duration::from_secs(PING_INTERVAL_SECS));
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = connection_lost_rx.recv() => {
                    info!("Realtime send task received connection lost signal");
                    return false;
                }
                _ = ping_interval.tick() => {
                    if ws_sink.send(Message::Ping(vec![])).await.is_err() {
                        warn!("Failed to send Realtime keepalive ping");
                        return false;
                    }
                    trace!("Sent Realtime keepalive ping");
                }
                outbound = outbound_rx.recv() => {
                    match outbound {
                        Some(OutboundMessage::Audio(chunk)) => {
                            chunks_sent += 1;
                            if chunks_sent == 1 || chunks_sent % 100 == 0 {
                                info!(
                                    "Realtime send task: sending chunk #{}, {} samples",
                                    chunks_sent,
                                    chunk.samples.len()
                                );
                            }
                            let msg = RealtimeClientMessage::InputAudioBufferAppend {
                                audio: encode_pcm16(&chunk.samples),
                            };
                            if send_json(&mut ws_sink, &msg).await.is_err() {
                                error!("Failed to send Realtime audio chunk");
                                return false;
                            }
                            sent_audio = true;
                        }
                        Some(OutboundMessage::Text(text)) => {
                            let item = RealtimeClientMessage::ConversationItemCreate {
                                item: ConversationItem::user_text(&text),
                            };
                            if send_json(&mut ws_sink, &item).await.is_err()
                                || send_json(&mut ws_sink, &RealtimeClientMessage::ResponseCreate)
                                    .await
                                    .is_err()
                            {
                                error!("Failed to send Realtime text message");
                                return false;
                            }
                            debug!("Sent user text ({} chars)", text.len());
                        }
                        None => {
                            info!(
                                "Outbound channel closed after sending {} audio chunks",
                                chunks_sent
                            );
                            if sent_audio {
                                if let Err(e) =
                                    send_json(&mut ws_sink, &RealtimeClientMessage::InputAudioBufferCommit).await
                                {
                                    warn!("Failed to send Realtime commit: {}", e);
                                }
                            }
                            let _ = ws_sink.close().await;
                            return true;
                        }
                    }
                }
            }
        }
    })
}

async fn send_json<S>(ws_sink: &mut S, msg: &RealtimeClientMessage) -> Result<(), String>
where
    S: SinkExt<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    ws_sink
        .send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
