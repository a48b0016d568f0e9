//! Consultation session orchestration
//!
//! A consultation ties together:
//! - the live session connection (scenario, locale)
//! - optional microphone capture streamed into the session
//! - post-session analysis
//! - saving the finished session to history
//!
//! Typed input is forwarded by the caller through [`ConsultationSession::send_text`].

use crate::analysis::{self, Analyzer};
use crate::audio::{self, AudioCaptureHandle, AudioChunk};
use crate::history::{HistoryStore, SessionRecord};
use crate::live::{ConnectionError, LiveSessionManager};
use crate::storage::StorageError;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// An active consultation
pub struct ConsultationSession {
    manager: Arc<LiveSessionManager>,
    locale: String,
    audio_handle: Option<AudioCaptureHandle>,
    forwarder: Option<JoinHandle<()>>,
}

impl ConsultationSession {
    /// Connect the live session and, if requested, start the microphone
    ///
    /// A microphone that cannot be opened is logged and the session
    /// continues text-only.
    pub async fn start(
        manager: Arc<LiveSessionManager>,
        locale: &str,
        microphone: bool,
    ) -> Result<Self, ConnectionError> {
        manager.connect(locale).await?;

        let mut session = Self {
            manager,
            locale: locale.to_string(),
            audio_handle: None,
            forwarder: None,
        };

        if microphone {
            match audio::start_capture() {
                Ok((handle, audio_rx)) => {
                    session.forwarder = Some(spawn_audio_forwarder(session.manager.clone(), audio_rx));
                    session.audio_handle = Some(handle);
                    info!("Microphone streaming to live session");
                }
                Err(e) => {
                    warn!(error = %e, "Microphone unavailable, continuing with text only");
                }
            }
        }

        info!(scenario = %session.manager.scenario(), locale = %session.locale, "Consultation started");
        Ok(session)
    }

    pub fn manager(&self) -> &LiveSessionManager {
        &self.manager
    }

    pub async fn send_text(&self, text: &str) -> Result<(), ConnectionError> {
        self.manager.send_text(text).await
    }

    /// End the consultation, analyze it and save it to history
    ///
    /// Returns `None` when nothing was said; empty sessions are not saved.
    pub async fn finish(
        mut self,
        analyzer: &dyn Analyzer,
        history: &mut HistoryStore,
    ) -> Result<Option<SessionRecord>, StorageError> {
        if let Some(handle) = self.audio_handle.take() {
            // Joining the capture thread blocks briefly
            let _ = tokio::task::spawn_blocking(move || drop(handle)).await;
        }

        self.manager.disconnect().await;

        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }

        let transcript = self.manager.transcript();
        if transcript.is_empty() {
            info!("Consultation ended with an empty transcript, nothing saved");
            return Ok(None);
        }

        info!(turns = transcript.len(), "Consultation ended, requesting analysis");
        let analysis = analysis::analyze_or_placeholder(analyzer, &transcript, &self.locale).await;
        let record = SessionRecord::new(transcript, self.manager.scenario(), analysis);
        history.append(record.clone())?;
        Ok(Some(record))
    }
}

impl Drop for ConsultationSession {
    fn drop(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}

/// Forward microphone chunks until capture stops or the session closes
fn spawn_audio_forwarder(
    manager: Arc<LiveSessionManager>,
    mut audio_rx: mpsc::Receiver<AudioChunk>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(chunk) = audio_rx.recv().await {
            if let Err(e) = manager.send_audio(chunk).await {
                debug!(error = %e, "Live session no longer accepts audio");
                break;
            }
        }
        debug!("Audio forwarder stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SessionAnalysis;
    use crate::error::AnalysisError;
    use crate::live::{
        LiveTransport, Role, SessionRequest, TransportEvent, TransportSession, Turn,
    };
    use crate::scenario::Scenario;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedTransport {
        event_tx: Mutex<Option<mpsc::Sender<TransportEvent>>>,
    }

    impl ScriptedTransport {
        async fn say(&self, role: Role, text: &str) {
            let tx = self.event_tx.lock().unwrap().clone().unwrap();
            tx.send(TransportEvent::Fragment {
                role,
                text: text.to_string(),
            })
            .await
            .unwrap();
        }
    }

    #[async_trait]
    impl LiveTransport for ScriptedTransport {
        async fn open(&self, _request: &SessionRequest) -> Result<TransportSession, ConnectionError> {
            let (event_tx, events) = mpsc::channel(16);
            let (outbound, mut outbound_rx) = mpsc::channel(16);
            *self.event_tx.lock().unwrap() = Some(event_tx);
            let io_task = tokio::spawn(async move { while outbound_rx.recv().await.is_some() {} });
            Ok(TransportSession {
                events,
                outbound,
                io_task: Some(io_task),
            })
        }
    }

    struct StubAnalyzer(bool);

    #[async_trait]
    impl Analyzer for StubAnalyzer {
        async fn analyze(
            &self,
            _transcript: &[Turn],
            _locale: &str,
        ) -> Result<SessionAnalysis, AnalysisError> {
            if self.0 {
                Ok(SessionAnalysis {
                    strong_points: vec!["Clear facts".into()],
                    improvements: vec!["Bring the contract".into()],
                })
            } else {
                Err(AnalysisError::InvalidResponse("down".into()))
            }
        }
    }

    fn manager(transport: Arc<ScriptedTransport>) -> Arc<LiveSessionManager> {
        Arc::new(LiveSessionManager::new(transport, Scenario::SettlementNegotiation))
    }

    #[tokio::test]
    async fn test_finished_session_is_saved_with_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = HistoryStore::in_dir(dir.path());
        let transport = Arc::new(ScriptedTransport::default());

        let session = ConsultationSession::start(manager(transport.clone()), "en", false)
            .await
            .unwrap();
        session.send_text("They offered half").await.unwrap();
        transport.say(Role::Assistant, "Counter ").await;
        transport.say(Role::Assistant, "with 80%.").await;

        let record = session
            .finish(&StubAnalyzer(true), &mut history)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.scenario, Scenario::SettlementNegotiation);
        assert_eq!(
            record.transcript,
            vec![
                Turn::new(Role::User, "They offered half"),
                Turn::new(Role::Assistant, "Counter with 80%."),
            ]
        );
        assert_eq!(record.analysis.as_ref().unwrap().strong_points, vec!["Clear facts"]);
        assert_eq!(history.records().len(), 1);
        assert_eq!(HistoryStore::in_dir(dir.path()).records(), history.records());
    }

    #[tokio::test]
    async fn test_failed_analysis_stores_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = HistoryStore::in_dir(dir.path());
        let transport = Arc::new(ScriptedTransport::default());

        let session = ConsultationSession::start(manager(transport.clone()), "pt", false)
            .await
            .unwrap();
        transport.say(Role::User, "Olá").await;

        let record = session
            .finish(&StubAnalyzer(false), &mut history)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.analysis, Some(SessionAnalysis::unavailable("pt")));
    }

    #[tokio::test]
    async fn test_empty_session_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = HistoryStore::in_dir(dir.path());
        let transport = Arc::new(ScriptedTransport::default());
        let mgr = manager(transport);

        let session = ConsultationSession::start(mgr.clone(), "en", false).await.unwrap();
        let saved = session.finish(&StubAnalyzer(true), &mut history).await.unwrap();

        assert!(saved.is_none());
        assert!(history.is_empty());
        assert!(!dir.path().join(crate::history::HISTORY_FILE).exists());
        assert!(!mgr.status().is_busy());
    }
}
