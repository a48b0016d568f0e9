use super::Context;
use crate::console;
use anyhow::{Context as _, Result};
use lexvox::analysis::AnalysisClient;
use lexvox::consultation::ConsultationSession;
use lexvox::credentials::OpenAICredentials;
use lexvox::history::{HistoryStore, HISTORY_FILE};
use lexvox::live::{LiveEvent, LiveSessionManager, RealtimeTransport};
use lexvox::locale;
use lexvox::scenario::Scenario;
use lexvox::storage;
use std::sync::Arc;
use std::io::BufRead;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Command typed on its own line to end the session
const END_COMMAND: &str = "/end";

pub async fn run(
    ctx: &Context,
    scenario: Option<Scenario>,
    locale: Option<String>,
    microphone: bool,
) -> Result<()> {
    let credentials = OpenAICredentials::from_env()?;
    let locale = locale
        .map(|code| locale::normalize(&code))
        .unwrap_or_else(|| ctx.prefs.locale());
    let scenario = scenario.unwrap_or_else(|| ctx.prefs.scenario());

    // Resolve storage before talking to anyone
    let mut history = HistoryStore::load(storage::data_file(&ctx.prefs, HISTORY_FILE)?);
    let analyzer = AnalysisClient::new(ctx.config.analysis.clone(), credentials.clone())?;

    let transport = Arc::new(RealtimeTransport::new(
        ctx.config.realtime.clone(),
        credentials,
    ));
    let manager = Arc::new(LiveSessionManager::new(transport, scenario));
    let printer = console::spawn_printer(manager.subscribe(), locale.clone());
    let mut events = manager.subscribe();

    println!("{} ({}). Type to talk, {} to finish.", scenario, locale, END_COMMAND);
    let session = ConsultationSession::start(manager.clone(), &locale, microphone)
        .await
        .context("Could not start the live session")?;

    let mut lines = spawn_stdin_reader();
    loop {
        tokio::select! {
            line = lines.recv() => match line {
                Some(line) if line.trim() == END_COMMAND => break,
                Some(line) => {
                    if let Err(e) = session.send_text(&line).await {
                        warn!(error = %e, "Message not sent");
                    }
                }
                None => break,
            },
            event = events.recv() => match event {
                Ok(LiveEvent::Status(status)) if status.is_failure() => break,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, ending session");
                break;
            }
        }
    }

    println!("\nEnding session, preparing feedback...");
    let saved = session.finish(&analyzer, &mut history).await?;
    printer.abort();

    match saved {
        Some(record) => {
            println!();
            print!("{}", storage::render_markdown(&record));
            println!("\nSaved as {}", record.id);
        }
        None => println!("Nothing was said; session not saved."),
    }
    Ok(())
}

/// Read stdin lines on a detached thread so exiting never waits for input
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}
