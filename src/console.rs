//! Terminal rendering of live session events

use lexvox::live::{ConnectionStatus, LiveEvent, Role, Turn};
use std::io::Write;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::warn;

fn speaker(role: Role) -> &'static str {
    match role {
        Role::User => "You",
        Role::Assistant => "Counsel",
    }
}

/// Turns full transcript snapshots into incremental terminal output
#[derive(Debug, Default)]
pub struct TranscriptPrinter {
    printed: Vec<Turn>,
}

impl TranscriptPrinter {
    /// Text to print so the terminal shows `turns`
    pub fn update(&mut self, turns: &[Turn]) -> String {
        let mut out = String::new();
        let continues = self.printed.len() <= turns.len()
            && self
                .printed
                .iter()
                .zip(turns)
                .all(|(old, new)| old.role == new.role && new.text.starts_with(&old.text));
        if !continues {
            // Transcript was reset by a new session
            self.printed.clear();
        }

        for (i, turn) in turns.iter().enumerate() {
            match self.printed.get(i) {
                Some(old) => out.push_str(&turn.text[old.text.len()..]),
                None => {
                    if i > 0 || !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(&format!("{}: {}", speaker(turn.role), turn.text));
                }
            }
        }
        self.printed = turns.to_vec();
        out
    }
}

fn status_line(status: &ConnectionStatus, locale: &str) -> String {
    format!("[{}]", status.label(locale))
}

/// Print live events until the manager goes away
pub fn spawn_printer(mut events: broadcast::Receiver<LiveEvent>, locale: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut printer = TranscriptPrinter::default();
        loop {
            match events.recv().await {
                Ok(LiveEvent::Status(status)) => eprintln!("\n{}", status_line(&status, &locale)),
                Ok(LiveEvent::Transcript(turns)) => {
                    let text = printer.update(&turns);
                    if !text.is_empty() {
                        print!("{}", text);
                        let _ = std::io::stdout().flush();
                    }
                }
                Ok(LiveEvent::ServiceError { message }) => eprintln!("\n[service: {}]", message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Console fell behind live events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: Role, text: &str) -> Turn {
        Turn::new(role, text)
    }

    #[test]
    fn test_prints_only_new_text() {
        let mut printer = TranscriptPrinter::default();
        assert_eq!(printer.update(&[turn(Role::User, "Hello")]), "You: Hello");
        assert_eq!(printer.update(&[turn(Role::User, "Hello there")]), " there");
        assert_eq!(
            printer.update(&[
                turn(Role::User, "Hello there"),
                turn(Role::Assistant, "Hi")
            ]),
            "\nCounsel: Hi"
        );
    }

    #[test]
    fn test_reset_starts_over() {
        let mut printer = TranscriptPrinter::default();
        printer.update(&[turn(Role::User, "First session")]);
        assert_eq!(printer.update(&[]), "");
        assert_eq!(printer.update(&[turn(Role::Assistant, "New")]), "Counsel: New");
    }

    #[test]
    fn test_status_line_shows_reason_once() {
        let line = status_line(
            &ConnectionStatus::Errored {
                reason: "timeout".into(),
            },
            "en",
        );
        assert_eq!(line, "[Connection failed: timeout]");
        assert_eq!(status_line(&ConnectionStatus::Active, "en"), "[Live]");
    }
}
