//! Transcript turns and fragment coalescing
//!
//! The realtime stream delivers many small fragments per utterance. They are
//! merged into turns so that no two adjacent turns share a speaker role.

use serde::{Deserialize, Serialize};

/// Speaker of a transcript turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One contiguous block of speech or text from a single speaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// Ordered, append-only turn list for the active session
#[derive(Debug, Default, Clone)]
pub struct TranscriptBuffer {
    turns: Vec<Turn>,
}

impl TranscriptBuffer {
    /// Coalesce a fragment into the buffer
    ///
    /// Appends to the last turn when the role matches, otherwise starts a new
    /// turn. Returns false for empty fragments, which leave the buffer as is.
    pub fn push_fragment(&mut self, role: Role, fragment: &str) -> bool {
        if fragment.is_empty() {
            return false;
        }
        match self.turns.last_mut() {
            Some(last) if last.role == role => last.text.push_str(fragment),
            _ => self.turns.push(Turn::new(role, fragment)),
        }
        true
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

/// Render turns as "User: ..." / "Assistant: ..." lines
pub fn transcript_text(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|turn| {
            let speaker = match turn.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            format!("{}: {}", speaker, turn.text.trim())
        })
        .collect::<Vec<_>>()
        .join("\n")
}
