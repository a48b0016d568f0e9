//! Realtime API message types for live consultations
//!
//! Defines the message format for the Realtime WebSocket conversation,
//! covering user speech transcription and assistant text deltas.

use super::turns::Role;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Messages sent to the Realtime API
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub(crate) enum RealtimeClientMessage {
    /// Session configuration sent after connection
    #[serde(rename = "session.update")]
    SessionUpdate { session: RealtimeSessionConfig },
    /// Append audio data to the input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend { audio: String },
    /// Commit the audio buffer for processing
    #[serde(rename = "input_audio_buffer.commit")]
    InputAudioBufferCommit,
    /// Add a typed user message to the conversation
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate { item: ConversationItem },
    /// Ask the assistant to respond
    #[serde(rename = "response.create")]
    ResponseCreate,
}

/// Session configuration for a realtime consultation
#[derive(Debug, Serialize)]
pub(crate) struct RealtimeSessionConfig {
    /// Output modalities requested from the assistant
    pub modalities: Vec<String>,
    /// System instructions built from scenario and locale
    pub instructions: String,
    /// Input audio format (pcm16)
    pub input_audio_format: String,
    /// Transcription of the user's speech
    pub input_audio_transcription: TranscriptionConfig,
    /// Turn detection configuration (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,
}

/// Transcription configuration
#[derive(Debug, Serialize)]
pub(crate) struct TranscriptionConfig {
    pub model: String,
    /// Optional language hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Turn detection configuration
#[derive(Debug, Serialize)]
pub(crate) struct TurnDetection {
    /// Detection type: "server_vad" or "semantic_vad"
    #[serde(rename = "type")]
    pub detection_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix_padding_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silence_duration_ms: Option<u32>,
}

impl RealtimeSessionConfig {
    pub fn new(instructions: String, transcription_model: &str, language: Option<&str>) -> Self {
        Self {
            modalities: vec!["text".to_string()],
            instructions,
            input_audio_format: "pcm16".to_string(),
            input_audio_transcription: TranscriptionConfig {
                model: transcription_model.to_string(),
                language: language.map(String::from),
            },
            turn_detection: Some(TurnDetection {
                detection_type: "server_vad".to_string(),
                threshold: Some(0.5),
                prefix_padding_ms: Some(300),
                silence_duration_ms: Some(500),
            }),
        }
    }
}

/// Conversation item for typed input
#[derive(Debug, Serialize)]
pub(crate) struct ConversationItem {
    #[serde(rename = "type")]
    pub item_type: String,
    pub role: String,
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ContentPart {
    #[serde(rename = "type")]
    pub part_type: String,
    pub text: String,
}

impl ConversationItem {
    pub fn user_text(text: &str) -> Self {
        Self {
            item_type: "message".to_string(),
            role: "user".to_string(),
            content: vec![ContentPart {
                part_type: "input_text".to_string(),
                text: text.to_string(),
            }],
        }
    }
}

/// Realtime API server messages
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum RealtimeServerMessage {
    #[serde(rename = "session.created")]
    SessionCreated,
    #[serde(rename = "session.updated")]
    SessionUpdated,
    /// Partial transcription of the user's speech
    #[serde(rename = "conversation.item.input_audio_transcription.delta")]
    InputTranscriptionDelta {
        item_id: Option<String>,
        delta: Option<String>,
    },
    /// Completed transcription of the user's speech
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    InputTranscriptionCompleted {
        item_id: Option<String>,
        transcript: Option<String>,
    },
    /// Assistant text delta
    #[serde(rename = "response.text.delta", alias = "response.output_text.delta")]
    ResponseTextDelta { delta: Option<String> },
    /// Assistant spoken-audio transcript delta
    #[serde(
        rename = "response.audio_transcript.delta",
        alias = "response.output_audio_transcript.delta"
    )]
    ResponseAudioTranscriptDelta { delta: Option<String> },
    #[serde(rename = "response.done")]
    ResponseDone,
    #[serde(rename = "input_audio_buffer.speech_started")]
    InputAudioBufferSpeechStarted,
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    InputAudioBufferSpeechStopped,
    /// Error message
    #[serde(rename = "error")]
    Error { error: Option<RealtimeError> },
    /// Catch-all for other message types
    #[serde(other)]
    Other,
}

/// Error details
#[derive(Debug, Deserialize)]
pub(crate) struct RealtimeError {
    #[serde(rename = "type")]
    #[allow(dead_code)]
    pub error_type: Option<String>,
    pub message: Option<String>,
}

impl RealtimeServerMessage {
    /// Map a server message to a speaker-tagged fragment
    ///
    /// User transcription may arrive as deltas and then as a completed
    /// transcript for the same item. `streamed_items` records items that
    /// produced deltas so their completed text is not emitted twice.
    pub fn to_fragment(&self, streamed_items: &mut HashSet<String>) -> Option<(Role, String)> {
        let non_empty = |s: &Option<String>| s.as_ref().filter(|s| !s.is_empty()).cloned();
        match self {
            RealtimeServerMessage::InputTranscriptionDelta { item_id, delta } => {
                let text = non_empty(delta)?;
                if let Some(id) = item_id {
                    streamed_items.insert(id.clone());
                }
                Some((Role::User, text))
            }
            RealtimeServerMessage::InputTranscriptionCompleted {
                item_id,
                transcript,
            } => {
                if let Some(id) = item_id {
                    if streamed_items.remove(id) {
                        return None;
                    }
                }
                non_empty(transcript).map(|text| (Role::User, text))
            }
            RealtimeServerMessage::ResponseTextDelta { delta }
            | RealtimeServerMessage::ResponseAudioTranscriptDelta { delta } => {
                non_empty(delta).map(|text| (Role::Assistant, text))
            }
            _ => None,
        }
    }

    /// Check if this is an error message
    pub fn error_message(&self) -> Option<String> {
        match self {
            RealtimeServerMessage::Error { error } => Some(
                error
                    .as_ref()
                    .and_then(|e| e.message.clone())
                    .unwrap_or_else(|| "unknown service error".to_string()),
            ),
            _ => None,
        }
    }
}
