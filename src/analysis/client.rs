//! Chat Completions client for post-session analysis.

use super::{Analyzer, SessionAnalysis};
use crate::config::AnalysisConfig;
use crate::credentials::OpenAICredentials;
use crate::error::{AnalysisError, AppError};
use crate::live::{transcript_text, Turn};
use crate::locale;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Maximum number of retry attempts for transient failures.
const MAX_RETRIES: u32 = 3;

/// Initial delay between retries (doubles with each attempt).
const INITIAL_RETRY_DELAY_MS: u64 = 1000;

/// System prompt template. Use `{language}` for the output language.
const ANALYSIS_PROMPT_TEMPLATE: &str = r#"You are an experienced legal coach reviewing a practice consultation between a client (User) and an AI legal assistant (Assistant). Evaluate how well the user presented their matter: clarity of facts, completeness of the timeline, relevant documents and evidence mentioned, and the questions they asked.

Return two short lists: strongPoints, things the user did well, and improvements, concrete suggestions for the next consultation. Each entry is one sentence. The output MUST be in {language}. Do not translate to any other language."#;

/// Client for the schema-constrained analysis request.
pub struct AnalysisClient {
    config: AnalysisConfig,
    credentials: OpenAICredentials,
    client: reqwest::Client,
}

/// Request body for the Chat Completions API.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: Value,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Strict JSON schema: exactly the two string arrays, both required.
fn response_format() -> Value {
    let string_list = json!({"type": "array", "items": {"type": "string"}});
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "session_analysis",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "strongPoints": string_list,
                    "improvements": string_list,
                },
                "required": ["strongPoints", "improvements"],
                "additionalProperties": false,
            }
        }
    })
}

fn build_prompt(locale_code: &str) -> String {
    ANALYSIS_PROMPT_TEMPLATE.replace("{language}", locale::language_name(locale_code))
}

impl AnalysisClient {
    pub fn new(config: AnalysisConfig, credentials: OpenAICredentials) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            credentials,
            client,
        })
    }

    fn build_request(&self, transcript: &[Turn], locale_code: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: build_prompt(locale_code),
                },
                ChatMessage {
                    role: "user",
                    content: transcript_text(transcript),
                },
            ],
            response_format: response_format(),
        }
    }

    /// Extract and parse the analysis object from the response.
    fn extract_analysis(response: &ChatCompletionResponse) -> Result<SessionAnalysis, AnalysisError> {
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                AnalysisError::InvalidResponse("No content in analysis response".into())
            })?;

        serde_json::from_str(content).map_err(|e| {
            AnalysisError::InvalidResponse(format!("Analysis does not match schema: {}", e))
        })
    }

    /// Check if a reqwest error is retryable (transient).
    fn is_retryable_error(error: &reqwest::Error) -> bool {
        error.is_timeout() || error.is_connect() || error.is_request()
    }
}

#[async_trait]
impl Analyzer for AnalysisClient {
    #[instrument(skip(self, transcript), fields(turns = transcript.len()))]
    async fn analyze(
        &self,
        transcript: &[Turn],
        locale: &str,
    ) -> Result<SessionAnalysis, AnalysisError> {
        if transcript.is_empty() {
            return Err(AnalysisError::EmptyTranscript);
        }
        let request_body = self.build_request(transcript, locale);

        let mut last_error: Option<AnalysisError> = None;
        let mut retry_delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS);

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                warn!(
                    attempt = attempt,
                    max_retries = MAX_RETRIES,
                    delay_ms = retry_delay.as_millis(),
                    "Retrying analysis request after transient failure"
                );
                tokio::time::sleep(retry_delay).await;
                retry_delay *= 2;
            }

            let result = self
                .client
                .post(&self.config.url)
                .bearer_auth(self.credentials.api_key())
                .json(&request_body)
                .send()
                .await;

            match result {
                Ok(response) => {
                    if response.status().is_success() {
                        let chat_response: ChatCompletionResponse =
                            response.json().await.map_err(|e| {
                                AnalysisError::InvalidResponse(format!(
                                    "Failed to parse analysis response: {}",
                                    e
                                ))
                            })?;
                        let analysis = Self::extract_analysis(&chat_response)?;

                        if attempt > 0 {
                            info!(attempt = attempt, "Analysis request succeeded after retry");
                        }
                        info!(
                            strong_points = analysis.strong_points.len(),
                            improvements = analysis.improvements.len(),
                            "Session analysis received"
                        );
                        return Ok(analysis);
                    }

                    let status = response.status().as_u16();
                    let message = response.text().await.unwrap_or_default();
                    let error = AnalysisError::ServerError { status, message };

                    if (500..600).contains(&status) && attempt < MAX_RETRIES {
                        warn!(status = status, attempt = attempt, "Server error, will retry");
                        last_error = Some(error);
                        continue;
                    }

                    return Err(error);
                }
                Err(e) => {
                    if Self::is_retryable_error(&e) && attempt < MAX_RETRIES {
                        warn!(error = %e, attempt = attempt, "Network error, will retry");
                        last_error = Some(AnalysisError::Network(e));
                        continue;
                    }

                    return Err(AnalysisError::Network(e));
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AnalysisError::InvalidResponse("Unexpected retry loop exit".into())))
    }
}
