//! Wire types for the StepFun REST endpoints
//!
//! Two operations: multipart audio transcription and non-streaming chat
//! completion. Field names follow the upstream JSON exactly.

use serde::{Deserialize, Serialize};

/// Response of `POST /v1/audio/transcriptions`.
///
/// The `step-asr` model returns plain text; segments and duration are only
/// present for response formats that include them.
#[derive(Debug, Clone, Deserialize)]
pub struct AsrResponse {
    pub text: String,
    #[serde(default)]
    pub segments: Option<Vec<AsrSegment>>,
    #[serde(default)]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AsrSegment {
    pub id: i64,
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default)]
    pub speaker: Option<String>,
}

/// Request body of `POST /v1/chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub stream: bool,
}

impl ChatRequest {
    /// The fixed request shape both generators use: system + user message,
    /// temperature 0.5, 8192 max tokens, non-streaming.
    pub fn with_system_and_user(model: &str, system: String, user: String) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system,
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user,
                },
            ],
            temperature: 0.5,
            max_tokens: 8192,
            stream: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Response of `POST /v1/chat/completions`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub id: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
}

impl ChatResponse {
    /// The content of the first choice, if the model returned any.
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub index: i64,
    pub message: ChatMessage,
    pub finish_reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}
