//! StepFun API client
//!
//! Wraps the two REST operations behind the [`SpeechApi`] trait: multipart
//! audio transcription and non-streaming chat completion. The API key is
//! re-read from the settings store on every call so a key change takes
//! effect without restart.

use async_trait::async_trait;
use reqwest::multipart;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::database::DatabaseManager;

use super::models::{AsrResponse, ChatRequest, ChatResponse};

/// Default endpoint base.
pub const DEFAULT_BASE_URL: &str = "https://api.stepfun.com";

/// Model identifier for the transcription endpoint.
pub const ASR_MODEL: &str = "step-asr";

/// Model identifier for the chat-completion endpoint.
pub const CHAT_MODEL: &str = "step-3.5-flash";

/// Error types for remote API operations
#[derive(Debug, Clone)]
pub enum ApiError {
    /// No API key configured; precondition for every network operation
    MissingApiKey,
    /// Transport-level failure (connect, timeout, socket, I/O); retryable
    Transport(String),
    /// Upstream returned a non-2xx response; never retried
    Upstream { status: u16, body: String },
    /// Response body did not match the documented envelope
    InvalidResponse(String),
}

impl ApiError {
    /// Whether the retry policy may re-attempt this error.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::MissingApiKey => {
                write!(f, "API key not configured; set one with the set-key command")
            }
            ApiError::Transport(msg) => write!(f, "Transport error: {}", msg),
            ApiError::Upstream { status, body } => {
                write!(f, "API error {}: {}", status, body)
            }
            ApiError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

/// Handle that reads the API key fresh from the settings store on each call.
#[derive(Clone)]
pub struct ApiKeyStore {
    db: Arc<DatabaseManager>,
}

impl ApiKeyStore {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    /// Current key, or `MissingApiKey` when unset/blank.
    pub fn require(&self) -> Result<String, ApiError> {
        match self.db.get_api_key() {
            Ok(Some(key)) => Ok(key),
            Ok(None) => Err(ApiError::MissingApiKey),
            Err(e) => Err(ApiError::InvalidResponse(format!(
                "Failed to read API key from settings: {}",
                e
            ))),
        }
    }
}

/// The two remote operations the orchestration layer depends on
#[async_trait]
pub trait SpeechApi: Send + Sync {
    /// Upload an audio file for transcription
    async fn transcribe_file(&self, path: &Path) -> Result<AsrResponse, ApiError>;

    /// Run a chat completion
    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError>;
}

/// HTTP client for the StepFun endpoints
pub struct StepFunClient {
    http: reqwest::Client,
    base_url: String,
    api_key: ApiKeyStore,
}

impl StepFunClient {
    pub fn new(base_url: impl Into<String>, api_key: ApiKeyStore) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(120))
            .timeout(Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    async fn read_body(response: reqwest::Response) -> Result<String, ApiError> {
        response
            .text()
            .await
            .map_err(|e| ApiError::Transport(format!("Failed to read response body: {}", e)))
    }
}

#[async_trait]
impl SpeechApi for StepFunClient {
    async fn transcribe_file(&self, path: &Path) -> Result<AsrResponse, ApiError> {
        let api_key = self.api_key.require()?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio".to_string());
        let bytes = std::fs::read(path)
            .map_err(|e| ApiError::Transport(format!("Failed to read audio file: {}", e)))?;

        let file_part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/*")
            .map_err(|e| ApiError::InvalidResponse(format!("Invalid mime type: {}", e)))?;
        let form = multipart::Form::new()
            .part("file", file_part)
            .text("model", ASR_MODEL)
            .text("response_format", "json");

        let url = format!("{}/v1/audio/transcriptions", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        let body = Self::read_body(response).await?;
        if !status.is_success() {
            return Err(ApiError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("Bad transcription response: {}", e)))
    }

    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        let api_key = self.api_key.require()?;

        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        let body = Self::read_body(response).await?;
        if !status.is_success() {
            return Err(ApiError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("Bad completion response: {}", e)))
    }
}
