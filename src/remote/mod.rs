//! Remote service clients
//!
//! Thin glue over the two StepFun REST endpoints plus the shared transport
//! retry policy. Everything network-facing in the crate goes through here.

pub mod client;
pub mod models;
pub mod retry;

pub use client::{ApiError, ApiKeyStore, SpeechApi, StepFunClient, ASR_MODEL, CHAT_MODEL, DEFAULT_BASE_URL};
pub use models::{AsrResponse, ChatMessage, ChatRequest, ChatResponse};
pub use retry::RetryPolicy;
