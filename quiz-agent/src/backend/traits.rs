//! Core traits for generator backends.
//!
//! This module defines the `GeneratorBackend` trait - the abstraction over
//! whatever text-generation service produces question candidates.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error types for generator operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Backend is not available
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Upstream answered with a non-success status
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Rate limited by the backend
    #[error("Rate limited, retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    /// No response received
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Response body could not be decoded
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Core trait for generator backends.
///
/// Implementations issue exactly one upstream request per `complete` call
/// and never retry.
#[async_trait]
pub trait GeneratorBackend: Send + Sync {
    /// Get the backend identifier (e.g., model name).
    fn id(&self) -> &str;

    /// Generate a completion.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, BackendError>;
}

/// Request for a completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// System prompt (optional)
    pub system_prompt: Option<String>,
    /// Conversation messages
    pub messages: Vec<Message>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Temperature (0.0-2.0)
    pub temperature: Option<f32>,
    /// Ask the backend for a JSON object
    pub json_output: bool,
}

impl CompletionRequest {
    /// Create a new request with a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(content)],
            ..Default::default()
        }
    }

    /// Add a system prompt.
    pub fn with_system(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set max tokens.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Set temperature.
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp.clamp(0.0, 2.0));
        self
    }

    /// Request JSON output.
    pub fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// A message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,
    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
}

impl MessageRole {
    /// Role name on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
        }
    }
}

/// Response from a completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated content
    pub content: String,
    /// Why generation stopped
    pub finish_reason: FinishReason,
    /// Token usage
    pub usage: Usage,
}

/// Why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop (end of response or stop sequence)
    Stop,
    /// Hit max tokens limit
    Length,
    /// Content was filtered
    ContentFilter,
}

/// Token usage information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,
    /// Tokens in the completion
    pub completion_tokens: u32,
}

impl Usage {
    /// Get total tokens.
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}
