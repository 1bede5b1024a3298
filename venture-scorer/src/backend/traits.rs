//! Core traits for generative backends.
//!
//! The scorer only needs one thing from a model: turn a prompt into text.
//! The text may be anything, so callers must treat it as untrusted.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error types for generative backend calls.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Backend is not configured or disabled
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Request was rejected by the backend
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Rate limited by the backend
    #[error("Rate limited by backend")]
    RateLimited,

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Response body could not be decoded
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// A text-generation backend.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Backend identifier (e.g., model name).
    fn id(&self) -> &str;

    /// Generate a completion for the request.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

/// Request for a completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// System prompt (optional)
    pub system_prompt: Option<String>,
    /// User prompt
    pub prompt: String,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Temperature (0.0-2.0)
    pub temperature: Option<f32>,
    /// Ask the backend for a JSON object
    pub json_output: bool,
}

impl CompletionRequest {
    /// Create a new request from a user prompt.
    pub fn user(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
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

/// Completion text plus token accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated content
    pub content: String,
    /// Token usage
    pub usage: Usage,
}

/// Token usage information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl Usage {
    /// Get total tokens.
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = CompletionRequest::user("score this")
            .with_system("you are an analyst")
            .with_max_tokens(512)
            .with_temperature(5.0)
            .with_json_output();

        assert_eq!(request.prompt, "score this");
        assert_eq!(request.system_prompt.as_deref(), Some("you are an analyst"));
        assert_eq!(request.max_tokens, Some(512));
        assert_eq!(request.temperature, Some(2.0));
        assert!(request.json_output);
    }
}
