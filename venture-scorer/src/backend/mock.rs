//! Mock backend for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use super::traits::*;

/// Mock backend with a canned response.
///
/// Can be switched to fail every call, and records the last prompt it saw.
pub struct MockBackend {
    model_id: String,
    failing: AtomicBool,
    response_content: String,
    call_count: AtomicU32,
    last_prompt: Mutex<Option<String>>,
}

impl MockBackend {
    /// Create a new mock backend.
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            failing: AtomicBool::new(false),
            response_content: "{}".to_string(),
            call_count: AtomicU32::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    /// Set the response content.
    pub fn with_response(mut self, content: impl Into<String>) -> Self {
        self.response_content = content.into();
        self
    }

    /// Make every call fail with a network error.
    pub fn failing(self) -> Self {
        self.failing.store(true, Ordering::SeqCst);
        self
    }

    /// Get the number of times complete was called.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// The prompt of the most recent call.
    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new("mock-model")
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    fn id(&self) -> &str {
        &self.model_id
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(request.prompt.clone());
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(LlmError::NetworkError("Mock backend failure".to_string()));
        }

        // Rough token estimate
        Ok(CompletionResponse {
            content: self.response_content.clone(),
            usage: Usage {
                prompt_tokens: request.prompt.len() as u32 / 4,
                completion_tokens: self.response_content.len() as u32 / 4,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_backend() {
        let backend = MockBackend::new("test-model").with_response("Hello, world!");
        assert_eq!(backend.call_count(), 0);

        let response = backend
            .complete(CompletionRequest::user("Hi"))
            .await
            .unwrap();

        assert_eq!(response.content, "Hello, world!");
        assert_eq!(backend.call_count(), 1);
        assert_eq!(backend.last_prompt().as_deref(), Some("Hi"));
    }

    #[tokio::test]
    async fn test_mock_failing() {
        let backend = MockBackend::new("test-model").failing();

        let result = backend.complete(CompletionRequest::user("Hi")).await;
        assert!(matches!(result, Err(LlmError::NetworkError(_))));
        assert_eq!(backend.call_count(), 1);
    }
}
