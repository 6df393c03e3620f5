//! Mock completion provider for deterministic testing.
//!
//! Returns pre-configured responses without making any HTTP calls.

use async_trait::async_trait;
use std::sync::Mutex;
use tracing::info;

use aicp_core::{AicpError, CompletionRequest, CompletionResponse, Result, Usage};

use crate::provider::Provider;

/// A pre-configured response from the mock provider.
#[derive(Clone)]
pub struct MockResponse {
    pub text: String,
    /// If set, `complete` returns this error instead of a response.
    pub error: Option<String>,
}

impl MockResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            error: Some(msg.into()),
        }
    }
}

/// A mock provider that returns pre-configured responses in FIFO order.
///
/// # Example
/// ```
/// use aicp_providers::mock::MockProvider;
/// let provider = MockProvider::new("mock").with_response("Hello, world!");
/// ```
pub struct MockProvider {
    name: String,
    responses: Mutex<Vec<MockResponse>>,
    /// All requests received, recorded for assertions in tests.
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a simple text response.
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.responses.lock().unwrap().push(MockResponse::text(text));
        self
    }

    /// Queue an error response.
    pub fn with_error(self, error: impl Into<String>) -> Self {
        self.responses.lock().unwrap().push(MockResponse::error(error));
        self
    }

    /// Queue a response directly.
    pub fn queue_response(&self, resp: MockResponse) {
        self.responses.lock().unwrap().push(resp);
    }

    fn next_response(&self) -> MockResponse {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            MockResponse::text("(mock: no more queued responses)")
        } else {
            responses.remove(0)
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn provider_name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        for msg in &request.messages {
            info!(role = ?msg.role, "mock_provider_received");
        }
        self.requests.lock().unwrap().push(request.clone());

        let mock = self.next_response();
        if let Some(error) = mock.error {
            return Err(AicpError::Provider(error));
        }

        let prompt_len: usize = request.messages.iter().map(|m| m.content.len()).sum();
        let completion_len = mock.text.len();
        let usage = Usage::new((prompt_len / 4) as u32, (completion_len / 4) as u32);

        let mut resp = CompletionResponse::new(
            format!("mock-{}", uuid::Uuid::new_v4()),
            request.model.clone(),
            mock.text,
            usage,
        );
        resp.provider_metadata
            .insert("mock".into(), serde_json::Value::Bool(true));
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aicp_core::Message;

    fn make_request() -> CompletionRequest {
        CompletionRequest::new("mock-model", vec![Message::user("hello")])
    }

    #[tokio::test]
    async fn text_response_round_trips() {
        let provider = MockProvider::new("mock").with_response("Hello!");
        let resp = provider.complete(&make_request()).await.unwrap();
        assert_eq!(resp.content, "Hello!");
    }

    #[tokio::test]
    async fn error_response_is_returned() {
        let provider = MockProvider::new("mock").with_error("HTTP 429: rate limited");
        let result = provider.complete(&make_request()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn records_requests() {
        let provider = MockProvider::new("mock").with_response("ok");
        provider.complete(&make_request()).await.unwrap();
        let recorded = provider.requests.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].messages[0].content, "hello");
    }

    #[tokio::test]
    async fn multiple_responses_in_order() {
        let provider = MockProvider::new("mock")
            .with_response("first")
            .with_response("second");
        let r1 = provider.complete(&make_request()).await.unwrap();
        let r2 = provider.complete(&make_request()).await.unwrap();
        assert_eq!(r1.content, "first");
        assert_eq!(r2.content, "second");
    }
}
