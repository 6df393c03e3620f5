use async_trait::async_trait;

use aicp_core::{CompletionRequest, CompletionResponse, Result};

/// Trait implemented by each completion provider (OpenAI, Gemini, mock, etc.)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier used for routing, cost lookup, and circuit breaker keys.
    fn provider_name(&self) -> &str;

    /// Execute a completion request against this provider.
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;
}
