use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use aicp_core::{CompletionRequest, CompletionResponse, Result, Usage};
use aicp_providers::Provider;

use crate::middleware::{Middleware, MiddlewarePipeline};
use crate::reliability::ReliabilityLayer;

/// Price per 1k tokens, `(prompt, completion)`, in USD. Looked up by longest
/// matching prefix of the response model name so e.g. "gpt-4-turbo" doesn't
/// shadow a more specific "gpt-4-turbo-preview" entry or vice versa.
const PRICING_TABLE: &[(&str, f64, f64)] = &[
    ("gpt-4o-mini", 0.00015, 0.0006),
    ("gpt-4o", 0.0025, 0.01),
    ("gpt-4-turbo", 0.01, 0.03),
    ("gpt-4", 0.03, 0.06),
    ("gpt-3.5-turbo", 0.0015, 0.002),
    ("gemini-1.5-pro", 0.00125, 0.00375),
    ("gemini-pro", 0.000125, 0.000375),
];

fn estimate_cost(model: &str, usage: &Usage) -> f64 {
    let rates = PRICING_TABLE
        .iter()
        .filter(|(prefix, _, _)| model.contains(prefix))
        .max_by_key(|(prefix, _, _)| prefix.len());

    let (prompt_rate, completion_rate) = match rates {
        Some((_, p, c)) => (*p, *c),
        None => (0.0015, 0.002),
    };

    let cost = (usage.prompt_tokens as f64 / 1000.0) * prompt_rate
        + (usage.completion_tokens as f64 / 1000.0) * completion_rate;
    (cost * 1_000_000.0).round() / 1_000_000.0
}

/// The LLM gateway: runs middleware, then executes the request through the
/// reliability layer, then estimates cost and runs middleware post-processing.
pub struct Gateway {
    reliability: ReliabilityLayer,
    pipeline: MiddlewarePipeline,
}

impl Gateway {
    pub fn new(providers: Vec<Arc<dyn Provider>>, middlewares: Vec<Box<dyn Middleware>>) -> Self {
        Self::with_retry_policy(providers, middlewares, 3, Duration::from_secs(1))
    }

    pub fn with_retry_policy(
        providers: Vec<Arc<dyn Provider>>,
        middlewares: Vec<Box<dyn Middleware>>,
        max_retries: u32,
        base_delay: Duration,
    ) -> Self {
        Self {
            reliability: ReliabilityLayer::new(providers, max_retries, base_delay),
            pipeline: MiddlewarePipeline::new(middlewares),
        }
    }

    /// Fully configured constructor: retry/backoff policy, the per-provider
    /// circuit breaker's failure threshold and recovery timeout, and the
    /// per-provider wall-clock timeout for a single `complete()` call.
    pub fn with_policy(
        providers: Vec<Arc<dyn Provider>>,
        middlewares: Vec<Box<dyn Middleware>>,
        max_retries: u32,
        base_delay: Duration,
        failure_threshold: u32,
        recovery_timeout: Duration,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            reliability: ReliabilityLayer::with_provider_timeout(
                providers,
                max_retries,
                base_delay,
                failure_threshold,
                recovery_timeout,
                provider_timeout,
            ),
            pipeline: MiddlewarePipeline::new(middlewares),
        }
    }

    #[instrument(name = "llm_gateway_completion", skip(self, request), fields(model = %request.model))]
    pub async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let processed_request = self.pipeline.run_pre(request).await?;
        let mut response = self.reliability.execute_with_fallback(&processed_request).await?;
        response.cost = Some(estimate_cost(&response.model, &response.usage));
        self.pipeline.run_post(response).await
    }
}
