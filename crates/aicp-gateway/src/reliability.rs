use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use aicp_core::{AicpError, CompletionRequest, CompletionResponse, Result};
use aicp_observability::metrics::{self, BreakerGaugeState};
use aicp_providers::Provider;

use crate::circuit_breaker::{CircuitBreaker, Clock, SystemClock};

/// Default per-provider wall-clock timeout.
const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(60);

/// Executes a request against a prioritized list of providers, applying
/// per-provider retry with exponential backoff, circuit breaking, and
/// failover to the next provider in the list.
///
/// Every error is treated as retryable: the gateway has no reliable way to
/// distinguish transient failures from permanent ones across arbitrary
/// provider backends, so it always retries up to `max_retries` times before
/// falling over to the next provider.
///
/// Each attempt is wrapped in a wall-clock timeout; a provider that hangs
/// past it counts as an ordinary breaker failure rather than blocking the
/// call indefinitely.
pub struct ReliabilityLayer {
    providers: Vec<Arc<dyn Provider>>,
    breakers: Mutex<HashMap<String, CircuitBreaker>>,
    clock: Arc<dyn Clock>,
    max_retries: u32,
    base_delay: Duration,
    provider_timeout: Duration,
}

impl ReliabilityLayer {
    pub fn new(providers: Vec<Arc<dyn Provider>>, max_retries: u32, base_delay: Duration) -> Self {
        Self::with_breaker_policy(providers, max_retries, base_delay, 5, Duration::from_secs(30))
    }

    pub fn with_breaker_policy(
        providers: Vec<Arc<dyn Provider>>,
        max_retries: u32,
        base_delay: Duration,
        failure_threshold: u32,
        recovery_timeout: Duration,
    ) -> Self {
        Self::with_provider_timeout(
            providers,
            max_retries,
            base_delay,
            failure_threshold,
            recovery_timeout,
            DEFAULT_PROVIDER_TIMEOUT,
        )
    }

    pub fn with_provider_timeout(
        providers: Vec<Arc<dyn Provider>>,
        max_retries: u32,
        base_delay: Duration,
        failure_threshold: u32,
        recovery_timeout: Duration,
        provider_timeout: Duration,
    ) -> Self {
        Self::with_clock(
            providers,
            max_retries,
            base_delay,
            failure_threshold,
            recovery_timeout,
            provider_timeout,
            Arc::new(SystemClock),
        )
    }

    pub fn with_clock(
        providers: Vec<Arc<dyn Provider>>,
        max_retries: u32,
        base_delay: Duration,
        failure_threshold: u32,
        recovery_timeout: Duration,
        provider_timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let breakers = providers
            .iter()
            .map(|p| (p.provider_name().to_string(), CircuitBreaker::new(failure_threshold, recovery_timeout)))
            .collect();
        Self {
            providers,
            breakers: Mutex::new(breakers),
            clock,
            max_retries,
            base_delay,
            provider_timeout,
        }
    }

    pub async fn execute_with_fallback(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse> {
        let mut last_error = None;

        for provider in &self.providers {
            let name = provider.provider_name();

            let (admitted, was_half_open) = {
                let mut breakers = self.breakers.lock();
                let breaker = breakers.get_mut(name).unwrap();
                let was_open = breaker.is_open();
                let admitted = breaker.can_execute(&*self.clock);
                (admitted, was_open && breaker.is_half_open())
            };
            if !admitted {
                debug!(provider = name, "skipping_provider_breaker_open");
                metrics::record_breaker_state(name, BreakerGaugeState::Open);
                continue;
            }
            if was_half_open {
                info!(provider = name, "circuit_breaker_half_open");
                metrics::record_breaker_state(name, BreakerGaugeState::HalfOpen);
            }

            for attempt in 0..self.max_retries {
                info!(provider = name, attempt = attempt + 1, "attempting_request");
                let started = Instant::now();
                let was_half_open = self.breakers.lock().get_mut(name).unwrap().is_half_open();
                let outcome = match tokio::time::timeout(self.provider_timeout, provider.complete(request)).await {
                    Ok(result) => result,
                    Err(_) => Err(AicpError::Provider(format!(
                        "provider timed out after {:?}",
                        self.provider_timeout
                    ))),
                };
                match outcome {
                    Ok(response) => {
                        self.breakers.lock().get_mut(name).unwrap().record_success();
                        if was_half_open {
                            info!(provider = name, "circuit_breaker_recovered");
                        }
                        metrics::record_breaker_state(name, BreakerGaugeState::Closed);
                        metrics::record_request(name, &response.model, "success", started.elapsed());
                        metrics::record_tokens(
                            name,
                            response.usage.prompt_tokens as u64,
                            response.usage.completion_tokens as u64,
                        );
                        return Ok(response);
                    }
                    Err(e) => {
                        error!(provider = name, attempt = attempt + 1, error = %e, "request_failed");
                        let (just_opened, failures) = {
                            let mut breakers = self.breakers.lock();
                            let breaker = breakers.get_mut(name).unwrap();
                            let was_open = breaker.is_open();
                            breaker.record_failure(&*self.clock);
                            (!was_open && breaker.is_open(), breaker.consecutive_failures())
                        };
                        metrics::record_request(name, &request.model, "failure", started.elapsed());
                        if just_opened {
                            warn!(provider = name, failures, "circuit_breaker_opened");
                            metrics::record_breaker_state(name, BreakerGaugeState::Open);
                        }
                        last_error = Some(e);

                        if attempt + 1 < self.max_retries {
                            let delay = self.base_delay * 2u32.pow(attempt);
                            tokio::time::sleep(delay).await;
                        } else {
                            break;
                        }
                    }
                }
            }
        }

        Err(last_error.unwrap_or(AicpError::AllProvidersUnavailable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aicp_core::Message;
    use aicp_providers::mock::MockProvider;

    fn make_request() -> CompletionRequest {
        CompletionRequest::new("test-model", vec![Message::user("hi")])
    }

    #[tokio::test]
    async fn succeeds_on_first_provider() {
        let provider = Arc::new(MockProvider::new("primary").with_response("ok"));
        let layer = ReliabilityLayer::new(vec![provider], 3, Duration::from_millis(1));
        let resp = layer.execute_with_fallback(&make_request()).await.unwrap();
        assert_eq!(resp.content, "ok");
    }

    #[tokio::test]
    async fn retries_before_succeeding() {
        let provider = MockProvider::new("flaky").with_error("HTTP 500");
        provider.queue_response(aicp_providers::mock::MockResponse::text("recovered"));
        let layer = ReliabilityLayer::new(vec![Arc::new(provider)], 3, Duration::from_millis(1));
        let resp = layer.execute_with_fallback(&make_request()).await.unwrap();
        assert_eq!(resp.content, "recovered");
    }

    #[tokio::test]
    async fn falls_over_to_next_provider() {
        let primary = MockProvider::new("primary");
        for _ in 0..3 {
            primary.queue_response(aicp_providers::mock::MockResponse::error("down"));
        }
        let fallback = MockProvider::new("fallback").with_response("fallback reply");

        let layer = ReliabilityLayer::new(
            vec![Arc::new(primary), Arc::new(fallback)],
            3,
            Duration::from_millis(1),
        );
        let resp = layer.execute_with_fallback(&make_request()).await.unwrap();
        assert_eq!(resp.content, "fallback reply");
    }

    #[tokio::test]
    async fn all_providers_failing_returns_last_error() {
        let provider = MockProvider::new("only");
        for _ in 0..3 {
            provider.queue_response(aicp_providers::mock::MockResponse::error("still down"));
        }
        let layer = ReliabilityLayer::new(vec![Arc::new(provider)], 3, Duration::from_millis(1));
        let result = layer.execute_with_fallback(&make_request()).await;
        assert!(result.is_err());
    }

    struct HangingProvider;

    #[async_trait::async_trait]
    impl aicp_providers::Provider for HangingProvider {
        fn provider_name(&self) -> &str {
            "hanging"
        }

        async fn complete(&self, _request: &CompletionRequest) -> Result<CompletionResponse> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!("timeout should fire before this sleep ever completes")
        }
    }

    #[tokio::test]
    async fn provider_timeout_counts_as_a_breaker_failure_and_fails_over() {
        let fallback = MockProvider::new("fallback").with_response("fallback reply");
        let layer = ReliabilityLayer::with_provider_timeout(
            vec![Arc::new(HangingProvider), Arc::new(fallback)],
            1,
            Duration::from_millis(1),
            5,
            Duration::from_secs(30),
            Duration::from_millis(10),
        );
        let resp = layer.execute_with_fallback(&make_request()).await.unwrap();
        assert_eq!(resp.content, "fallback reply");
    }

    #[tokio::test]
    async fn provider_timeout_opens_the_breaker_after_enough_failures() {
        let layer = ReliabilityLayer::with_provider_timeout(
            vec![Arc::new(HangingProvider)],
            1,
            Duration::from_millis(1),
            1,
            Duration::from_secs(30),
            Duration::from_millis(10),
        );
        let result = layer.execute_with_fallback(&make_request()).await;
        assert!(result.is_err());
    }
}
