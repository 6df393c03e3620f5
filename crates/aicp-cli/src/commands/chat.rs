use std::time::Duration;

use aicp_config::AicpConfig;
use aicp_core::{CompletionRequest, Message, Result};
use aicp_gateway::{Gateway, Middleware, PiiRedactor, PromptGuard};

use super::{ProviderKind, build_provider, default_model};

/// Send one completion request through the gateway: middleware pre-chain,
/// reliability layer (retry + failover over a single configured provider),
/// cost estimation, middleware post-chain.
pub async fn run(
    config: &AicpConfig,
    provider: ProviderKind,
    model: Option<String>,
    message: String,
    redact: bool,
) -> Result<()> {
    let backend = build_provider(provider, Some(message.as_str()));
    let model = model.unwrap_or_else(|| default_model(provider).to_string());

    let mut middlewares: Vec<Box<dyn Middleware>> = Vec::new();
    if redact {
        middlewares.push(Box::new(PiiRedactor::new()));
    }
    middlewares.push(Box::new(PromptGuard::new()));

    let gateway = Gateway::with_policy(
        vec![backend],
        middlewares,
        config.reliability.max_retries,
        Duration::from_secs_f64(config.reliability.base_delay_secs),
        config.circuit_breaker.failure_threshold,
        Duration::from_secs(config.circuit_breaker.recovery_timeout_secs),
        Duration::from_secs(config.reliability.provider_timeout_secs),
    );

    let request = CompletionRequest::new(model, vec![Message::user(message)]);
    let response = gateway.complete(request).await?;

    println!("{}", response.content);
    println!(
        "— model={} tokens={} cost={}",
        response.model,
        response.usage.total_tokens,
        response
            .cost
            .map(|c| format!("{c:.6}"))
            .unwrap_or_else(|| "n/a".to_string())
    );
    Ok(())
}
