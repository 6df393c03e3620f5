use std::sync::Arc;

use aicp_config::AicpConfig;
use aicp_core::{CompletionRequest, Message, Result};
use aicp_gateway::Gateway;
use aicp_pipeline::{Pipeline, Stage, StageContext, ValidationGate};
use aicp_providers::MockProvider;

/// Run a two-stage demonstration pipeline over `prompt`: a `generate` stage
/// that completes the prompt through the gateway (mock provider, so this
/// runs with no external dependencies), followed by a `validate` stage
/// gated on the generated output being non-empty.
pub async fn run(_config: &AicpConfig, prompt: String) -> Result<()> {
    let provider = Arc::new(MockProvider::new("mock").with_response(format!("Evaluation of: {prompt}")));
    let gateway = Arc::new(Gateway::new(vec![provider], vec![]));

    let generate_prompt = prompt.clone();
    let generate_gateway = Arc::clone(&gateway);
    let generate = Stage::new("generate", move |_ctx: &StageContext| {
        let gateway = Arc::clone(&generate_gateway);
        let request = CompletionRequest::new("mock-echo", vec![Message::user(generate_prompt.clone())]);
        async move {
            let response = gateway.complete(request).await.map_err(|e| anyhow::anyhow!(e))?;
            Ok(serde_json::json!({
                "content": response.content,
                "cost": response.cost,
            }))
        }
    });

    let gate = ValidationGate::new("non_empty_output")
        .with_predicate(Box::new(|v| v.get("word_count").and_then(|w| w.as_u64()).unwrap_or(0) > 0));

    let validate = Stage::new("validate", |ctx: &StageContext| {
        let generated = ctx.get("generate").cloned().unwrap_or(serde_json::Value::Null);
        async move {
            let content = generated.get("content").and_then(|c| c.as_str()).unwrap_or("").to_string();
            let word_count = content.split_whitespace().count();
            Ok(serde_json::json!({ "content": content, "word_count": word_count }))
        }
    })
    .depends_on(["generate"])
    .with_gate(gate)
    .with_retries(1);

    let mut pipeline = Pipeline::new("run-eval");
    pipeline.add_stage(generate);
    pipeline.add_stage(validate);

    let run = pipeline.run(StageContext::new()).await;
    println!("{}", serde_json::to_string_pretty(&run).unwrap_or_else(|_| "<unserializable run>".into()));
    Ok(())
}
