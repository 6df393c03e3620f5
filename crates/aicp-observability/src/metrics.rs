use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

// ── Gateway series ──────────────────────────────────────────────

pub const REQUESTS_TOTAL: &str = "gateway_requests_total";
pub const LATENCY_SECONDS: &str = "gateway_latency_seconds";
pub const TOKENS_TOTAL: &str = "gateway_tokens_total";
pub const CIRCUIT_BREAKER_STATE: &str = "circuit_breaker_state";

// ── Pipeline series ─────────────────────────────────────────────

pub const PIPELINE_RUNS: &str = "pipeline_runs_total";
pub const STAGE_LATENCY_SECONDS: &str = "pipeline_stage_latency_seconds";

/// Install the global Prometheus recorder and register descriptions for
/// every series this crate emits. Call once at process startup; the
/// returned handle renders the current metrics snapshot for a `/metrics`
/// endpoint.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!(REQUESTS_TOTAL, "Total number of LLM requests");
    describe_histogram!(LATENCY_SECONDS, "Request latency in seconds");
    describe_counter!(TOKENS_TOTAL, "Total tokens consumed");
    describe_gauge!(
        CIRCUIT_BREAKER_STATE,
        "State of the circuit breaker (0=Closed, 1=Open, 2=Half-Open)"
    );
    describe_counter!(PIPELINE_RUNS, "Total number of pipeline runs");
    describe_histogram!(STAGE_LATENCY_SECONDS, "Pipeline stage latency");

    info!("prometheus metrics exporter initialized");
    Ok(handle)
}

/// Record a completed gateway request.
pub fn record_request(provider: &str, model: &str, status: &str, latency: std::time::Duration) {
    counter!(
        REQUESTS_TOTAL,
        "provider" => provider.to_string(),
        "model" => model.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);
    histogram!(
        LATENCY_SECONDS,
        "provider" => provider.to_string(),
        "model" => model.to_string(),
    )
    .record(latency.as_secs_f64());
}

/// Record token usage for a completed request.
pub fn record_tokens(provider: &str, prompt_tokens: u64, completion_tokens: u64) {
    counter!(TOKENS_TOTAL, "provider" => provider.to_string(), "type" => "prompt").increment(prompt_tokens);
    counter!(TOKENS_TOTAL, "provider" => provider.to_string(), "type" => "completion")
        .increment(completion_tokens);
}

/// Numeric encoding for the `circuit_breaker_state` gauge.
pub enum BreakerGaugeState {
    Closed,
    Open,
    HalfOpen,
}

pub fn record_breaker_state(breaker: &str, state: BreakerGaugeState) {
    let value = match state {
        BreakerGaugeState::Closed => 0.0,
        BreakerGaugeState::Open => 1.0,
        BreakerGaugeState::HalfOpen => 2.0,
    };
    gauge!(CIRCUIT_BREAKER_STATE, "breaker" => breaker.to_string()).set(value);
}

/// Record a finished pipeline run.
pub fn record_pipeline_run(pipeline: &str, status: &str) {
    counter!(PIPELINE_RUNS, "pipeline" => pipeline.to_string(), "status" => status.to_string())
        .increment(1);
}

/// Record a single stage's execution latency.
pub fn record_stage_latency(pipeline: &str, stage: &str, latency: std::time::Duration) {
    histogram!(
        STAGE_LATENCY_SECONDS,
        "pipeline" => pipeline.to_string(),
        "stage" => stage.to_string(),
    )
    .record(latency.as_secs_f64());
}
