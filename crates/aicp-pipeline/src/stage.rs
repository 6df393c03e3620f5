use std::time::Duration;

use chrono::Utc;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use tracing::{error, info};

use aicp_core::AicpError;

use crate::models::{StageResult, StageStatus};
use crate::validation::ValidationGate;

/// The accumulated outputs of already-completed stages, keyed by stage name.
/// Passed to each stage function so later stages can consume earlier output.
pub type StageContext = IndexMap<String, serde_json::Value>;

/// A unit of work in a pipeline: an async function over the running context,
/// an optional validation gate on its output, and a retry count for
/// transient failures.
pub struct Stage {
    name: String,
    depends_on: Vec<String>,
    gate: Option<ValidationGate>,
    retries: u32,
    func: Box<dyn Fn(&StageContext) -> BoxFuture<'static, anyhow::Result<serde_json::Value>> + Send + Sync>,
}

impl Stage {
    pub fn new<F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&StageContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<serde_json::Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            depends_on: Vec::new(),
            gate: None,
            retries: 0,
            func: Box::new(move |ctx| Box::pin(func(ctx))),
        }
    }

    pub fn depends_on(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.depends_on = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_gate(mut self, gate: ValidationGate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &[String] {
        &self.depends_on
    }

    /// Run the stage function, retrying with exponential backoff on failure
    /// (including validation-gate failures) up to `retries` times.
    pub async fn run(&self, context: &StageContext) -> StageResult {
        let mut result = StageResult::new(self.name.clone(), Utc::now());
        let mut last_error: Option<String> = None;

        for attempt in 0..=self.retries {
            if attempt > 0 {
                info!(stage = %self.name, attempt, "retrying_stage");
            }

            match (self.func)(context).await {
                Ok(output) => {
                    if let Some(gate) = &self.gate {
                        if !gate.validate(&output) {
                            let err = AicpError::ValidationFailed(gate.name().to_string());
                            error!(stage = %self.name, error = %err, attempt, "stage_failed");
                            last_error = Some(err.to_string());
                            if attempt < self.retries {
                                tokio::time::sleep(Duration::from_secs(1) * 2u32.pow(attempt)).await;
                                continue;
                            }
                            break;
                        }
                    }
                    result.output = Some(output);
                    result.status = StageStatus::Completed;
                    result.end_time = Some(Utc::now());
                    return result;
                }
                Err(e) => {
                    error!(stage = %self.name, error = %e, attempt, "stage_failed");
                    last_error = Some(e.to_string());
                    if attempt < self.retries {
                        tokio::time::sleep(Duration::from_secs(1) * 2u32.pow(attempt)).await;
                    }
                }
            }
        }

        result.error = last_error;
        result.status = StageStatus::Failed;
        result.end_time = Some(Utc::now());
        result
    }
}
