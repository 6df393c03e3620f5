use chrono::Utc;
use indexmap::IndexMap;
use tracing::{error, info};

use aicp_observability::metrics;

use crate::models::{PipelineRun, StageStatus};
use crate::stage::{Stage, StageContext};

/// A named collection of stages executed as a DAG.
///
/// Execution proceeds in "ready waves": on each pass, every stage whose
/// dependencies have all completed is run, in insertion order, before the
/// next pass is computed. Stages within a wave run sequentially rather than
/// concurrently — this keeps context propagation and cost accounting
/// deterministic and easy to reason about, at the cost of wall-clock time
/// when a wave contains independent stages.
pub struct Pipeline {
    name: String,
    stages: IndexMap<String, Stage>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: IndexMap::new(),
        }
    }

    pub fn add_stage(&mut self, stage: Stage) {
        self.stages.insert(stage.name().to_string(), stage);
    }

    pub async fn run(&self, initial_context: StageContext) -> PipelineRun {
        let mut run = PipelineRun::new(self.name.clone());
        let mut context = initial_context;
        run.status = StageStatus::Running;

        info!(pipeline = %self.name, run_id = %run.run_id, "pipeline_started");

        let mut executed: IndexMap<String, ()> = IndexMap::new();

        while executed.len() < self.stages.len() {
            let ready: Vec<&Stage> = self
                .stages
                .values()
                .filter(|s| {
                    !executed.contains_key(s.name())
                        && s.dependencies().iter().all(|dep| executed.contains_key(dep))
                })
                .collect();

            if ready.is_empty() {
                error!(pipeline = %self.name, executed = ?executed.keys().collect::<Vec<_>>(), "pipeline_deadlock");
                run.status = StageStatus::Failed;
                run.end_time = Some(Utc::now());
                metrics::record_pipeline_run(&self.name, "failed");
                return run;
            }

            for stage in ready {
                let stage_started = std::time::Instant::now();
                let stage_result = stage.run(&context).await;
                metrics::record_stage_latency(&self.name, stage.name(), stage_started.elapsed());
                let failed = stage_result.status == StageStatus::Failed;
                if let Some(output) = stage_result.output.clone() {
                    context.insert(stage.name().to_string(), output);
                }
                run.results.insert(stage.name().to_string(), stage_result);
                executed.insert(stage.name().to_string(), ());

                if failed {
                    error!(pipeline = %self.name, stage = %stage.name(), "pipeline_aborted");
                    run.status = StageStatus::Failed;
                    run.end_time = Some(Utc::now());
                    metrics::record_pipeline_run(&self.name, "failed");
                    return run;
                }
            }
        }

        run.status = StageStatus::Completed;
        run.end_time = Some(Utc::now());
        info!(pipeline = %self.name, run_id = %run.run_id, "pipeline_completed");
        metrics::record_pipeline_run(&self.name, "completed");
        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_stage(name: &str, deps: Vec<&str>, value: serde_json::Value) -> Stage {
        let value = value.clone();
        Stage::new(name.to_string(), move |_ctx| {
            let value = value.clone();
            async move { Ok(value) }
        })
        .depends_on(deps)
    }

    fn failing_stage(name: &str) -> Stage {
        Stage::new(name.to_string(), |_ctx| async { Err(anyhow::anyhow!("boom")) })
    }

    #[tokio::test]
    async fn runs_independent_stages_and_completes() {
        let mut pipeline = Pipeline::new("test");
        pipeline.add_stage(ok_stage("a", vec![], serde_json::json!(1)));
        pipeline.add_stage(ok_stage("b", vec![], serde_json::json!(2)));

        let run = pipeline.run(StageContext::new()).await;
        assert_eq!(run.status, StageStatus::Completed);
        assert_eq!(run.results.len(), 2);
    }

    #[tokio::test]
    async fn respects_dependency_order_and_propagates_context() {
        let mut pipeline = Pipeline::new("test");
        pipeline.add_stage(ok_stage("first", vec![], serde_json::json!("hello")));
        pipeline.add_stage(Stage::new("second", |ctx: &StageContext| {
            let upstream = ctx.get("first").cloned();
            async move { Ok(serde_json::json!({ "saw": upstream })) }
        }).depends_on(vec!["first"]));

        let run = pipeline.run(StageContext::new()).await;
        assert_eq!(run.status, StageStatus::Completed);
        let second_output = run.results.get("second").unwrap().output.clone().unwrap();
        assert_eq!(second_output["saw"], serde_json::json!("hello"));
    }

    #[tokio::test]
    async fn results_are_in_completion_order() {
        let mut pipeline = Pipeline::new("test");
        pipeline.add_stage(ok_stage("z", vec![], serde_json::json!(1)));
        pipeline.add_stage(ok_stage("a", vec!["z"], serde_json::json!(2)));

        let run = pipeline.run(StageContext::new()).await;
        let keys: Vec<&String> = run.results.keys().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[tokio::test]
    async fn stage_failure_aborts_the_pipeline() {
        let mut pipeline = Pipeline::new("test");
        pipeline.add_stage(failing_stage("broken"));
        pipeline.add_stage(ok_stage("never_runs", vec!["broken"], serde_json::json!(1)));

        let run = pipeline.run(StageContext::new()).await;
        assert_eq!(run.status, StageStatus::Failed);
        assert_eq!(run.results.len(), 1);
        assert!(!run.results.contains_key("never_runs"));
    }

    #[tokio::test]
    async fn unsatisfiable_dependency_is_a_deadlock() {
        let mut pipeline = Pipeline::new("test");
        pipeline.add_stage(ok_stage("only", vec!["missing"], serde_json::json!(1)));

        let run = pipeline.run(StageContext::new()).await;
        assert_eq!(run.status, StageStatus::Failed);
        assert!(run.results.is_empty());
    }
}
