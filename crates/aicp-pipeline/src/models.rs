use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a single stage execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

/// The outcome of running one stage once (including all of its retries).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub stage_id: String,
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl StageResult {
    pub fn new(stage_id: impl Into<String>, start_time: DateTime<Utc>) -> Self {
        Self {
            stage_id: stage_id.into(),
            status: StageStatus::Running,
            output: None,
            error: None,
            start_time,
            end_time: None,
            metadata: serde_json::Map::new(),
        }
    }
}

/// A complete record of one pipeline execution.
///
/// `results` is an [`IndexMap`] rather than a `HashMap`: iteration order must
/// match completion order, which callers rely on to reconstruct a timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub run_id: String,
    pub pipeline_name: String,
    pub status: StageStatus,
    pub results: IndexMap<String, StageResult>,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl PipelineRun {
    pub fn new(pipeline_name: impl Into<String>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            pipeline_name: pipeline_name.into(),
            status: StageStatus::Pending,
            results: IndexMap::new(),
            start_time: Utc::now(),
            end_time: None,
        }
    }
}
