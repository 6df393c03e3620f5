use thiserror::Error;

/// Unified error type for the AI control plane.
#[derive(Error, Debug)]
pub enum AicpError {
    // ── Gateway / provider errors ──────────────────────────────
    #[error("provider error: {0}")]
    Provider(String),

    #[error("all providers unavailable")]
    AllProvidersUnavailable,

    #[error("model not found: {0}")]
    ModelNotFound(String),

    // ── Pipeline errors ────────────────────────────────────────
    #[error("validation failed at gate: {0}")]
    ValidationFailed(String),

    #[error("stage failed: {stage}: {reason}")]
    StageFailed { stage: String, reason: String },

    #[error("pipeline deadlock, executed: {0:?}")]
    PipelineDeadlock(Vec<String>),

    // ── Registry errors ────────────────────────────────────────
    #[error("model not registered: {0}")]
    RegistryNotFound(String),

    #[error("version not found: {model}: {version}")]
    VersionNotFound { model: String, version: String },

    #[error("duplicate version: {model}: {version}")]
    DuplicateVersion { model: String, version: String },

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AicpError>;
