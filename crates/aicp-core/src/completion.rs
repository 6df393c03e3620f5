use serde::{Deserialize, Serialize};

use crate::message::{Message, Role};

/// A stop sequence: either a single string or an ordered list of strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StopSequence {
    Single(String),
    Many(Vec<String>),
}

/// A request to a completion provider.
///
/// Immutable with respect to the caller once submitted: middleware produces
/// new `CompletionRequest` values rather than mutating this one in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Whether the caller asked for a streamed response. The core always
    /// treats this as `false` — streaming token delivery is out of scope.
    #[serde(default)]
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopSequence>,
    #[serde(default)]
    pub extra_params: serde_json::Map<String, serde_json::Value>,
}

fn default_temperature() -> f32 {
    0.7
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: default_temperature(),
            max_tokens: None,
            stream: false,
            stop: None,
            extra_params: serde_json::Map::new(),
        }
    }
}

/// Token usage for one completion.
///
/// Invariant: `total_tokens == prompt_tokens + completion_tokens` whenever
/// the provider reports real counts; an all-zero `Usage` is acceptable when
/// a provider cannot report usage at all.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// A completed (non-streaming) response from a completion provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub id: String,
    pub model: String,
    pub content: String,
    #[serde(default = "default_role")]
    pub role: Role,
    pub usage: Usage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub provider_metadata: serde_json::Map<String, serde_json::Value>,
    /// Estimated cost, filled in by the gateway after the provider responds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

fn default_role() -> Role {
    Role::Assistant
}

impl CompletionResponse {
    pub fn new(id: impl Into<String>, model: impl Into<String>, content: impl Into<String>, usage: Usage) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            content: content.into(),
            role: Role::Assistant,
            usage,
            finish_reason: None,
            provider_metadata: serde_json::Map::new(),
            cost: None,
        }
    }
}
