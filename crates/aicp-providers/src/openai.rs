use async_trait::async_trait;
use tracing::error;

use aicp_core::{AicpError, CompletionRequest, CompletionResponse, Result, Role, Usage};

use crate::provider::Provider;

/// OpenAI-compatible chat-completions provider (also works with Azure, Together, vLLM, etc.)
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    provider_name: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".into(),
            provider_name: "openai".into(),
        }
    }

    /// Point at a custom base URL, under a different provider name (Azure, Together, ...).
    pub fn with_base_url(mut self, url: impl Into<String>, name: impl Into<String>) -> Self {
        self.base_url = url.into();
        self.provider_name = name.into();
        self
    }
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        &self.provider_name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        if self.api_key.is_empty() {
            return Err(AicpError::Provider(format!(
                "{} API key not set",
                self.provider_name
            )));
        }

        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": role_str(m.role),
                    "content": m.content,
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "model": &request.model,
            "temperature": request.temperature,
            "messages": messages,
            "stream": false,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if let Some(ref stop) = request.stop {
            body["stop"] = serde_json::to_value(stop).map_err(AicpError::Serialization)?;
        }
        if let serde_json::Value::Object(map) = &mut body {
            for (k, v) in &request.extra_params {
                map.insert(k.clone(), v.clone());
            }
        }

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| AicpError::Provider(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!(provider = %self.provider_name, status = %status, body = %text, "openai api error");
            return Err(AicpError::Provider(format!("HTTP {status}: {text}")));
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| AicpError::Provider(e.to_string()))?;

        let choice = &data["choices"][0];
        let content = choice["message"]["content"].as_str().unwrap_or("").to_string();
        let role = match choice["message"]["role"].as_str() {
            Some("system") => Role::System,
            Some("user") => Role::User,
            Some("tool") => Role::Tool,
            _ => Role::Assistant,
        };

        let usage_data = &data["usage"];
        let prompt_tokens = usage_data["prompt_tokens"].as_u64().unwrap_or(0) as u32;
        let completion_tokens = usage_data["completion_tokens"].as_u64().unwrap_or(0) as u32;

        let mut response = CompletionResponse::new(
            data["id"].as_str().unwrap_or_default(),
            data["model"].as_str().unwrap_or(&request.model),
            content,
            Usage::new(prompt_tokens, completion_tokens),
        );
        response.role = role;
        response.finish_reason = choice["finish_reason"].as_str().map(String::from);
        if let Some(fp) = data["system_fingerprint"].as_str() {
            response
                .provider_metadata
                .insert("system_fingerprint".into(), serde_json::json!(fp));
        }
        Ok(response)
    }
}
