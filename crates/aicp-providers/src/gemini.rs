use async_trait::async_trait;
use tracing::error;

use aicp_core::{AicpError, CompletionRequest, CompletionResponse, Result, Role, StopSequence, Usage};

use crate::provider::Provider;

/// Google Gemini `generateContent` provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/models".into(),
        }
    }
}

/// Gemini has no system role — system and user turns both map to "user".
fn gemini_role(role: Role) -> &'static str {
    match role {
        Role::User | Role::System => "user",
        Role::Assistant | Role::Tool => "model",
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        if self.api_key.is_empty() {
            return Err(AicpError::Provider("gemini API key not set".into()));
        }

        let contents: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": gemini_role(m.role),
                    "parts": [{ "text": m.content }],
                })
            })
            .collect();

        let stop_sequences = request.stop.as_ref().map(|s| match s {
            StopSequence::Single(s) => vec![s.clone()],
            StopSequence::Many(v) => v.clone(),
        });

        let payload = serde_json::json!({
            "contents": contents,
            "generationConfig": {
                "temperature": request.temperature,
                "maxOutputTokens": request.max_tokens,
                "stopSequences": stop_sequences,
            },
        });

        let url = format!(
            "{}/{}:generateContent?key={}",
            self.base_url, request.model, self.api_key
        );

        let resp = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AicpError::Provider(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!(provider = "gemini", status = %status, body = %text, "gemini api error");
            return Err(AicpError::Provider(format!("HTTP {status}: {text}")));
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| AicpError::Provider(e.to_string()))?;

        let candidate = &data["candidates"][0];
        let content = candidate["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or("")
            .to_string();

        let usage_info = &data["usageMetadata"];
        let prompt_tokens = usage_info["promptTokenCount"].as_u64().unwrap_or(0) as u32;
        let completion_tokens = usage_info["candidatesTokenCount"].as_u64().unwrap_or(0) as u32;

        let mut response = CompletionResponse::new(
            format!("gemini-{}", uuid::Uuid::new_v4()),
            request.model.clone(),
            content,
            Usage::new(prompt_tokens, completion_tokens),
        );
        response.finish_reason = candidate["finishReason"].as_str().map(String::from);
        if let Some(ratings) = candidate.get("safetyRatings") {
            response
                .provider_metadata
                .insert("safety_ratings".into(), ratings.clone());
        }
        Ok(response)
    }
}
