use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use aicp_core::{CompletionRequest, CompletionResponse, Result};

/// A processing step run before a request reaches the reliability layer, and
/// again (in reverse order) after a response comes back. Both hooks default
/// to a no-op so a middleware only needs to implement the side it cares about.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn pre_process(&self, request: CompletionRequest) -> Result<CompletionRequest> {
        Ok(request)
    }

    async fn post_process(&self, response: CompletionResponse) -> Result<CompletionResponse> {
        Ok(response)
    }
}

/// Runs `pre_process` in declared order and `post_process` in reverse —
/// onion-style wrapping, so the first middleware sees the final response.
pub struct MiddlewarePipeline {
    middlewares: Vec<Box<dyn Middleware>>,
}

impl MiddlewarePipeline {
    pub fn new(middlewares: Vec<Box<dyn Middleware>>) -> Self {
        Self { middlewares }
    }

    pub async fn run_pre(&self, mut request: CompletionRequest) -> Result<CompletionRequest> {
        for mw in &self.middlewares {
            request = mw.pre_process(request).await?;
        }
        Ok(request)
    }

    pub async fn run_post(&self, mut response: CompletionResponse) -> Result<CompletionResponse> {
        for mw in self.middlewares.iter().rev() {
            response = mw.post_process(response).await?;
        }
        Ok(response)
    }
}

struct PiiPattern {
    label: &'static str,
    regex: Regex,
}

static PII_PATTERNS: Lazy<Vec<PiiPattern>> = Lazy::new(|| {
    vec![
        PiiPattern {
            label: "EMAIL",
            regex: Regex::new(r"[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+").unwrap(),
        },
        PiiPattern {
            label: "PHONE",
            regex: Regex::new(r"(\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap(),
        },
        PiiPattern {
            label: "SSN",
            regex: Regex::new(r"\d{3}-\d{2}-\d{4}").unwrap(),
        },
        PiiPattern {
            label: "CREDIT_CARD",
            regex: Regex::new(r"\b(?:\d[ -]*?){13,16}\b").unwrap(),
        },
    ]
});

/// Redacts email addresses, phone numbers, SSNs, and credit card numbers from
/// both the outgoing request and the returned response.
pub struct PiiRedactor {
    entities: Vec<String>,
}

impl PiiRedactor {
    /// Redact all known entity types.
    pub fn new() -> Self {
        Self {
            entities: PII_PATTERNS.iter().map(|p| p.label.to_string()).collect(),
        }
    }

    /// Redact only the named entity types (e.g. `["EMAIL", "SSN"]`).
    pub fn with_entities(entities: Vec<String>) -> Self {
        Self { entities }
    }

    fn redact(&self, text: &str) -> String {
        let mut out = text.to_string();
        for pattern in PII_PATTERNS.iter() {
            if !self.entities.iter().any(|e| e == pattern.label) {
                continue;
            }
            out = pattern
                .regex
                .replace_all(&out, format!("[{}_REDACTED]", pattern.label))
                .into_owned();
        }
        out
    }
}

impl Default for PiiRedactor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for PiiRedactor {
    async fn pre_process(&self, mut request: CompletionRequest) -> Result<CompletionRequest> {
        for msg in &mut request.messages {
            msg.content = self.redact(&msg.content);
        }
        Ok(request)
    }

    async fn post_process(&self, mut response: CompletionResponse) -> Result<CompletionResponse> {
        response.content = self.redact(&response.content);
        Ok(response)
    }
}

static INJECTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"ignore all previous instructions",
        r"system prompt:",
        r"you are now a",
        r"bypass",
        r"do not mention",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
    .collect()
});

/// Scans incoming messages for common prompt-injection phrasing and logs a
/// warning. Does not block the request — detection only.
#[derive(Default)]
pub struct PromptGuard;

impl PromptGuard {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Middleware for PromptGuard {
    async fn pre_process(&self, request: CompletionRequest) -> Result<CompletionRequest> {
        for msg in &request.messages {
            for pattern in INJECTION_PATTERNS.iter() {
                if pattern.is_match(&msg.content) {
                    warn!(pattern = %pattern.as_str(), "potential_prompt_injection_detected");
                }
            }
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aicp_core::{Message, Usage};

    #[tokio::test]
    async fn pii_redactor_masks_email_in_request() {
        let redactor = PiiRedactor::new();
        let req = CompletionRequest::new("m", vec![Message::user("contact me at a@b.com")]);
        let redacted = redactor.pre_process(req).await.unwrap();
        assert!(redacted.messages[0].content.contains("EMAIL_REDACTED"));
    }

    #[tokio::test]
    async fn pii_redactor_masks_response_content() {
        let redactor = PiiRedactor::new();
        let resp = CompletionResponse::new("id", "m", "call 555-123-4567", Usage::default());
        let redacted = redactor.post_process(resp).await.unwrap();
        assert!(redacted.content.contains("PHONE_REDACTED"));
    }

    #[tokio::test]
    async fn pipeline_runs_pre_in_order_and_post_in_reverse() {
        struct Tagger(&'static str);
        #[async_trait]
        impl Middleware for Tagger {
            async fn pre_process(&self, mut req: CompletionRequest) -> Result<CompletionRequest> {
                req.messages[0].content.push_str(self.0);
                Ok(req)
            }
            async fn post_process(&self, mut resp: CompletionResponse) -> Result<CompletionResponse> {
                resp.content.push_str(self.0);
                Ok(resp)
            }
        }

        let pipeline = MiddlewarePipeline::new(vec![Box::new(Tagger("A")), Box::new(Tagger("B"))]);
        let req = CompletionRequest::new("m", vec![Message::user("")]);
        let req = pipeline.run_pre(req).await.unwrap();
        assert_eq!(req.messages[0].content, "AB");

        let resp = CompletionResponse::new("id", "m", "", Usage::default());
        let resp = pipeline.run_post(resp).await.unwrap();
        assert_eq!(resp.content, "BA");
    }
}
