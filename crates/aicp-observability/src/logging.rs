use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, format};
use tracing_subscriber::registry::LookupSpan;

/// Keys whose values are always masked, regardless of content.
const SECRET_KEYS: &[&str] = &["api_key", "token", "password", "authorization"];

static BEARER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"Bearer \S+").unwrap());

/// Matches both logfmt (`api_key=sk-… ` / `api_key: sk-…`) and the quoted
/// rendering `tracing-subscriber`'s JSON formatter produces
/// (`"api_key":"sk-…"`), where a closing quote on the key sits between the
/// key name and the separator.
static SECRET_KEY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let keys = SECRET_KEYS.join("|");
    Regex::new(&format!(r#"(?i)\b({keys})"?\s*([:=])\s*"?[^\s",}}]+"?"#)).unwrap()
});

fn redact(line: &str) -> String {
    let line = SECRET_KEY_PATTERN.replace_all(line, |caps: &regex::Captures| {
        let key = &caps[1];
        if &caps[2] == ":" {
            format!(r#""{key}":"********""#)
        } else {
            format!("{key}=********")
        }
    });
    BEARER_PATTERN.replace_all(&line, "Bearer [SECURE_TOKEN_MASKED]").into_owned()
}

/// Wraps another [`FormatEvent`] and masks secrets in its rendered output
/// before it reaches the writer. Catches anything accidentally logged under
/// a field named `api_key`/`token`/`password`/`authorization`, or any bearer
/// token embedded in free text.
pub struct MaskSecrets<F> {
    inner: F,
}

impl<F> MaskSecrets<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }
}

impl<S, N, F> FormatEvent<S, N> for MaskSecrets<F>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
    F: FormatEvent<S, N>,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> fmt::Result {
        let mut buf = String::new();
        {
            let buf_writer = format::Writer::new(&mut buf);
            self.inner.format_event(ctx, buf_writer, event)?;
        }
        write!(writer, "{}", redact(&buf))
    }
}

/// Initialize global tracing: `format` is `"json"` for machine-readable
/// output (production) or anything else for a human-readable console
/// format (local development). `level` is an `EnvFilter` directive, e.g.
/// `"info"` or `"aicp_gateway=debug,info"`; `RUST_LOG` overrides it when set.
pub fn setup_logging(level: &str, format: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    if format == "json" {
        let base = tracing_subscriber::fmt::format().json();
        tracing_subscriber::fmt()
            .event_format(MaskSecrets::new(base))
            .with_env_filter(env_filter)
            .with_target(true)
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;
    } else {
        let base = tracing_subscriber::fmt::format();
        tracing_subscriber::fmt()
            .event_format(MaskSecrets::new(base))
            .with_env_filter(env_filter)
            .with_target(false)
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_secret_keys() {
        let line = r#"level=info api_key="sk-abc123" msg="called provider""#;
        let out = redact(line);
        assert!(!out.contains("sk-abc123"));
        assert!(out.contains("api_key=********"));
    }

    #[test]
    fn redacts_secret_keys_in_json_rendering() {
        let line = r#"{"timestamp":"2026-07-27T00:00:00Z","level":"INFO","fields":{"api_key":"sk-abc123","message":"called provider"}}"#;
        let out = redact(line);
        assert!(!out.contains("sk-abc123"));
        assert!(out.contains(r#""api_key":"********""#));
    }

    #[test]
    fn redacts_bearer_tokens_in_free_text() {
        let line = "sending request with Authorization: Bearer sk-live-12345";
        let out = redact(line);
        assert!(!out.contains("sk-live-12345"));
        assert!(out.contains("[SECURE_TOKEN_MASKED]"));
    }

    #[test]
    fn leaves_unrelated_content_untouched() {
        let line = "model=gpt-4o status=200 latency_ms=120";
        assert_eq!(redact(line), line);
    }
}
