use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration — maps to `aicp.toml`.
///
/// Provider secrets are deliberately absent from this schema: they are read
/// exclusively from `OPENAI_API_KEY` / `GEMINI_API_KEY` at provider
/// construction time, never from a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AicpConfig {
    pub reliability: ReliabilityConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub registry: RegistryConfig,
    pub logging: LoggingConfig,
}

impl Default for AicpConfig {
    fn default() -> Self {
        Self {
            reliability: ReliabilityConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            registry: RegistryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// ── Reliability layer ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliabilityConfig {
    /// Retry attempts per provider before failing over. Default 3.
    pub max_retries: u32,
    /// Base exponential backoff delay in seconds. Default 1.
    pub base_delay_secs: f64,
    /// Per-provider wall-clock timeout in seconds. Default 60.
    pub provider_timeout_secs: u64,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_secs: 1.0,
            provider_timeout_secs: 60,
        }
    }
}

// ── Circuit breaker ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before a provider's breaker opens. Default 5.
    pub failure_threshold: u32,
    /// Seconds an open breaker waits before probing again. Default 30.
    pub recovery_timeout_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_secs: 30,
        }
    }
}

// ── Model registry ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Path to the JSON-backed model registry file, relative to the working
    /// directory unless absolute.
    pub path: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("model_registry.json"),
        }
    }
}

// ── Logging ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, e.g. "info" or "aicp_gateway=debug,info".
    pub level: String,
    /// "json" for machine-readable output, anything else for console format.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_conservative() {
        let config = AicpConfig::default();
        assert_eq!(config.reliability.max_retries, 3);
        assert_eq!(config.reliability.base_delay_secs, 1.0);
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
        assert_eq!(config.circuit_breaker.recovery_timeout_secs, 30);
        assert_eq!(config.registry.path, PathBuf::from("model_registry.json"));
    }

    #[test]
    fn partial_toml_falls_back_to_defaults_for_missing_sections() {
        let parsed: AicpConfig = toml::from_str("[reliability]\nmax_retries = 5\n").unwrap();
        assert_eq!(parsed.reliability.max_retries, 5);
        assert_eq!(parsed.circuit_breaker.failure_threshold, 5);
    }
}
