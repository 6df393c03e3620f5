use std::path::{Path, PathBuf};

use tracing::{info, warn};

use aicp_core::{AicpError, Result};

use crate::schema::AicpConfig;

/// Resolves and loads [`AicpConfig`] from `aicp.toml`, `AICP_CONFIG`, or the
/// library defaults, in that precedence order.
///
/// Provider secrets are not loaded here: they are read directly from
/// `OPENAI_API_KEY` / `GEMINI_API_KEY` by each provider, never through
/// this config layer.
pub struct ConfigLoader {
    config: AicpConfig,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > `AICP_CONFIG` env > `~/.aicp/aicp.toml`.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("AICP_CONFIG") {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".aicp")
            .join("aicp.toml")
    }

    /// Load the config from disk, falling back to defaults when the file is
    /// absent. A present-but-malformed file is a hard error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            let raw = std::fs::read_to_string(&config_path)?;
            toml::from_str::<AicpConfig>(&raw)
                .map_err(|e| AicpError::Config(format!("failed to parse {}: {e}", config_path.display())))?
        } else {
            warn!(?config_path, "config file not found, using defaults");
            AicpConfig::default()
        };

        let config = Self::apply_env_overrides(config);
        Ok(Self { config, config_path })
    }

    /// A loader over defaults only, bypassing the filesystem. Used by callers
    /// (tests, `--no-config` style invocations) that want the env-override
    /// behavior without a config file.
    pub fn defaults() -> Self {
        Self {
            config: Self::apply_env_overrides(AicpConfig::default()),
            config_path: PathBuf::from("aicp.toml"),
        }
    }

    pub fn get(&self) -> &AicpConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// `AICP_REGISTRY_PATH` overrides `registry.path`; `AICP_LOG_LEVEL`
    /// overrides `logging.level`. These are operational tunables, not
    /// secrets — provider API keys are intentionally never read here.
    fn apply_env_overrides(mut config: AicpConfig) -> AicpConfig {
        if let Ok(v) = std::env::var("AICP_REGISTRY_PATH") {
            config.registry.path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("AICP_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Ok(v) = std::env::var("AICP_MAX_RETRIES") {
            if let Ok(n) = v.parse::<u32>() {
                config.reliability.max_retries = n;
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let loader = ConfigLoader::load(Some(Path::new("/nonexistent/aicp.toml"))).unwrap();
        assert_eq!(loader.get().reliability.max_retries, 3);
    }

    #[test]
    fn loads_and_parses_an_existing_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[circuit_breaker]\nfailure_threshold = 10\n").unwrap();
        let loader = ConfigLoader::load(Some(file.path())).unwrap();
        assert_eq!(loader.get().circuit_breaker.failure_threshold, 10);
    }

    #[test]
    fn malformed_file_is_a_hard_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid toml {{{{").unwrap();
        let err = ConfigLoader::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, AicpError::Config(_)));
    }

    #[test]
    fn registry_path_env_override_wins_over_file_default() {
        unsafe {
            std::env::set_var("AICP_REGISTRY_PATH", "/tmp/custom_registry.json");
        }
        let loader = ConfigLoader::load(None).unwrap();
        assert_eq!(loader.get().registry.path, PathBuf::from("/tmp/custom_registry.json"));
        unsafe {
            std::env::remove_var("AICP_REGISTRY_PATH");
        }
    }
}
