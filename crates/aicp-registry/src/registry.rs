use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use aicp_core::{AicpError, Result};

use crate::atomic::{atomic_write_json, load_json};

/// Where in its lifecycle a model version sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Staging,
    Production,
    Archived,
}

/// One registered version of a model: a named, versioned pointer at a
/// specific provider + model-name pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelVersion {
    pub version: String,
    pub provider: String,
    pub model_name: String,
    #[serde(default = "default_status")]
    pub status: ModelStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

fn default_status() -> ModelStatus {
    ModelStatus::Staging
}

/// A durable, JSON-file-backed registry of named models, each with one or
/// more versions. Every mutation is persisted atomically to disk before
/// returning.
pub struct ModelRegistry {
    storage_path: PathBuf,
    models: RwLock<HashMap<String, Vec<ModelVersion>>>,
}

impl ModelRegistry {
    pub fn new(storage_path: impl Into<PathBuf>) -> Result<Self> {
        let storage_path = storage_path.into();
        let models = load_json::<HashMap<String, Vec<ModelVersion>>>(&storage_path)?.unwrap_or_default();
        Ok(Self {
            storage_path,
            models: RwLock::new(models),
        })
    }

    fn save(&self) -> Result<()> {
        let models = self.models.read().unwrap();
        atomic_write_json(&self.storage_path, &*models)?;
        Ok(())
    }

    /// Register a new version of `name`. Rejects a duplicate `(name, version)`
    /// pair rather than silently overwriting an existing registration.
    pub fn register(
        &self,
        name: &str,
        version: &str,
        provider: &str,
        model_name: &str,
        description: Option<String>,
    ) -> Result<ModelVersion> {
        let mut models = self.models.write().unwrap();
        let versions = models.entry(name.to_string()).or_default();

        if versions.iter().any(|v| v.version == version) {
            return Err(AicpError::DuplicateVersion {
                model: name.to_string(),
                version: version.to_string(),
            });
        }

        let new_version = ModelVersion {
            version: version.to_string(),
            provider: provider.to_string(),
            model_name: model_name.to_string(),
            status: ModelStatus::Staging,
            created_at: Utc::now(),
            description,
            metadata: HashMap::new(),
        };
        versions.push(new_version.clone());
        drop(models);
        self.save()?;
        info!(model = name, version, "registered model version");
        Ok(new_version)
    }

    /// Promote `version` of `name` to production, demoting any version
    /// currently in production to archived.
    pub fn promote(&self, name: &str, version: &str) -> Result<ModelVersion> {
        let mut models = self.models.write().unwrap();
        let versions = models
            .get_mut(name)
            .ok_or_else(|| AicpError::RegistryNotFound(name.to_string()))?;

        if !versions.iter().any(|v| v.version == version) {
            return Err(AicpError::VersionNotFound {
                model: name.to_string(),
                version: version.to_string(),
            });
        }

        for v in versions.iter_mut() {
            if v.status == ModelStatus::Production {
                v.status = ModelStatus::Archived;
            }
        }
        let promoted = versions.iter_mut().find(|v| v.version == version).unwrap();
        promoted.status = ModelStatus::Production;
        let result = promoted.clone();
        drop(models);
        self.save()?;
        info!(model = name, version, "promoted model version to production");
        Ok(result)
    }

    pub fn get_production(&self, name: &str) -> Option<ModelVersion> {
        self.models
            .read()
            .unwrap()
            .get(name)?
            .iter()
            .find(|v| v.status == ModelStatus::Production)
            .cloned()
    }

    pub fn list_models(&self) -> HashMap<String, Vec<ModelVersion>> {
        self.models.read().unwrap().clone()
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry() -> (TempDir, ModelRegistry) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.json");
        let registry = ModelRegistry::new(path).unwrap();
        (dir, registry)
    }

    #[test]
    fn register_then_get_production_is_none_until_promoted() {
        let (_dir, registry) = registry();
        registry
            .register("summarizer", "1.0.0", "openai", "gpt-4o", None)
            .unwrap();
        assert!(registry.get_production("summarizer").is_none());
    }

    #[test]
    fn promote_sets_production_and_demotes_previous() {
        let (_dir, registry) = registry();
        registry
            .register("summarizer", "1.0.0", "openai", "gpt-4o", None)
            .unwrap();
        registry
            .register("summarizer", "2.0.0", "openai", "gpt-4o-mini", None)
            .unwrap();

        registry.promote("summarizer", "1.0.0").unwrap();
        registry.promote("summarizer", "2.0.0").unwrap();

        let versions = registry.list_models();
        let summarizer = &versions["summarizer"];
        let v1 = summarizer.iter().find(|v| v.version == "1.0.0").unwrap();
        let v2 = summarizer.iter().find(|v| v.version == "2.0.0").unwrap();
        assert_eq!(v1.status, ModelStatus::Archived);
        assert_eq!(v2.status, ModelStatus::Production);
    }

    #[test]
    fn duplicate_version_is_rejected() {
        let (_dir, registry) = registry();
        registry
            .register("summarizer", "1.0.0", "openai", "gpt-4o", None)
            .unwrap();
        let err = registry
            .register("summarizer", "1.0.0", "openai", "gpt-4o", None)
            .unwrap_err();
        assert!(matches!(err, AicpError::DuplicateVersion { .. }));
    }

    #[test]
    fn promote_unknown_model_errors() {
        let (_dir, registry) = registry();
        let err = registry.promote("nonexistent", "1.0.0").unwrap_err();
        assert!(matches!(err, AicpError::RegistryNotFound(_)));
    }

    #[test]
    fn promote_unknown_version_errors() {
        let (_dir, registry) = registry();
        registry
            .register("summarizer", "1.0.0", "openai", "gpt-4o", None)
            .unwrap();
        let err = registry.promote("summarizer", "9.9.9").unwrap_err();
        assert!(matches!(err, AicpError::VersionNotFound { .. }));
    }

    #[test]
    fn state_survives_reload_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.json");
        {
            let registry = ModelRegistry::new(&path).unwrap();
            registry
                .register("summarizer", "1.0.0", "openai", "gpt-4o", None)
                .unwrap();
            registry.promote("summarizer", "1.0.0").unwrap();
        }
        let reloaded = ModelRegistry::new(&path).unwrap();
        let prod = reloaded.get_production("summarizer").unwrap();
        assert_eq!(prod.version, "1.0.0");
    }
}
