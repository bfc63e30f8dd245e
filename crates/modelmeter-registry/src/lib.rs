//! In-process model registry: registration, versioning, deployment status

use chrono::{DateTime, Utc};
use modelmeter_telemetry::{stable_hash64, RateTable};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("model {name} version {version} not found")]
    NotFound { name: String, version: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    OpenAi,
    Anthropic,
    AzureOpenAi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Ready,
    Deployed,
    Deprecated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub name: String,
    pub version: String,
    pub provider: Provider,
    pub status: ModelStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub parameters: HashMap<String, serde_json::Value>,
    pub performance_metrics: HashMap<String, f64>,
    pub cost_per_1k_tokens: f64,
    pub description: Option<String>,
}

/// Side-by-side view of two registered models
#[derive(Debug, Clone, Serialize)]
pub struct ModelComparison {
    pub model_a: ModelMetadata,
    pub model_b: ModelMetadata,
    /// `b`'s rate minus `a`'s rate
    pub cost_difference: f64,
}

/// Registry of known models, keyed by `name_version`.
///
/// A plain in-process map constructed by the host and passed where
/// needed; no import-time singleton.
#[derive(Debug)]
pub struct ModelRegistry {
    models: HashMap<String, ModelMetadata>,
    rates: RateTable,
}

fn model_key(name: &str, version: &str) -> String {
    format!("{name}_{version}")
}

impl ModelRegistry {
    pub fn new(rates: RateTable) -> Self {
        Self { models: HashMap::new(), rates }
    }

    /// Register a new model version and return the generated version id.
    ///
    /// The version is the registration second plus a hash of the
    /// canonical parameter JSON, so re-registering identical parameters
    /// in the same second is idempotent on the version string.
    pub fn register(
        &mut self,
        name: &str,
        provider: Provider,
        parameters: HashMap<String, serde_json::Value>,
        description: Option<String>,
    ) -> String {
        let now = Utc::now();
        let canonical =
            serde_json::to_string(&serde_json::Value::Object(
                parameters
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ))
            .unwrap_or_default();
        let version = format!(
            "{}-{:08x}",
            now.format("%Y%m%dT%H%M%S"),
            stable_hash64(&canonical) as u32
        );

        let metadata = ModelMetadata {
            name: name.to_string(),
            version: version.clone(),
            provider,
            status: ModelStatus::Ready,
            created_at: now,
            updated_at: now,
            parameters,
            performance_metrics: HashMap::new(),
            cost_per_1k_tokens: self.rates.rate(name).cost_per_1k_tokens,
            description,
        };

        tracing::info!(model = name, version = %version, "model registered");
        self.models.insert(model_key(name, &version), metadata);
        version
    }

    pub fn deploy(&mut self, name: &str, version: &str) -> Result<(), RegistryError> {
        let model = self.get_mut(name, version)?;
        model.status = ModelStatus::Deployed;
        model.updated_at = Utc::now();
        tracing::info!(model = name, version, "model deployed");
        Ok(())
    }

    pub fn deprecate(&mut self, name: &str, version: &str) -> Result<(), RegistryError> {
        let model = self.get_mut(name, version)?;
        model.status = ModelStatus::Deprecated;
        model.updated_at = Utc::now();
        Ok(())
    }

    /// A specific version, or the most recently updated one when
    /// `version` is omitted.
    pub fn get(&self, name: &str, version: Option<&str>) -> Option<&ModelMetadata> {
        match version {
            Some(version) => self.models.get(&model_key(name, version)),
            None => self
                .models
                .values()
                .filter(|m| m.name == name)
                .max_by_key(|m| m.updated_at),
        }
    }

    pub fn list(&self) -> Vec<&ModelMetadata> {
        let mut models: Vec<&ModelMetadata> = self.models.values().collect();
        models.sort_by(|a, b| (&a.name, &a.version).cmp(&(&b.name, &b.version)));
        models
    }

    pub fn update_metrics(
        &mut self,
        name: &str,
        version: &str,
        metrics: &HashMap<String, f64>,
    ) -> Result<(), RegistryError> {
        let model = self.get_mut(name, version)?;
        model.performance_metrics.extend(metrics.clone());
        model.updated_at = Utc::now();
        Ok(())
    }

    pub fn compare(
        &self,
        name_a: &str,
        version_a: &str,
        name_b: &str,
        version_b: &str,
    ) -> Result<ModelComparison, RegistryError> {
        let a = self.require(name_a, version_a)?;
        let b = self.require(name_b, version_b)?;
        Ok(ModelComparison {
            cost_difference: b.cost_per_1k_tokens - a.cost_per_1k_tokens,
            model_a: a.clone(),
            model_b: b.clone(),
        })
    }

    /// Cost of `token_count` tokens on a registered version; 0.0 when
    /// the version is unknown.
    pub fn cost_for(&self, name: &str, version: &str, token_count: u64) -> f64 {
        match self.get(name, Some(version)) {
            Some(model) => (token_count as f64 / 1000.0) * model.cost_per_1k_tokens,
            None => 0.0,
        }
    }

    fn require(&self, name: &str, version: &str) -> Result<&ModelMetadata, RegistryError> {
        self.models
            .get(&model_key(name, version))
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
                version: version.to_string(),
            })
    }

    fn get_mut(&mut self, name: &str, version: &str) -> Result<&mut ModelMetadata, RegistryError> {
        self.models
            .get_mut(&model_key(name, version))
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
                version: version.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ModelRegistry {
        ModelRegistry::new(RateTable::builtin())
    }

    fn params(temperature: f64) -> HashMap<String, serde_json::Value> {
        let mut params = HashMap::new();
        params.insert("temperature".to_string(), serde_json::json!(temperature));
        params
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = registry();
        let version = registry.register("gpt-4", Provider::OpenAi, params(0.7), None);

        let model = registry.get("gpt-4", Some(&version)).unwrap();
        assert_eq!(model.status, ModelStatus::Ready);
        assert_eq!(model.cost_per_1k_tokens, 0.03);
    }

    #[test]
    fn test_register_unknown_model_uses_default_rate() {
        let mut registry = registry();
        let version = registry.register("brand-new", Provider::Anthropic, params(0.5), None);
        let model = registry.get("brand-new", Some(&version)).unwrap();
        assert_eq!(model.cost_per_1k_tokens, 0.03);
    }

    #[test]
    fn test_deploy_sets_status() {
        let mut registry = registry();
        let version = registry.register("gpt-4", Provider::OpenAi, params(0.7), None);
        registry.deploy("gpt-4", &version).unwrap();
        assert_eq!(
            registry.get("gpt-4", Some(&version)).unwrap().status,
            ModelStatus::Deployed
        );
    }

    #[test]
    fn test_deploy_unknown_is_not_found() {
        let mut registry = registry();
        assert!(matches!(
            registry.deploy("gpt-4", "v-missing"),
            Err(RegistryError::NotFound { .. })
        ));
    }

    #[test]
    fn test_get_without_version_returns_most_recent() {
        let mut registry = registry();
        let v1 = registry.register("gpt-4", Provider::OpenAi, params(0.5), None);
        let v2 = registry.register("gpt-4", Provider::OpenAi, params(0.9), None);
        // touching v2 makes it the most recently updated
        registry
            .update_metrics("gpt-4", &v2, &HashMap::from([("accuracy".to_string(), 0.9)]))
            .unwrap();

        let latest = registry.get("gpt-4", None).unwrap();
        assert_eq!(latest.version, v2);
        assert_ne!(latest.version, v1);
    }

    #[test]
    fn test_compare_reports_cost_difference() {
        let mut registry = registry();
        let v_gpt = registry.register("gpt-4", Provider::OpenAi, params(0.7), None);
        let v_claude =
            registry.register("claude-3-sonnet", Provider::Anthropic, params(0.7), None);

        let comparison = registry
            .compare("gpt-4", &v_gpt, "claude-3-sonnet", &v_claude)
            .unwrap();
        assert!((comparison.cost_difference - (0.003 - 0.03)).abs() < 1e-12);
    }

    #[test]
    fn test_cost_for() {
        let mut registry = registry();
        let version = registry.register("claude-3-sonnet", Provider::Anthropic, params(0.7), None);
        assert_eq!(registry.cost_for("claude-3-sonnet", &version, 1000), 0.003);
        assert_eq!(registry.cost_for("claude-3-sonnet", "missing", 1000), 0.0);
    }

    #[test]
    fn test_list_is_sorted() {
        let mut registry = registry();
        registry.register("gpt-4", Provider::OpenAi, params(0.7), None);
        registry.register("claude-3-sonnet", Provider::Anthropic, params(0.7), None);

        let names: Vec<&str> = registry.list().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["claude-3-sonnet", "gpt-4"]);
    }
}
