//! Deterministic, user-sticky A/B traffic splitting

use crate::catalog::VariantStore;
use crate::ExperimentError;
use chrono::{DateTime, Utc};
use modelmeter_store::{KvStore, StoreError};
use modelmeter_telemetry::stable_hash64;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Experiment configs expire with the store key, ending the experiment
/// silently; callers that want a longer test restart it.
pub const EXPERIMENT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

fn experiment_key(name: &str) -> String {
    format!("ab_test:{name}")
}

/// Configuration of one named A/B experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub experiment_name: String,
    pub variant_a_id: String,
    pub variant_b_id: String,
    /// Probability of variant B, in [0, 1]
    pub traffic_split: f64,
    pub started_at: DateTime<Utc>,
    pub active: bool,
}

/// A user's bucket in [0, 100), stable across processes.
pub fn bucket(user_id: &str) -> u64 {
    stable_hash64(user_id) % 100
}

/// Experiment lifecycle and variant assignment over the key-value store.
///
/// Constructed explicitly and handed to whichever layer needs it; the
/// prompt catalog is passed per call through the [`VariantStore`] seam.
pub struct Experiments<S> {
    kv: S,
}

impl<S: KvStore> Experiments<S> {
    pub fn new(kv: S) -> Self {
        Self { kv }
    }

    /// Start (or restart) the experiment `name`.
    ///
    /// Replaces any existing config wholesale and marks both variants as
    /// testing in the catalog.
    pub fn start(
        &self,
        variants: &mut dyn VariantStore,
        name: &str,
        variant_a: &str,
        variant_b: &str,
        traffic_split: f64,
    ) -> Result<ExperimentConfig, ExperimentError> {
        if !(0.0..=1.0).contains(&traffic_split) {
            return Err(ExperimentError::InvalidArgument(format!(
                "traffic split {traffic_split} outside [0, 1]"
            )));
        }
        if variant_a.is_empty() || variant_b.is_empty() {
            return Err(ExperimentError::InvalidArgument(
                "variant ids must be non-empty".to_string(),
            ));
        }

        variants.mark_testing(variant_a)?;
        variants.mark_testing(variant_b)?;

        let config = ExperimentConfig {
            experiment_name: name.to_string(),
            variant_a_id: variant_a.to_string(),
            variant_b_id: variant_b.to_string(),
            traffic_split,
            started_at: Utc::now(),
            active: true,
        };
        self.save(&config)?;
        tracing::info!(
            experiment = name,
            variant_a,
            variant_b,
            traffic_split,
            "experiment started"
        );
        Ok(config)
    }

    /// The stored config for `name`, if it has not expired.
    pub fn get(&self, name: &str) -> Result<Option<ExperimentConfig>, ExperimentError> {
        let key = experiment_key(name);
        match self.kv.get(&key)? {
            None => Ok(None),
            Some(payload) => {
                let config =
                    serde_json::from_str(&payload).map_err(|e| StoreError::Malformed {
                        key,
                        reason: e.to_string(),
                    })?;
                Ok(Some(config))
            }
        }
    }

    /// Pick a variant for one request.
    ///
    /// Two-tier lookup: an active experiment config wins; otherwise the
    /// catalog's currently Active variant; otherwise `None`. With a user
    /// id the choice is sticky (same user, same config, same variant);
    /// without one it is a fresh uniform draw per call.
    pub fn assign(
        &self,
        variants: &dyn VariantStore,
        name: &str,
        user_id: Option<&str>,
    ) -> Result<Option<String>, ExperimentError> {
        let config = match self.get(name)? {
            Some(config) if config.active => config,
            _ => return Ok(variants.active_variant(name)),
        };

        let use_b = match user_id {
            Some(user_id) => (bucket(user_id) as f64) < config.traffic_split * 100.0,
            None => rand::random::<f64>() < config.traffic_split,
        };
        let variant_id = if use_b { config.variant_b_id } else { config.variant_a_id };

        tracing::debug!(
            experiment = name,
            user = user_id.unwrap_or("-"),
            variant = %variant_id,
            "variant assigned"
        );
        Ok(Some(variant_id))
    }

    /// Deactivate `name` without waiting for the TTL.
    pub fn stop(&self, name: &str) -> Result<(), ExperimentError> {
        if let Some(mut config) = self.get(name)? {
            config.active = false;
            self.save(&config)?;
        }
        Ok(())
    }

    fn save(&self, config: &ExperimentConfig) -> Result<(), ExperimentError> {
        let key = experiment_key(&config.experiment_name);
        let payload = serde_json::to_string(config).map_err(|e| StoreError::Malformed {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        self.kv.set_ex(&key, &payload, EXPERIMENT_TTL)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{PromptCatalog, PromptStatus};
    use modelmeter_store::MemoryKv;
    use std::sync::Arc;

    const TTL: Duration = Duration::from_secs(3600);

    fn setup() -> (Experiments<Arc<MemoryKv>>, PromptCatalog<Arc<MemoryKv>>, String, String) {
        let kv = Arc::new(MemoryKv::new());
        let mut catalog = PromptCatalog::new(Arc::clone(&kv), TTL);
        let a = catalog
            .create("chatbot", "short: {q}", vec!["q".to_string()], None, vec![])
            .unwrap();
        let b = catalog
            .create("chatbot", "long: {q}", vec!["q".to_string()], None, vec![])
            .unwrap();
        (Experiments::new(kv), catalog, a, b)
    }

    #[test]
    fn test_start_rejects_bad_split() {
        let (experiments, mut catalog, a, b) = setup();
        for split in [-0.1, 1.1] {
            let result = experiments.start(&mut catalog, "chatbot", &a, &b, split);
            assert!(matches!(result, Err(ExperimentError::InvalidArgument(_))));
        }
    }

    #[test]
    fn test_start_rejects_empty_variant() {
        let (experiments, mut catalog, a, _) = setup();
        let result = experiments.start(&mut catalog, "chatbot", &a, "", 0.5);
        assert!(matches!(result, Err(ExperimentError::InvalidArgument(_))));
    }

    #[test]
    fn test_start_rejects_unknown_variant() {
        let (experiments, mut catalog, a, _) = setup();
        let result = experiments.start(&mut catalog, "chatbot", &a, "missing", 0.5);
        assert!(matches!(result, Err(ExperimentError::NotFound(_))));
    }

    #[test]
    fn test_start_marks_variants_testing() {
        let (experiments, mut catalog, a, b) = setup();
        experiments.start(&mut catalog, "chatbot", &a, &b, 0.5).unwrap();
        assert_eq!(catalog.get(&a).unwrap().status, PromptStatus::Testing);
        assert_eq!(catalog.get(&b).unwrap().status, PromptStatus::Testing);
    }

    #[test]
    fn test_restart_replaces_config() {
        let (experiments, mut catalog, a, b) = setup();
        experiments.start(&mut catalog, "chatbot", &a, &b, 0.2).unwrap();
        experiments.start(&mut catalog, "chatbot", &b, &a, 0.8).unwrap();

        let config = experiments.get("chatbot").unwrap().unwrap();
        assert_eq!(config.variant_a_id, b);
        assert_eq!(config.traffic_split, 0.8);
    }

    #[test]
    fn test_sticky_assignment_is_idempotent() {
        let (experiments, mut catalog, a, b) = setup();
        experiments.start(&mut catalog, "chatbot", &a, &b, 0.5).unwrap();

        for i in 0..50 {
            let user = format!("user_{i}");
            let first = experiments
                .assign(&catalog, "chatbot", Some(&user))
                .unwrap()
                .unwrap();
            for _ in 0..5 {
                let again = experiments
                    .assign(&catalog, "chatbot", Some(&user))
                    .unwrap()
                    .unwrap();
                assert_eq!(again, first, "assignment flapped for {user}");
            }
        }
    }

    #[test]
    fn test_split_zero_always_a() {
        let (experiments, mut catalog, a, b) = setup();
        experiments.start(&mut catalog, "chatbot", &a, &b, 0.0).unwrap();

        for i in 0..100 {
            let user = format!("user_{i}");
            let variant = experiments
                .assign(&catalog, "chatbot", Some(&user))
                .unwrap()
                .unwrap();
            assert_eq!(variant, a);
        }
    }

    #[test]
    fn test_split_one_always_b() {
        let (experiments, mut catalog, a, b) = setup();
        experiments.start(&mut catalog, "chatbot", &a, &b, 1.0).unwrap();

        for i in 0..100 {
            let user = format!("user_{i}");
            let variant = experiments
                .assign(&catalog, "chatbot", Some(&user))
                .unwrap()
                .unwrap();
            assert_eq!(variant, b);
        }
    }

    #[test]
    fn test_assign_without_config_falls_back_to_active() {
        let (experiments, mut catalog, a, _) = setup();
        catalog.activate(&a).unwrap();

        let variant = experiments.assign(&catalog, "chatbot", Some("user_1")).unwrap();
        assert_eq!(variant, Some(a));
    }

    #[test]
    fn test_assign_without_config_or_active_is_none() {
        let (experiments, catalog, _, _) = setup();
        let variant = experiments.assign(&catalog, "chatbot", Some("user_1")).unwrap();
        assert_eq!(variant, None);
    }

    #[test]
    fn test_stopped_experiment_falls_back() {
        let (experiments, mut catalog, a, b) = setup();
        experiments.start(&mut catalog, "chatbot", &a, &b, 1.0).unwrap();
        experiments.stop("chatbot").unwrap();
        catalog.activate(&a).unwrap();

        let variant = experiments.assign(&catalog, "chatbot", Some("user_1")).unwrap();
        assert_eq!(variant, Some(a));
    }

    #[test]
    fn test_bucket_range_and_stability() {
        for i in 0..1000 {
            let user = format!("user_{i}");
            let value = bucket(&user);
            assert!(value < 100);
            assert_eq!(value, bucket(&user));
        }
    }

    #[test]
    fn test_anonymous_assignment_returns_a_variant() {
        let (experiments, mut catalog, a, b) = setup();
        experiments.start(&mut catalog, "chatbot", &a, &b, 0.5).unwrap();

        let variant = experiments.assign(&catalog, "chatbot", None).unwrap().unwrap();
        assert!(variant == a || variant == b);
    }
}
