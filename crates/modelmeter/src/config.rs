//! Demo harness configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Daily cost alert threshold, USD
    pub cost_alert_threshold: f64,

    /// Default probability of variant B when starting an experiment
    pub default_traffic_split: f64,

    /// TTL for cached prompt versions, seconds
    pub prompt_cache_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cost_alert_threshold: 100.0,
            default_traffic_split: 0.5,
            prompt_cache_ttl_secs: 3600,
        }
    }
}

impl Config {
    /// Load from a JSON file; a missing file means defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        modelmeter_telemetry::atomic_write(path, json.as_bytes())?;
        Ok(())
    }
}
