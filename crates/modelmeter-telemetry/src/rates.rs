//! Per-model cost rates

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Model name whose rate backs the default entry
pub const DEFAULT_MODEL: &str = "gpt-4";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelRate {
    pub cost_per_1k_tokens: f64,
}

/// Static mapping from model name to its USD rate.
///
/// Loaded once at startup; unknown model names fall back to the default
/// entry rather than erroring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateTable {
    rates: HashMap<String, ModelRate>,
    default: ModelRate,
}

impl RateTable {
    /// The built-in demo rates.
    pub fn builtin() -> Self {
        let mut rates = HashMap::new();
        rates.insert("gpt-4".to_string(), ModelRate { cost_per_1k_tokens: 0.03 });
        rates.insert(
            "gpt-3.5-turbo".to_string(),
            ModelRate { cost_per_1k_tokens: 0.002 },
        );
        rates.insert(
            "claude-3-opus".to_string(),
            ModelRate { cost_per_1k_tokens: 0.015 },
        );
        rates.insert(
            "claude-3-sonnet".to_string(),
            ModelRate { cost_per_1k_tokens: 0.003 },
        );

        let default = rates[DEFAULT_MODEL];
        Self { rates, default }
    }

    pub fn with_rate(mut self, model_name: &str, cost_per_1k_tokens: f64) -> Self {
        self.rates
            .insert(model_name.to_string(), ModelRate { cost_per_1k_tokens });
        self
    }

    pub fn rate(&self, model_name: &str) -> ModelRate {
        self.rates.get(model_name).copied().unwrap_or(self.default)
    }

    /// USD cost of one request: `(input + output) / 1000 * rate`.
    pub fn cost(&self, model_name: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        let total_tokens = input_tokens + output_tokens;
        (total_tokens as f64 / 1000.0) * self.rate(model_name).cost_per_1k_tokens
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_rate_at_1k_tokens() {
        let rates = RateTable::builtin();
        assert_eq!(rates.cost("gpt-4", 1000, 0), 0.03);
        assert_eq!(rates.cost("claude-3-sonnet", 1000, 0), 0.003);
    }

    #[test]
    fn test_unknown_model_falls_back_to_default() {
        let rates = RateTable::builtin();
        assert_eq!(rates.rate("no-such-model").cost_per_1k_tokens, 0.03);
        assert_eq!(rates.cost("no-such-model", 500, 500), 0.03);
    }

    #[test]
    fn test_zero_tokens_costs_nothing() {
        let rates = RateTable::builtin();
        assert_eq!(rates.cost("gpt-4", 0, 0), 0.0);
    }

    #[test]
    fn test_with_rate_overrides() {
        let rates = RateTable::builtin().with_rate("local-llama", 0.0001);
        assert_eq!(rates.rate("local-llama").cost_per_1k_tokens, 0.0001);
    }
}
