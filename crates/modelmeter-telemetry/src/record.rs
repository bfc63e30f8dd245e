//! Request record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Failures when re-hydrating a stored record
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("error_message must be present exactly when success is false")]
    InconsistentOutcome,
}

/// One observed model invocation
///
/// Immutable once created: records are appended and read back, never
/// mutated. `cost_usd` is derived at creation time as
/// `(input_tokens + output_tokens) / 1000 * rate(model_name)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub request_id: String,
    pub model_name: String,
    pub model_version: String,
    #[serde(default)]
    pub prompt_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub latency_ms: f64,
    pub cost_usd: f64,
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl RequestRecord {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// Check the outcome invariant: `error_message` is present iff the
    /// request failed.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.success == self.error_message.is_some() {
            return Err(RecordError::InconsistentOutcome);
        }
        Ok(())
    }

    /// Re-hydrate a record from its stored JSON form.
    ///
    /// Absent or malformed fields are a typed failure, never a silently
    /// defaulted record.
    pub fn from_json(payload: &str) -> Result<Self, RecordError> {
        let record: RequestRecord = serde_json::from_str(payload)?;
        record.validate()?;
        Ok(record)
    }

    pub fn to_json(&self) -> Result<String, RecordError> {
        Ok(serde_json::to_string(self)?)
    }
}
