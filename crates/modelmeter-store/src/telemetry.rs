//! Append-only request telemetry over the key-value store
//!
//! Records live under `request:{id}` for 24 hours; per-day and
//! per-(model, day) index lists live for 30 days. Index entries may
//! outlive their records, so scans treat a dangling id as expired and
//! move on.

use crate::kv::{KvStore, StoreError};
use crate::window::Window;
use chrono::{NaiveDate, Utc};
use modelmeter_telemetry::{count_tokens, RateTable, RequestRecord};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// Raw record retention
pub const RECORD_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Day/model index retention
pub const INDEX_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

fn record_key(request_id: &str) -> String {
    format!("request:{request_id}")
}

fn day_key(day: NaiveDate) -> String {
    format!("requests:{}", day.format("%Y-%m-%d"))
}

fn model_day_key(model_name: &str, day: NaiveDate) -> String {
    format!("model_requests:{model_name}:{}", day.format("%Y-%m-%d"))
}

/// Inputs for logging one simulated invocation
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    pub request_id: Option<String>,
    pub model_name: String,
    pub model_version: String,
    pub prompt: String,
    pub response: String,
    pub latency_ms: f64,
    pub success: bool,
    pub error_message: Option<String>,
    pub prompt_id: Option<String>,
    pub user_id: Option<String>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl RequestOutcome {
    pub fn new(model_name: &str, model_version: &str, prompt: &str, response: &str) -> Self {
        Self {
            request_id: None,
            model_name: model_name.to_string(),
            model_version: model_version.to_string(),
            prompt: prompt.to_string(),
            response: response.to_string(),
            latency_ms: 0.0,
            success: true,
            error_message: None,
            prompt_id: None,
            user_id: None,
            metadata: HashMap::new(),
        }
    }
}

/// The telemetry store: ingestion, point reads, and windowed scans.
pub struct TelemetryStore<S> {
    kv: S,
    rates: RateTable,
}

impl<S: KvStore> TelemetryStore<S> {
    pub fn new(kv: S, rates: RateTable) -> Self {
        Self { kv, rates }
    }

    /// Count tokens, derive cost, stamp the timestamp, and ingest.
    ///
    /// Generates a request id when the caller supplies none. The outcome
    /// invariant is normalized here: a successful request carries no
    /// error message, a failed one always carries one.
    pub fn log_request(&self, outcome: RequestOutcome) -> Result<RequestRecord, StoreError> {
        let input_tokens = count_tokens(&outcome.prompt) as u64;
        let output_tokens = count_tokens(&outcome.response) as u64;
        let cost_usd = self
            .rates
            .cost(&outcome.model_name, input_tokens, output_tokens);

        let error_message = if outcome.success {
            None
        } else {
            Some(
                outcome
                    .error_message
                    .unwrap_or_else(|| "unknown error".to_string()),
            )
        };

        let record = RequestRecord {
            request_id: outcome
                .request_id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            model_name: outcome.model_name,
            model_version: outcome.model_version,
            prompt_id: outcome.prompt_id,
            user_id: outcome.user_id,
            timestamp: Utc::now(),
            input_tokens,
            output_tokens,
            latency_ms: outcome.latency_ms,
            cost_usd,
            success: outcome.success,
            error_message,
            metadata: outcome.metadata,
        };

        self.ingest(&record)?;
        Ok(record)
    }

    /// Append a record and index it by day and by (model, day).
    pub fn ingest(&self, record: &RequestRecord) -> Result<(), StoreError> {
        let key = record_key(&record.request_id);
        let payload = record.to_json().map_err(|e| StoreError::Malformed {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        self.kv.set_ex(&key, &payload, RECORD_TTL)?;

        let day = record.timestamp.date_naive();
        let day_index = day_key(day);
        self.kv.list_push(&day_index, &record.request_id)?;
        self.kv.expire(&day_index, INDEX_TTL)?;

        let model_index = model_day_key(&record.model_name, day);
        self.kv.list_push(&model_index, &record.request_id)?;
        self.kv.expire(&model_index, INDEX_TTL)?;

        tracing::info!(
            request_id = %record.request_id,
            model = %record.model_name,
            version = %record.model_version,
            input_tokens = record.input_tokens,
            output_tokens = record.output_tokens,
            latency_ms = record.latency_ms,
            cost_usd = record.cost_usd,
            success = record.success,
            "request recorded"
        );
        Ok(())
    }

    /// The record under `request_id`, or `None` when missing or expired.
    pub fn read(&self, request_id: &str) -> Result<Option<RequestRecord>, StoreError> {
        let key = record_key(request_id);
        match self.kv.get(&key)? {
            None => Ok(None),
            Some(payload) => RequestRecord::from_json(&payload)
                .map(Some)
                .map_err(|e| StoreError::Malformed { key, reason: e.to_string() }),
        }
    }

    /// Lazily walk every record in `window`, day by day.
    ///
    /// Dangling index entries are skipped silently; only records whose
    /// timestamp falls inside the half-open window are yielded.
    /// Re-scanning is read-only and idempotent.
    pub fn scan(&self, window: Window, model_name: Option<&str>) -> Scan<'_, S> {
        Scan {
            store: self,
            window,
            model_name: model_name.map(str::to_string),
            days: window.days().into_iter(),
            pending: Vec::new().into_iter(),
            done: false,
        }
    }
}

/// Iterator over one window of the telemetry store.
///
/// Yields `Err` once on the first storage failure, then fuses.
pub struct Scan<'a, S> {
    store: &'a TelemetryStore<S>,
    window: Window,
    model_name: Option<String>,
    days: std::vec::IntoIter<NaiveDate>,
    pending: std::vec::IntoIter<String>,
    done: bool,
}

impl<S: KvStore> Iterator for Scan<'_, S> {
    type Item = Result<RequestRecord, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if let Some(request_id) = self.pending.next() {
                match self.store.read(&request_id) {
                    // index entry outlived its record
                    Ok(None) => continue,
                    Ok(Some(record)) => {
                        if self.window.contains(record.timestamp) {
                            return Some(Ok(record));
                        }
                        continue;
                    }
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                }
            }

            let day = match self.days.next() {
                Some(day) => day,
                None => {
                    self.done = true;
                    return None;
                }
            };
            let index_key = match &self.model_name {
                Some(model) => model_day_key(model, day),
                None => day_key(day),
            };
            match self.store.kv.list_range(&index_key) {
                Ok(ids) => self.pending = ids.into_iter(),
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
