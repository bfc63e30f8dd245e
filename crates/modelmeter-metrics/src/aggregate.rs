//! Cost, performance, and error aggregation
//!
//! Every aggregate is re-derived from a raw window scan on each call.
//! Fine at demo scale; per-day incremental counters are the follow-on
//! if this ever needs to be cheap.

use chrono::{DateTime, Utc};
use modelmeter_store::{KvStore, StoreError, TelemetryStore, Window};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostMetrics {
    pub total_cost_usd: f64,
    pub cost_per_request: f64,
    pub cost_per_token: f64,
    pub requests_count: u64,
    pub tokens_count: u64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    pub avg_latency_ms: f64,
    pub success_rate: f64,
    pub requests_per_hour: f64,
    pub total_requests: u64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    pub p95_latency_ms: f64,
}

impl PerformanceMetrics {
    fn empty() -> Self {
        Self {
            avg_latency_ms: 0.0,
            success_rate: 0.0,
            requests_per_hour: 0.0,
            total_requests: 0,
            min_latency_ms: 0.0,
            max_latency_ms: 0.0,
            p95_latency_ms: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorSummary {
    pub total_errors: u64,
    /// `total_errors / (total_errors + 100)` — inherited approximation,
    /// kept for behavioral compatibility.
    pub error_rate: f64,
    pub error_types: HashMap<String, u64>,
}

/// Sum cost and token counts over one window.
///
/// Derived rates are 0.0 whenever their denominator is zero.
pub fn cost_metrics<S: KvStore>(
    store: &TelemetryStore<S>,
    window: Window,
    model_name: Option<&str>,
) -> Result<CostMetrics, StoreError> {
    let mut total_cost = 0.0;
    let mut requests: u64 = 0;
    let mut tokens: u64 = 0;

    for record in store.scan(window, model_name) {
        let record = record?;
        total_cost += record.cost_usd;
        requests += 1;
        tokens += record.total_tokens();
    }

    Ok(CostMetrics {
        total_cost_usd: total_cost,
        cost_per_request: if requests > 0 { total_cost / requests as f64 } else { 0.0 },
        cost_per_token: if tokens > 0 { total_cost / tokens as f64 } else { 0.0 },
        requests_count: requests,
        tokens_count: tokens,
        period_start: window.start,
        period_end: window.end,
    })
}

/// Latency and success aggregates over one window.
///
/// p95 is nearest-rank: the value at ascending-sorted index
/// `floor(0.95 * n)`, no interpolation.
pub fn performance_metrics<S: KvStore>(
    store: &TelemetryStore<S>,
    window: Window,
    model_name: Option<&str>,
) -> Result<PerformanceMetrics, StoreError> {
    let mut latencies: Vec<f64> = Vec::new();
    let mut successes: u64 = 0;

    for record in store.scan(window, model_name) {
        let record = record?;
        latencies.push(record.latency_ms);
        if record.success {
            successes += 1;
        }
    }

    if latencies.is_empty() {
        return Ok(PerformanceMetrics::empty());
    }

    let total = latencies.len();
    let sum: f64 = latencies.iter().sum();
    latencies.sort_by(|a, b| a.total_cmp(b));
    let p95_index = total * 95 / 100;

    let hours = window.duration_hours();
    Ok(PerformanceMetrics {
        avg_latency_ms: sum / total as f64,
        success_rate: successes as f64 / total as f64,
        requests_per_hour: if hours > 0.0 { total as f64 / hours } else { 0.0 },
        total_requests: total as u64,
        min_latency_ms: latencies[0],
        max_latency_ms: latencies[total - 1],
        p95_latency_ms: latencies[p95_index],
    })
}

/// Failed requests in one window, grouped by error message.
pub fn error_summary<S: KvStore>(
    store: &TelemetryStore<S>,
    window: Window,
) -> Result<ErrorSummary, StoreError> {
    let mut error_types: HashMap<String, u64> = HashMap::new();
    let mut total_errors: u64 = 0;

    for record in store.scan(window, None) {
        let record = record?;
        if record.success {
            continue;
        }
        total_errors += 1;
        let message = record
            .error_message
            .unwrap_or_else(|| "unknown error".to_string());
        *error_types.entry(message).or_insert(0) += 1;
    }

    Ok(ErrorSummary {
        total_errors,
        error_rate: total_errors as f64 / (total_errors as f64 + 100.0),
        error_types,
    })
}
