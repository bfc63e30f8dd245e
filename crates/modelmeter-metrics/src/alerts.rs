//! Cost threshold alerting

use crate::aggregate::cost_metrics;
use chrono::{DateTime, Utc};
use modelmeter_store::{KvStore, StoreError, TelemetryStore, Window};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Check trailing-24h cost against `threshold`, as of now.
pub fn check_cost_alerts<S: KvStore>(
    store: &TelemetryStore<S>,
    threshold: f64,
) -> Result<Vec<Alert>, StoreError> {
    check_cost_alerts_at(store, threshold, Utc::now())
}

/// Check trailing-24h cost against `threshold`, as of `now`.
///
/// A pure function of current metrics: each call recomputes from
/// scratch, with no deduplication across calls. The check is strictly
/// greater-than, so landing exactly on the threshold does not alert.
pub fn check_cost_alerts_at<S: KvStore>(
    store: &TelemetryStore<S>,
    threshold: f64,
    now: DateTime<Utc>,
) -> Result<Vec<Alert>, StoreError> {
    let daily = cost_metrics(store, Window::trailing_hours(now, 24), None)?;

    let mut alerts = Vec::new();
    if daily.total_cost_usd > threshold {
        tracing::warn!(
            total_cost_usd = daily.total_cost_usd,
            threshold,
            "daily cost over threshold"
        );
        alerts.push(Alert {
            kind: "cost_alert".to_string(),
            severity: "high".to_string(),
            message: format!(
                "daily cost ({:.2} USD) over threshold ({:.2} USD)",
                daily.total_cost_usd, threshold
            ),
            timestamp: now,
        });
    }
    Ok(alerts)
}
