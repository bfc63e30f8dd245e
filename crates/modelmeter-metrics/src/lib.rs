//! Windowed metric aggregation and cost alerting over the telemetry store

mod aggregate;
mod alerts;

pub use aggregate::{
    cost_metrics, error_summary, performance_metrics, CostMetrics, ErrorSummary,
    PerformanceMetrics,
};
pub use alerts::{check_cost_alerts, check_cost_alerts_at, Alert};
