use crate::app::App;
use chrono::Utc;
use modelmeter_metrics::{
    cost_metrics, error_summary, performance_metrics, CostMetrics, ErrorSummary,
    PerformanceMetrics,
};
use modelmeter_store::Window;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct Report<'a> {
    cost: &'a CostMetrics,
    performance: &'a PerformanceMetrics,
    errors: &'a ErrorSummary,
}

pub fn run(
    data_dir: Option<PathBuf>,
    hours: i64,
    model: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let app = App::open(data_dir)?;
    let window = Window::trailing_hours(Utc::now(), hours);

    let cost = cost_metrics(&app.store, window, model)?;
    let performance = performance_metrics(&app.store, window, model)?;
    let errors = error_summary(&app.store, window)?;

    if json {
        let report = Report { cost: &cost, performance: &performance, errors: &errors };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", build_report(hours, model, &cost, &performance, &errors));
    }
    Ok(())
}

fn build_report(
    hours: i64,
    model: Option<&str>,
    cost: &CostMetrics,
    performance: &PerformanceMetrics,
    errors: &ErrorSummary,
) -> String {
    let scope = match model {
        Some(model) => format!("last {hours}h, model {model}"),
        None => format!("last {hours}h, all models"),
    };

    if performance.total_requests == 0 {
        return format!("Model Usage Report ({scope})\nNo requests recorded in this window.");
    }

    let mut sections = Vec::new();

    sections.push(format!(
        "Model Usage Report ({scope})\n==================\n\
         Requests: {}\nTokens: {}\nTotal cost: ${:.4}",
        cost.requests_count, cost.tokens_count, cost.total_cost_usd
    ));

    sections.push(format!(
        "\nCost\n----\n\
         Per request: ${:.4}\nPer token: ${:.6}",
        cost.cost_per_request, cost.cost_per_token
    ));

    sections.push(format!(
        "\nPerformance\n-----------\n\
         Latency avg: {:.0}ms | min: {:.0}ms | max: {:.0}ms | p95: {:.0}ms\n\
         Success rate: {:.1}%\nRequests/hour: {:.1}",
        performance.avg_latency_ms,
        performance.min_latency_ms,
        performance.max_latency_ms,
        performance.p95_latency_ms,
        performance.success_rate * 100.0,
        performance.requests_per_hour
    ));

    let mut error_lines = String::new();
    let mut error_counts: Vec<(&String, &u64)> = errors.error_types.iter().collect();
    error_counts.sort_by_key(|(_, count)| std::cmp::Reverse(**count));
    for (message, count) in error_counts {
        error_lines.push_str(&format!("\n  {message}: {count}"));
    }
    sections.push(format!(
        "\nErrors\n------\n\
         Total: {} | rate: {:.1}%{}",
        errors.total_errors,
        errors.error_rate * 100.0,
        error_lines
    ));

    sections.join("\n")
}
