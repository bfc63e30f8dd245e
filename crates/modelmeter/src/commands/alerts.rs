use crate::app::App;
use modelmeter_metrics::check_cost_alerts;
use std::path::PathBuf;

pub fn run(data_dir: Option<PathBuf>, threshold: Option<f64>) -> anyhow::Result<()> {
    let app = App::open(data_dir)?;
    let threshold = threshold.unwrap_or(app.config.cost_alert_threshold);

    let alerts = check_cost_alerts(&app.store, threshold)?;
    if alerts.is_empty() {
        println!("No cost alerts (threshold ${threshold:.2})");
    } else {
        for alert in &alerts {
            println!("[{}] {}: {}", alert.severity, alert.kind, alert.message);
        }
    }
    Ok(())
}
