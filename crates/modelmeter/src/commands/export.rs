use crate::app::App;
use chrono::Utc;
use modelmeter_store::Window;
use modelmeter_telemetry::{write_jsonl, RequestRecord};
use std::path::PathBuf;

pub fn run(
    data_dir: Option<PathBuf>,
    out: Option<PathBuf>,
    hours: i64,
    model: Option<&str>,
) -> anyhow::Result<()> {
    let app = App::open(data_dir)?;
    let window = Window::trailing_hours(Utc::now(), hours);

    let records: Vec<RequestRecord> = app
        .store
        .scan(window, model)
        .collect::<Result<_, _>>()?;

    let out = out.unwrap_or_else(|| {
        app.paths
            .exports_dir()
            .join(format!("requests-last-{hours}h.jsonl"))
    });
    write_jsonl(&out, &records)?;

    println!("Exported {} records to {}", records.len(), out.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelmeter_store::RequestOutcome;

    #[test]
    fn test_export_roundtrips_records() {
        let temp_dir = tempfile::tempdir().unwrap();
        let data_dir = temp_dir.path().to_path_buf();

        let app = App::open(Some(data_dir.clone())).unwrap();
        for i in 0..3 {
            let outcome = RequestOutcome::new("gpt-4", "latest", &format!("prompt {i}"), "response");
            app.store.log_request(outcome).unwrap();
        }
        drop(app);

        let out = data_dir.join("out.jsonl");
        run(Some(data_dir), Some(out.clone()), 24, None).unwrap();

        let records: Vec<RequestRecord> = modelmeter_telemetry::read_jsonl(&out).unwrap();
        assert_eq!(records.len(), 3);
    }
}
