use crate::app::App;
use std::path::PathBuf;

pub fn start(
    data_dir: Option<PathBuf>,
    name: &str,
    variant_a: &str,
    variant_b: &str,
    split: Option<f64>,
) -> anyhow::Result<()> {
    let mut app = App::open(data_dir)?;
    let split = split.unwrap_or(app.config.default_traffic_split);

    let config = app
        .experiments
        .start(&mut app.catalog, name, variant_a, variant_b, split)?;
    println!(
        "Started experiment '{}' (B share {:.0}%)",
        config.experiment_name,
        config.traffic_split * 100.0
    );
    Ok(())
}

pub fn assign(data_dir: Option<PathBuf>, name: &str, user: Option<&str>) -> anyhow::Result<()> {
    let app = App::open(data_dir)?;
    match app.experiments.assign(&app.catalog, name, user)? {
        Some(variant_id) => println!("{variant_id}"),
        None => println!("no experiment and no active variant for '{name}'"),
    }
    Ok(())
}

pub fn show(data_dir: Option<PathBuf>, name: &str) -> anyhow::Result<()> {
    let app = App::open(data_dir)?;
    match app.experiments.get(name)? {
        Some(config) => println!("{}", serde_json::to_string_pretty(&config)?),
        None => println!("no experiment named '{name}'"),
    }
    Ok(())
}
