use crate::app::resolve_paths;
use crate::config::Config;
use modelmeter_store::SqliteKv;
use std::path::PathBuf;

pub fn run(data_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let paths = resolve_paths(data_dir)?;
    std::fs::create_dir_all(&paths.data_dir)?;

    let config_path = paths.config_path();
    if config_path.exists() {
        println!("✓ Config already present at {}", config_path.display());
    } else {
        Config::default().save(&config_path)?;
        println!("✓ Wrote default config to {}", config_path.display());
    }

    // opening creates the schema
    SqliteKv::open(&paths.db_path())?;
    println!("✓ Telemetry database at {}", paths.db_path().display());

    Ok(())
}
