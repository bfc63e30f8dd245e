//! Explicitly constructed application components
//!
//! Everything the commands need is built here and passed down; nothing
//! is a process-global.

use crate::config::Config;
use modelmeter_experiment::{Experiments, PromptCatalog};
use modelmeter_registry::ModelRegistry;
use modelmeter_store::{SqliteKv, TelemetryStore};
use modelmeter_telemetry::{Paths, RateTable};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub struct App {
    pub paths: Paths,
    pub config: Config,
    pub store: TelemetryStore<Arc<SqliteKv>>,
    pub experiments: Experiments<Arc<SqliteKv>>,
    pub catalog: PromptCatalog<Arc<SqliteKv>>,
    pub registry: ModelRegistry,
}

pub fn resolve_paths(data_dir: Option<PathBuf>) -> anyhow::Result<Paths> {
    Ok(match data_dir {
        Some(dir) => Paths::at(dir),
        None => Paths::new()?,
    })
}

impl App {
    pub fn open(data_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let paths = resolve_paths(data_dir)?;
        let config = Config::load(&paths.config_path())?;
        let kv = Arc::new(SqliteKv::open(&paths.db_path())?);
        let rates = RateTable::builtin();

        let store = TelemetryStore::new(Arc::clone(&kv), rates.clone());
        let experiments = Experiments::new(Arc::clone(&kv));
        let catalog = PromptCatalog::load(
            Arc::clone(&kv),
            Duration::from_secs(config.prompt_cache_ttl_secs),
        )?;
        let registry = ModelRegistry::new(rates);

        Ok(Self { paths, config, store, experiments, catalog, registry })
    }
}
