use modelmeter_experiment::{Experiments, PromptCatalog};
use modelmeter_store::{MemoryKv, RequestOutcome, TelemetryStore};
use modelmeter_telemetry::RateTable;
use std::sync::Arc;
use std::time::Duration;

pub struct Harness {
    pub kv: Arc<MemoryKv>,
    pub store: TelemetryStore<Arc<MemoryKv>>,
    pub experiments: Experiments<Arc<MemoryKv>>,
    pub catalog: PromptCatalog<Arc<MemoryKv>>,
}

pub fn harness() -> Harness {
    let kv = Arc::new(MemoryKv::new());
    Harness {
        store: TelemetryStore::new(Arc::clone(&kv), RateTable::builtin()),
        experiments: Experiments::new(Arc::clone(&kv)),
        catalog: PromptCatalog::new(Arc::clone(&kv), Duration::from_secs(3600)),
        kv,
    }
}

pub fn outcome(model: &str, latency_ms: f64, success: bool) -> RequestOutcome {
    let mut outcome = RequestOutcome::new(
        model,
        "latest",
        "What is machine learning?",
        if success { "A field of study." } else { "" },
    );
    outcome.latency_ms = latency_ms;
    outcome.success = success;
    if !success {
        outcome.error_message = Some("upstream timeout".to_string());
    }
    outcome
}
