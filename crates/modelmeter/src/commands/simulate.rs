//! Fabricated request traffic driving the whole pipeline

use crate::app::App;
use modelmeter_experiment::{Experiments, PromptCatalog};
use modelmeter_registry::{ModelRegistry, Provider};
use modelmeter_store::{KvStore, RequestOutcome, TelemetryStore};
use rand::RngExt;
use std::collections::HashMap;
use std::path::PathBuf;

const EXPERIMENT_NAME: &str = "chatbot";

const DEMO_MODELS: [(&str, Provider); 3] = [
    ("gpt-4", Provider::OpenAi),
    ("gpt-3.5-turbo", Provider::OpenAi),
    ("claude-3-sonnet", Provider::Anthropic),
];

const QUESTIONS: [&str; 5] = [
    "What is machine learning?",
    "Explain ownership in Rust.",
    "Summarize the attention mechanism.",
    "What is a vector database?",
    "How do transformers generate text?",
];

const ERROR_MESSAGES: [&str; 3] = ["upstream timeout", "rate limited", "context length exceeded"];

pub struct SimulationReport {
    pub logged: usize,
    pub failed: usize,
}

pub fn run(
    data_dir: Option<PathBuf>,
    requests: usize,
    with_experiment: bool,
    failure_rate: f64,
) -> anyhow::Result<()> {
    if !(0.0..=1.0).contains(&failure_rate) {
        anyhow::bail!("failure rate {failure_rate} outside [0, 1]");
    }

    let mut app = App::open(data_dir)?;
    let default_split = app.config.default_traffic_split;
    let report = run_simulation(
        &app.store,
        &app.experiments,
        &mut app.catalog,
        &mut app.registry,
        default_split,
        requests,
        with_experiment,
        failure_rate,
    )?;

    println!(
        "Logged {} simulated requests ({} failed)",
        report.logged, report.failed
    );
    if with_experiment {
        println!(
            "Experiment '{EXPERIMENT_NAME}' running with B share {:.0}%",
            default_split * 100.0
        );
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_simulation<S: KvStore>(
    store: &TelemetryStore<S>,
    experiments: &Experiments<S>,
    catalog: &mut PromptCatalog<S>,
    registry: &mut ModelRegistry,
    default_split: f64,
    requests: usize,
    with_experiment: bool,
    failure_rate: f64,
) -> anyhow::Result<SimulationReport> {
    let models = register_demo_models(registry);
    let (variant_a, variant_b) = ensure_prompts(catalog)?;

    if with_experiment {
        experiments.start(catalog, EXPERIMENT_NAME, &variant_a, &variant_b, default_split)?;
    }

    let mut rng = rand::rng();
    let mut failed = 0;
    for i in 0..requests {
        let user_id = format!("user_{:03}", i % 25);
        let prompt_id = experiments.assign(&*catalog, EXPERIMENT_NAME, Some(&user_id))?;

        let question = QUESTIONS[i % QUESTIONS.len()];
        let vars = HashMap::from([("question".to_string(), question.to_string())]);
        let prompt = catalog.render(EXPERIMENT_NAME, &vars, prompt_id.as_deref())?;

        let (model_name, model_version) = &models[i % models.len()];
        let success = rng.random::<f64>() >= failure_rate;
        let response = if success {
            format!("Simulated {model_name} response to: {question}")
        } else {
            failed += 1;
            String::new()
        };

        let mut outcome = RequestOutcome::new(model_name, model_version, &prompt, &response);
        outcome.latency_ms = rng.random_range(80.0..1200.0);
        outcome.success = success;
        outcome.error_message =
            (!success).then(|| ERROR_MESSAGES[i % ERROR_MESSAGES.len()].to_string());
        outcome.prompt_id = prompt_id.clone();
        outcome.user_id = Some(user_id);
        store.log_request(outcome)?;
    }

    Ok(SimulationReport { logged: requests, failed })
}

fn register_demo_models(registry: &mut ModelRegistry) -> Vec<(String, String)> {
    DEMO_MODELS
        .iter()
        .map(|(name, provider)| {
            let params = HashMap::from([
                ("temperature".to_string(), serde_json::json!(0.7)),
                ("max_tokens".to_string(), serde_json::json!(4096)),
            ]);
            let version = registry.register(
                name,
                *provider,
                params,
                Some(format!("demo registration of {name}")),
            );
            (name.to_string(), version)
        })
        .collect()
}

/// The two chatbot variants the demo routes between: a terse one and a
/// verbose one. Variant A is activated so assignment has a fallback
/// when no experiment is running.
fn ensure_prompts<S: KvStore>(catalog: &mut PromptCatalog<S>) -> anyhow::Result<(String, String)> {
    let existing = catalog.list(Some(EXPERIMENT_NAME), None);
    if existing.len() >= 2 {
        let mut ids: Vec<(String, String)> = existing
            .iter()
            .map(|p| (p.version.clone(), p.id.clone()))
            .collect();
        ids.sort();
        return Ok((ids[0].1.clone(), ids[1].1.clone()));
    }

    let variant_a = catalog.create(
        EXPERIMENT_NAME,
        "Answer briefly: {question}",
        vec!["question".to_string()],
        Some("terse answers".to_string()),
        vec![],
    )?;
    let variant_b = catalog.create(
        EXPERIMENT_NAME,
        "Answer in detail, step by step: {question}",
        vec!["question".to_string()],
        Some("verbose answers".to_string()),
        vec![],
    )?;
    catalog.activate(&variant_a)?;
    Ok((variant_a, variant_b))
}
