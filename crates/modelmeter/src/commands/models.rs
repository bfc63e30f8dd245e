use crate::app::App;
use modelmeter_registry::Provider;
use modelmeter_telemetry::RateTable;
use std::collections::HashMap;
use std::path::PathBuf;

const DEMO_MODELS: [(&str, Provider, &str); 3] = [
    ("gpt-4", Provider::OpenAi, "general-purpose flagship"),
    ("gpt-3.5-turbo", Provider::OpenAi, "cheap default"),
    ("claude-3-sonnet", Provider::Anthropic, "balanced writer"),
];

/// Walk the registry lifecycle with the demo model set.
pub fn demo(data_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let mut app = App::open(data_dir)?;

    let mut versions = Vec::new();
    for (name, provider, description) in DEMO_MODELS {
        let params = HashMap::from([("temperature".to_string(), serde_json::json!(0.7))]);
        let version =
            app.registry
                .register(name, provider, params, Some(description.to_string()));
        versions.push((name, version));
    }

    let (flagship, flagship_version) = &versions[0];
    app.registry.deploy(flagship, flagship_version)?;

    println!("Registered {} models:", versions.len());
    for model in app.registry.list() {
        println!(
            "  {} {} [{:?}] ${:.4}/1k tokens",
            model.name, model.version, model.status, model.cost_per_1k_tokens
        );
    }

    let comparison = app.registry.compare(
        versions[0].0,
        &versions[0].1,
        versions[2].0,
        &versions[2].1,
    )?;
    println!(
        "\n{} vs {}: rate difference ${:.4}/1k tokens",
        comparison.model_a.name, comparison.model_b.name, comparison.cost_difference
    );
    Ok(())
}

pub fn rates() -> anyhow::Result<()> {
    let rates = RateTable::builtin();
    println!("Built-in model rates:");
    for model in ["gpt-4", "gpt-3.5-turbo", "claude-3-opus", "claude-3-sonnet"] {
        println!("  {model}: ${:.4}/1k tokens", rates.rate(model).cost_per_1k_tokens);
    }
    println!("  (unknown models fall back to the gpt-4 rate)");
    Ok(())
}
