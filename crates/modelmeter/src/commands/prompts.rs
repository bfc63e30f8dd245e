use crate::app::App;
use modelmeter_experiment::PromptStatus;
use std::path::PathBuf;

pub fn list(
    data_dir: Option<PathBuf>,
    template: Option<&str>,
    status: Option<&str>,
) -> anyhow::Result<()> {
    let app = App::open(data_dir)?;
    let status = status.map(parse_status).transpose()?;

    let prompts = app.catalog.list(template, status);
    if prompts.is_empty() {
        println!("No prompts found.");
        return Ok(());
    }
    for prompt in prompts {
        println!(
            "{}  {} {} ({:?})",
            prompt.id, prompt.template_name, prompt.version, prompt.status
        );
    }
    Ok(())
}

pub fn create(
    data_dir: Option<PathBuf>,
    template_name: &str,
    body: &str,
    variables: Vec<String>,
    description: Option<String>,
    activate: bool,
) -> anyhow::Result<()> {
    let mut app = App::open(data_dir)?;
    let id = app
        .catalog
        .create(template_name, body, variables, description, vec![])?;
    if activate {
        app.catalog.activate(&id)?;
    }

    let prompt = app
        .catalog
        .get(&id)
        .ok_or_else(|| anyhow::anyhow!("prompt {id} vanished after creation"))?;
    println!("Created {} {} as {}", prompt.template_name, prompt.version, id);
    Ok(())
}

pub fn activate(data_dir: Option<PathBuf>, id: &str) -> anyhow::Result<()> {
    let mut app = App::open(data_dir)?;
    app.catalog.activate(id)?;
    println!("Activated {id}");
    Ok(())
}

fn parse_status(s: &str) -> anyhow::Result<PromptStatus> {
    match s {
        "draft" => Ok(PromptStatus::Draft),
        "active" => Ok(PromptStatus::Active),
        "testing" => Ok(PromptStatus::Testing),
        "deprecated" => Ok(PromptStatus::Deprecated),
        other => anyhow::bail!("unknown status '{other}' (draft|active|testing|deprecated)"),
    }
}
