mod app;
mod cli;
mod commands;
mod config;

use clap::Parser;
use cli::{Cli, Commands, ExperimentAction, ModelAction, PromptAction};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let data_dir = cli.data_dir;

    match cli.command {
        Commands::Init => commands::init::run(data_dir),
        Commands::Simulate { requests, experiment, failure_rate } => {
            commands::simulate::run(data_dir, requests, experiment, failure_rate)
        }
        Commands::Report { hours, model, json } => {
            commands::report::run(data_dir, hours, model.as_deref(), json)
        }
        Commands::Alerts { threshold } => commands::alerts::run(data_dir, threshold),
        Commands::Export { out, hours, model } => {
            commands::export::run(data_dir, out, hours, model.as_deref())
        }
        Commands::Eval { model } => commands::eval::run(data_dir, &model),
        Commands::Experiment { action } => match action {
            ExperimentAction::Start { name, variant_a, variant_b, split } => {
                commands::experiment::start(data_dir, &name, &variant_a, &variant_b, split)
            }
            ExperimentAction::Assign { name, user } => {
                commands::experiment::assign(data_dir, &name, user.as_deref())
            }
            ExperimentAction::Show { name } => commands::experiment::show(data_dir, &name),
        },
        Commands::Prompts { action } => match action {
            PromptAction::List { template, status } => {
                commands::prompts::list(data_dir, template.as_deref(), status.as_deref())
            }
            PromptAction::Create { template, body, variables, description, activate } => {
                commands::prompts::create(data_dir, &template, &body, variables, description, activate)
            }
            PromptAction::Activate { id } => commands::prompts::activate(data_dir, &id),
        },
        Commands::Models { action } => match action {
            ModelAction::Demo => commands::models::demo(data_dir),
            ModelAction::Rates => commands::models::rates(),
        },
        Commands::Version => commands::version::run(),
    }
}
