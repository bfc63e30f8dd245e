use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "modelmeter")]
#[command(version)]
#[command(about = "LLM ops demo harness: telemetry, A/B assignment, cost metrics")]
pub struct Cli {
    /// Data directory (defaults to ~/.modelmeter)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data directory, default config, and telemetry database
    Init,

    /// Log a batch of simulated model requests
    Simulate {
        /// Number of requests to fabricate
        #[arg(short, long, default_value_t = 50)]
        requests: usize,

        /// Also start an A/B experiment and route through it
        #[arg(long)]
        experiment: bool,

        /// Fraction of requests that fail, in [0, 1]
        #[arg(long, default_value_t = 0.1)]
        failure_rate: f64,
    },

    /// Cost, performance, and error report over a trailing window
    Report {
        /// Window length in hours
        #[arg(long, default_value_t = 24)]
        hours: i64,

        /// Restrict to one model
        #[arg(short, long)]
        model: Option<String>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Check the trailing-24h cost against the alert threshold
    Alerts {
        /// Override the configured threshold (USD)
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Export records from a trailing window as JSONL
    Export {
        /// Output path (defaults into the exports directory)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Window length in hours
        #[arg(long, default_value_t = 24)]
        hours: i64,

        /// Restrict to one model
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Run the built-in evaluation cases against a model
    Eval {
        /// Model name to evaluate
        #[arg(short, long, default_value = "gpt-4")]
        model: String,
    },

    /// Manage A/B experiments
    Experiment {
        #[command(subcommand)]
        action: ExperimentAction,
    },

    /// Manage prompt versions
    Prompts {
        #[command(subcommand)]
        action: PromptAction,
    },

    /// Model registry demo and rate table
    Models {
        #[command(subcommand)]
        action: ModelAction,
    },

    /// Print version information
    Version,
}

#[derive(Subcommand)]
pub enum ExperimentAction {
    /// Start (or restart) an experiment between two prompt versions
    Start {
        /// Experiment name (the prompt template name)
        #[arg(long)]
        name: String,

        /// Variant A prompt id
        #[arg(long)]
        variant_a: String,

        /// Variant B prompt id
        #[arg(long)]
        variant_b: String,

        /// Probability of variant B, in [0, 1]
        #[arg(long)]
        split: Option<f64>,
    },

    /// Resolve the variant for one user
    Assign {
        #[arg(long)]
        name: String,

        /// User id; omit for a random (non-sticky) draw
        #[arg(long)]
        user: Option<String>,
    },

    /// Show the stored experiment config
    Show {
        #[arg(long)]
        name: String,
    },
}

#[derive(Subcommand)]
pub enum PromptAction {
    /// List prompt versions
    List {
        /// Restrict to one template name
        #[arg(long)]
        template: Option<String>,

        /// Restrict to one status (draft|active|testing|deprecated)
        #[arg(long)]
        status: Option<String>,
    },

    /// Create a new prompt version
    Create {
        #[arg(long)]
        template: String,

        /// Template body with {placeholder} variables
        #[arg(long)]
        body: String,

        /// Declared variable names
        #[arg(long, value_delimiter = ',')]
        variables: Vec<String>,

        #[arg(long)]
        description: Option<String>,

        /// Activate the new version immediately
        #[arg(long)]
        activate: bool,
    },

    /// Activate a prompt version
    Activate {
        #[arg(long)]
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ModelAction {
    /// Register the demo models and list them
    Demo,

    /// Show the built-in rate table
    Rates,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_version() {
        let cli = Cli::try_parse_from(["modelmeter", "version"]);
        assert!(cli.is_ok());
        assert!(matches!(cli.unwrap().command, Commands::Version));
    }

    #[test]
    fn test_cli_parse_simulate_defaults() {
        let cli = Cli::try_parse_from(["modelmeter", "simulate"]).unwrap();
        if let Commands::Simulate { requests, experiment, failure_rate } = cli.command {
            assert_eq!(requests, 50);
            assert!(!experiment);
            assert_eq!(failure_rate, 0.1);
        } else {
            panic!("expected Simulate command");
        }
    }

    #[test]
    fn test_cli_parse_experiment_start() {
        let cli = Cli::try_parse_from([
            "modelmeter",
            "experiment",
            "start",
            "--name",
            "chatbot",
            "--variant-a",
            "p1",
            "--variant-b",
            "p2",
            "--split",
            "0.3",
        ])
        .unwrap();
        if let Commands::Experiment { action: ExperimentAction::Start { name, split, .. } } =
            cli.command
        {
            assert_eq!(name, "chatbot");
            assert_eq!(split, Some(0.3));
        } else {
            panic!("expected Experiment Start command");
        }
    }

    #[test]
    fn test_cli_parse_global_data_dir() {
        let cli =
            Cli::try_parse_from(["modelmeter", "report", "--data-dir", "/tmp/mm"]).unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/mm")));
    }

    #[test]
    fn test_cli_parse_prompt_variables_delimited() {
        let cli = Cli::try_parse_from([
            "modelmeter",
            "prompts",
            "create",
            "--template",
            "chatbot",
            "--body",
            "Q: {question}",
            "--variables",
            "question,context",
        ])
        .unwrap();
        if let Commands::Prompts { action: PromptAction::Create { variables, .. } } = cli.command {
            assert_eq!(variables, vec!["question", "context"]);
        } else {
            panic!("expected Prompts Create command");
        }
    }
}
