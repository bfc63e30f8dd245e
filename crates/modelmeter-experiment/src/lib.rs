//! Prompt catalog and deterministic A/B experiment assignment

mod assign;
mod catalog;

pub use assign::{bucket, ExperimentConfig, Experiments, EXPERIMENT_TTL};
pub use catalog::{PromptCatalog, PromptStatus, PromptVersion, VariantStore};

use modelmeter_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ExperimentError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("prompt {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}
