//! Versioned prompt catalog with status lifecycle and template rendering

use crate::ExperimentError;
use chrono::{DateTime, Utc};
use modelmeter_store::{KvStore, StoreError};
use modelmeter_telemetry::stable_hash64;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

fn placeholder_re() -> &'static Regex {
    PLACEHOLDER_RE.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap())
}

const PROMPT_INDEX_KEY: &str = "prompts:index";

fn prompt_key(id: &str) -> String {
    format!("prompt:{id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptStatus {
    Draft,
    Active,
    Testing,
    Deprecated,
}

/// One version of a named prompt template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptVersion {
    pub id: String,
    pub template_name: String,
    pub version: String,
    pub template: String,
    pub variables: Vec<String>,
    pub status: PromptStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub performance_metrics: HashMap<String, f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// The catalog surface experiment assignment talks through.
pub trait VariantStore {
    /// Flag a variant as under test. `NotFound` when the id is unknown.
    fn mark_testing(&mut self, variant_id: &str) -> Result<(), ExperimentError>;

    /// The currently Active variant for a template name, if any.
    fn active_variant(&self, template_name: &str) -> Option<String>;
}

/// Prompt store: the in-memory map is authoritative, with a
/// write-through cache in the key-value store so a later process can
/// reload it. Index entries whose cached prompt has expired are skipped
/// on load, same as dangling telemetry ids.
pub struct PromptCatalog<S> {
    kv: S,
    cache_ttl: Duration,
    prompts: HashMap<String, PromptVersion>,
}

impl<S: KvStore> PromptCatalog<S> {
    pub fn new(kv: S, cache_ttl: Duration) -> Self {
        Self { kv, cache_ttl, prompts: HashMap::new() }
    }

    /// Rebuild the catalog from the key-value cache.
    pub fn load(kv: S, cache_ttl: Duration) -> Result<Self, ExperimentError> {
        let mut catalog = Self::new(kv, cache_ttl);
        for id in catalog.kv.list_range(PROMPT_INDEX_KEY)? {
            let key = prompt_key(&id);
            let Some(payload) = catalog.kv.get(&key)? else {
                continue;
            };
            let prompt: PromptVersion =
                serde_json::from_str(&payload).map_err(|e| StoreError::Malformed {
                    key,
                    reason: e.to_string(),
                })?;
            catalog.prompts.insert(prompt.id.clone(), prompt);
        }
        Ok(catalog)
    }

    /// Create a new Draft version of `template_name` and return its id.
    pub fn create(
        &mut self,
        template_name: &str,
        template: &str,
        variables: Vec<String>,
        description: Option<String>,
        tags: Vec<String>,
    ) -> Result<String, ExperimentError> {
        if template_name.is_empty() {
            return Err(ExperimentError::InvalidArgument(
                "template name must be non-empty".to_string(),
            ));
        }
        if variables.iter().any(|v| v.is_empty()) {
            return Err(ExperimentError::InvalidArgument(
                "template variables must be non-empty".to_string(),
            ));
        }

        let now = Utc::now();
        let id = format!(
            "{template_name}_{}_{:08x}",
            now.format("%Y%m%dT%H%M%S"),
            stable_hash64(template) as u32
        );
        let version = format!(
            "v{}",
            self.prompts
                .values()
                .filter(|p| p.template_name == template_name)
                .count()
                + 1
        );

        let prompt = PromptVersion {
            id: id.clone(),
            template_name: template_name.to_string(),
            version: version.clone(),
            template: template.to_string(),
            variables,
            status: PromptStatus::Draft,
            created_at: now,
            updated_at: now,
            performance_metrics: HashMap::new(),
            description,
            tags,
        };

        self.save(&prompt)?;
        self.kv.list_push(PROMPT_INDEX_KEY, &id)?;
        tracing::info!(template = template_name, version = %version, id = %id, "prompt created");
        self.prompts.insert(id.clone(), prompt);
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Option<&PromptVersion> {
        self.prompts.get(id)
    }

    /// The Active version for a template name, if one exists.
    pub fn active(&self, template_name: &str) -> Option<&PromptVersion> {
        self.prompts
            .values()
            .find(|p| p.template_name == template_name && p.status == PromptStatus::Active)
    }

    /// Activate `id`, deprecating any Active sibling of the same
    /// template name.
    pub fn activate(&mut self, id: &str) -> Result<(), ExperimentError> {
        let template_name = self
            .prompts
            .get(id)
            .ok_or_else(|| ExperimentError::NotFound(id.to_string()))?
            .template_name
            .clone();

        let sibling_ids: Vec<String> = self
            .prompts
            .values()
            .filter(|p| {
                p.template_name == template_name
                    && p.status == PromptStatus::Active
                    && p.id != id
            })
            .map(|p| p.id.clone())
            .collect();
        for sibling_id in sibling_ids {
            self.set_status(&sibling_id, PromptStatus::Deprecated)?;
        }

        self.set_status(id, PromptStatus::Active)?;
        tracing::info!(template = %template_name, id, "prompt activated");
        Ok(())
    }

    /// Render a template with the given variables.
    ///
    /// Uses the named version when `prompt_id` is given, else the Active
    /// version, else the built-in template of that name. A declared
    /// variable without a value, or a placeholder without a value, is
    /// `InvalidArgument`.
    pub fn render(
        &self,
        template_name: &str,
        vars: &HashMap<String, String>,
        prompt_id: Option<&str>,
    ) -> Result<String, ExperimentError> {
        let prompt = match prompt_id {
            Some(id) => Some(
                self.get(id)
                    .ok_or_else(|| ExperimentError::NotFound(id.to_string()))?,
            ),
            None => self.active(template_name),
        };

        match prompt {
            Some(prompt) => {
                let missing: Vec<&str> = prompt
                    .variables
                    .iter()
                    .filter(|v| !vars.contains_key(v.as_str()))
                    .map(|v| v.as_str())
                    .collect();
                if !missing.is_empty() {
                    return Err(ExperimentError::InvalidArgument(format!(
                        "missing variables: {}",
                        missing.join(", ")
                    )));
                }
                render_template(&prompt.template, vars)
            }
            None => {
                let template = builtin_template(template_name)
                    .ok_or_else(|| ExperimentError::NotFound(template_name.to_string()))?;
                render_template(template, vars)
            }
        }
    }

    /// Versions matching the filters, most recently updated first.
    pub fn list(
        &self,
        template_name: Option<&str>,
        status: Option<PromptStatus>,
    ) -> Vec<&PromptVersion> {
        let mut prompts: Vec<&PromptVersion> = self
            .prompts
            .values()
            .filter(|p| template_name.is_none_or(|name| p.template_name == name))
            .filter(|p| status.is_none_or(|s| p.status == s))
            .collect();
        prompts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        prompts
    }

    pub fn delete(&mut self, id: &str) -> Result<(), ExperimentError> {
        if self.prompts.remove(id).is_none() {
            return Err(ExperimentError::NotFound(id.to_string()));
        }
        // the index entry stays behind; load() skips it once the cached
        // prompt is gone
        self.kv.delete(&prompt_key(id))?;
        Ok(())
    }

    pub fn update_metrics(
        &mut self,
        id: &str,
        metrics: &HashMap<String, f64>,
    ) -> Result<(), ExperimentError> {
        let prompt = self
            .prompts
            .get_mut(id)
            .ok_or_else(|| ExperimentError::NotFound(id.to_string()))?;
        prompt.performance_metrics.extend(metrics.clone());
        prompt.updated_at = Utc::now();
        let prompt = prompt.clone();
        self.save(&prompt)
    }

    fn set_status(&mut self, id: &str, status: PromptStatus) -> Result<(), ExperimentError> {
        let prompt = self
            .prompts
            .get_mut(id)
            .ok_or_else(|| ExperimentError::NotFound(id.to_string()))?;
        prompt.status = status;
        prompt.updated_at = Utc::now();
        let prompt = prompt.clone();
        self.save(&prompt)
    }

    fn save(&self, prompt: &PromptVersion) -> Result<(), ExperimentError> {
        let key = prompt_key(&prompt.id);
        let payload = serde_json::to_string(prompt).map_err(|e| StoreError::Malformed {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        self.kv.set_ex(&key, &payload, self.cache_ttl)?;
        Ok(())
    }
}

impl<S: KvStore> VariantStore for PromptCatalog<S> {
    fn mark_testing(&mut self, variant_id: &str) -> Result<(), ExperimentError> {
        self.set_status(variant_id, PromptStatus::Testing)
    }

    fn active_variant(&self, template_name: &str) -> Option<String> {
        self.active(template_name).map(|p| p.id.clone())
    }
}

fn render_template(
    template: &str,
    vars: &HashMap<String, String>,
) -> Result<String, ExperimentError> {
    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;
    for m in placeholder_re().find_iter(template) {
        let name = &template[m.start() + 1..m.end() - 1];
        let value = vars.get(name).ok_or_else(|| {
            ExperimentError::InvalidArgument(format!("unknown variable in template: {name}"))
        })?;
        rendered.push_str(&template[last..m.start()]);
        rendered.push_str(value);
        last = m.end();
    }
    rendered.push_str(&template[last..]);
    Ok(rendered)
}

fn builtin_template(template_name: &str) -> Option<&'static str> {
    match template_name {
        "chatbot" => Some(
            "You are a helpful assistant. Be friendly and professional.\n\n\
             Context: {context}\nQuestion: {question}\n\nAnswer:",
        ),
        "summarization" => Some(
            "Summarize the following text in at most 100 words:\n\n\
             Text: {text}\n\nSummary:",
        ),
        "translation" => Some(
            "Translate the following text from {source_language} to {target_language}:\n\n\
             Text: {text}\n\nTranslation:",
        ),
        _ => None,
    }
}
