use std::{fs, path::Path, str::FromStr, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::dispatch::{DEFAULT_MODEL, DEFAULT_REPLY_TEMPLATE, DispatchOptions};

/// Deck-level configuration: the model catalog, batch-send default, reply
/// template and serve options.
#[derive(Debug, Deserialize, Clone)]
pub struct DeckConfig {
    #[serde(default = "default_models")]
    pub models: Vec<ModelConfig>,
    #[serde(default = "default_model_id")]
    pub default_model: String,
    #[serde(default)]
    pub reply_template: Option<String>,
    #[serde(default)]
    pub serve: ServeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServeConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            models: default_models(),
            default_model: default_model_id(),
            reply_template: None,
            serve: ServeConfig::default(),
        }
    }
}

impl DeckConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let raw = fs::read_to_string(path_ref)
            .with_context(|| format!("Failed to read config file at {}", path_ref.display()))?;
        Self::from_yaml_str(&raw)
            .with_context(|| format!("Invalid configuration in {}", path_ref.display()))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("Unable to parse config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.models.is_empty(),
            "Configuration must list at least one model"
        );
        for (idx, model) in self.models.iter().enumerate() {
            ensure!(
                !model.id.trim().is_empty(),
                "models[{idx}] must have a non-blank id"
            );
            ensure!(
                !model.label.trim().is_empty(),
                "models[{idx}] must have a non-blank label"
            );
        }
        ensure!(
            self.models.iter().any(|m| m.id == self.default_model),
            "default_model '{}' is not in the models list",
            self.default_model
        );
        if let Some(template) = &self.reply_template {
            ensure!(
                !template.trim().is_empty(),
                "reply_template must not be blank when set"
            );
        }
        ensure!(
            self.serve.default_limit > 0,
            "serve.default_limit must be > 0"
        );
        Ok(())
    }

    pub fn model_label(&self, id: &str) -> Option<&str> {
        self.models
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.label.as_str())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.serve.poll_interval_ms.max(200))
    }

    /// Dispatch knobs derived from this config.
    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            default_model: self.default_model.clone(),
            reply_template: self
                .reply_template
                .clone()
                .unwrap_or_else(|| DEFAULT_REPLY_TEMPLATE.to_string()),
        }
    }
}

impl FromStr for DeckConfig {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_yaml_str(s)
    }
}

fn default_models() -> Vec<ModelConfig> {
    [
        ("gpt-4", "GPT-4"),
        ("gpt-3.5-turbo", "GPT-3.5 Turbo"),
        ("gemini-pro", "Gemini Pro"),
        ("claude-3", "Claude 3"),
    ]
    .into_iter()
    .map(|(id, label)| ModelConfig {
        id: id.to_string(),
        label: label.to_string(),
    })
    .collect()
}

fn default_model_id() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_limit() -> usize {
    25
}

fn default_poll_interval_ms() -> u64 {
    1000
}
