// Non-interactive answers (answers file + environment)
//
// Answers file: a flat TOML table keyed by field name, e.g.
//
//   base_url = "https://forum.example.org"
//   use_port = false
//   "redis:host" = "10.0.0.5"
//
// Environment: FORUM_SETUP_ANSWER_<FIELD>, with ':' written as "__"
// (FORUM_SETUP_ANSWER_REDIS__HOST). Environment wins over the file.

use super::AnswerSource;
use crate::error::Result;
use crate::models::fields::{Answers, FieldDescriptor};
use crate::utils::validation::resolve_all;
use anyhow::Context;
use async_trait::async_trait;
use log::debug;
use std::collections::BTreeMap;
use std::path::Path;

pub const ENV_PREFIX: &str = "FORUM_SETUP_ANSWER_";

#[derive(Debug, Clone, Default)]
pub struct PresetAnswers {
    raw: BTreeMap<String, String>,
}

impl PresetAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.raw.insert(name.to_string(), value.into());
        self
    }

    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let table: toml::Table = text.parse().context("Answers file is not valid TOML")?;
        let mut raw = BTreeMap::new();
        for (key, value) in table {
            let s = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => (if b { "yes" } else { "no" }).to_string(),
                other => anyhow::bail!(
                    "Answer '{}' must be a string, number or boolean (got {})",
                    key,
                    other.type_str()
                ),
            };
            raw.insert(key, s);
        }
        Ok(Self { raw })
    }

    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read answers file {:?}", path))?;
        let preset = Self::from_toml_str(&text)
            .with_context(|| format!("Failed to parse answers file {:?}", path))?;
        debug!(
            "[PHASE: setup] [STEP: answers] Loaded answers file (path={:?}, keys={})",
            path,
            preset.raw.len()
        );
        Ok(preset)
    }

    /// Overlay answers taken from environment variables.
    pub fn merge_env<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(field) = key.strip_prefix(ENV_PREFIX) {
                let name = field.to_ascii_lowercase().replace("__", ":");
                self.raw.insert(name, value);
            }
        }
        self
    }
}

#[async_trait]
impl AnswerSource for PresetAnswers {
    async fn collect(&self, fields: &[FieldDescriptor]) -> Result<Option<Answers>> {
        let answers = resolve_all(fields, |name| self.raw.get(name).map(String::as_str))?;
        Ok(Some(answers))
    }
}
