// Default plugin activation
//
// Each id is checked independently and toggled only when inactive, so a rerun
// never flips an active plugin off. Failures are collected per id; the step
// reports them together as a non-fatal `PartialExtensionFailure`.

use super::{SetupStep, StepOutcome};
use crate::error::{Result, SetupError};
use crate::store::PluginRegistry;
use async_trait::async_trait;
use futures::future::join_all;
use log::{info, warn};
use std::sync::Arc;

pub const DEFAULT_PLUGINS: &[&str] = &["nodebb-plugin-markdown", "nodebb-plugin-mentions"];

#[derive(Debug, PartialEq, Eq)]
enum Activation {
    AlreadyActive,
    Activated,
}

pub struct ExtensionActivator {
    plugins: Arc<dyn PluginRegistry>,
    ids: Vec<String>,
}

impl ExtensionActivator {
    pub fn new(plugins: Arc<dyn PluginRegistry>, ids: Vec<String>) -> Self {
        Self { plugins, ids }
    }

    pub fn with_defaults(plugins: Arc<dyn PluginRegistry>) -> Self {
        Self::new(plugins, DEFAULT_PLUGINS.iter().map(|s| s.to_string()).collect())
    }

    async fn activate_one(&self, id: &str) -> anyhow::Result<Activation> {
        if self.plugins.is_active(id).await? {
            return Ok(Activation::AlreadyActive);
        }
        self.plugins.toggle_active(id).await?;
        Ok(Activation::Activated)
    }

    pub async fn ensure_active(&self) -> Result<StepOutcome> {
        info!("[PHASE: setup] [STEP: plugins] Enabling default plugins");

        let results = join_all(self.ids.iter().map(|id| self.activate_one(id))).await;

        let mut activated = Vec::new();
        let mut failed = Vec::new();
        for (id, result) in self.ids.iter().zip(results) {
            match result {
                Ok(Activation::Activated) => {
                    info!("[PHASE: setup] [STEP: plugins] Activated {}", id);
                    activated.push(id.clone());
                }
                Ok(Activation::AlreadyActive) => {
                    info!("[PHASE: setup] [STEP: plugins] {} already active", id);
                }
                Err(e) => {
                    warn!("[PHASE: setup] [STEP: plugins] Could not enable {}: {}", id, e);
                    failed.push(id.clone());
                }
            }
        }

        if !failed.is_empty() {
            return Err(SetupError::PartialExtensionFailure { failed });
        }
        if activated.is_empty() {
            Ok(StepOutcome::Skipped(format!(
                "{} plugin(s) already active",
                self.ids.len()
            )))
        } else {
            Ok(StepOutcome::Completed(format!(
                "activated {}",
                activated.join(", ")
            )))
        }
    }
}

#[async_trait]
impl SetupStep for ExtensionActivator {
    fn name(&self) -> &'static str {
        "plugins"
    }

    async fn run(&self) -> Result<StepOutcome> {
        self.ensure_active().await
    }
}
