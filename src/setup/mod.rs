//! Setup orchestration.
//!
//! The run is an ordered list of steps executed by one loop. A step either
//! finishes with an outcome or fails. Fatal failures stop the run at once;
//! non-fatal ones (`SetupError::PartialExtensionFailure`) are logged and the run
//! continues.

pub mod admin;
pub mod categories;
pub mod configure;
pub mod plugins;

use crate::error::{Result, SetupError};
use crate::installation::ConfigPersister;
use crate::prompt::AnswerSource;
use crate::store::Collaborators;
use async_trait::async_trait;
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

pub use admin::AdminBootstrapper;
pub use categories::{CategoryDataset, DefaultDataSeeder};
pub use configure::{derive_configs, ConfigureStep};
pub use plugins::{ExtensionActivator, DEFAULT_PLUGINS};

#[derive(Debug)]
pub enum StepOutcome {
    /// The step changed something.
    Completed(String),
    /// Existing state already satisfied the step.
    Skipped(String),
    /// The step finished but part of it failed without stopping the run.
    Degraded(SetupError),
}

impl StepOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            StepOutcome::Completed(_) => "completed",
            StepOutcome::Skipped(_) => "skipped",
            StepOutcome::Degraded(_) => "degraded",
        }
    }

    pub fn detail(&self) -> String {
        match self {
            StepOutcome::Completed(s) | StepOutcome::Skipped(s) => s.clone(),
            StepOutcome::Degraded(e) => e.to_string(),
        }
    }
}

#[async_trait]
pub trait SetupStep: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self) -> Result<StepOutcome>;
}

#[derive(Debug)]
pub struct StepRecord {
    pub name: &'static str,
    pub outcome: StepOutcome,
    pub duration_ms: u128,
}

#[derive(Debug, Default)]
pub struct SetupReport {
    pub steps: Vec<StepRecord>,
}

impl SetupReport {
    pub fn outcome(&self, name: &str) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.name == name).map(|s| &s.outcome)
    }

    pub fn summary_lines(&self) -> Vec<String> {
        self.steps
            .iter()
            .map(|s| format!("{:<14} {:<10} {}", s.name, s.outcome.label(), s.outcome.detail()))
            .collect()
    }
}

/// Everything the standard step list needs.
pub struct SetupPlan {
    pub install_root: PathBuf,
    pub collaborators: Collaborators,
    pub answers: Arc<dyn AnswerSource>,
    pub dataset: CategoryDataset,
    pub default_plugins: Vec<String>,
}

pub struct Orchestrator {
    steps: Vec<Box<dyn SetupStep>>,
}

impl Orchestrator {
    pub fn new(steps: Vec<Box<dyn SetupStep>>) -> Self {
        Self { steps }
    }

    /// Configure -> administrator -> categories -> plugins.
    pub fn standard(plan: SetupPlan) -> Self {
        let c = plan.collaborators;
        let persister = ConfigPersister::new(plan.install_root, c.settings.clone());
        Self::new(vec![
            Box::new(ConfigureStep::new(plan.answers.clone(), persister)),
            Box::new(AdminBootstrapper::new(c.groups, c.users, plan.answers)),
            Box::new(DefaultDataSeeder::new(c.categories, plan.dataset)),
            Box::new(ExtensionActivator::new(c.plugins, plan.default_plugins)),
        ])
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step in order, stopping at the first fatal failure.
    pub async fn run(&self) -> Result<SetupReport> {
        let mut report = SetupReport::default();

        for step in &self.steps {
            let started = Instant::now();
            info!("[PHASE: setup] [STEP: {}] Starting", step.name());

            let outcome = match step.run().await {
                Ok(outcome) => outcome,
                Err(e) if !e.is_fatal() => {
                    warn!("[PHASE: setup] [STEP: {}] Continuing after: {}", step.name(), e);
                    StepOutcome::Degraded(e)
                }
                Err(e) => {
                    warn!(
                        "[PHASE: setup] [STEP: {}] Forum Setup Aborted: {}",
                        step.name(),
                        e
                    );
                    return Err(e);
                }
            };

            let duration_ms = started.elapsed().as_millis();
            info!(
                "[PHASE: setup] [STEP: {}] Finished ({}, duration_ms={})",
                step.name(),
                outcome.label(),
                duration_ms
            );
            report.steps.push(StepRecord {
                name: step.name(),
                outcome,
                duration_ms,
            });
        }

        Ok(report)
    }
}
