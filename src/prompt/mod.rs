//! Answer collection.
//!
//! A source turns an ordered list of field descriptors into validated answers.
//! `Ok(None)` means the operator cancelled.

pub mod preset;
pub mod terminal;

use crate::error::{Result, SetupError};
use crate::models::fields::{Answers, FieldDescriptor};
use async_trait::async_trait;
use log::warn;
use std::sync::Arc;
use tokio::sync::watch;

pub use preset::PresetAnswers;
pub use terminal::TerminalAnswers;

#[async_trait]
pub trait AnswerSource: Send + Sync {
    async fn collect(&self, fields: &[FieldDescriptor]) -> Result<Option<Answers>>;
}

/// Collect answers, treating cancellation or an empty result as an abort.
pub async fn collect_or_abort(
    source: &dyn AnswerSource,
    fields: &[FieldDescriptor],
    what: &str,
) -> Result<Answers> {
    match source.collect(fields).await? {
        Some(answers) if !answers.is_empty() => Ok(answers),
        _ => Err(SetupError::Aborted(format!("no answers given for {}", what))),
    }
}

/// Wraps a source so an operator interrupt cancels the prompt being answered.
///
/// Only collection is cut short. Store writes between prompts always run to
/// completion; an interrupt raised while they run cancels the next prompt.
pub struct Interruptible {
    inner: Arc<dyn AnswerSource>,
    interrupted: watch::Receiver<bool>,
}

impl Interruptible {
    pub fn new(inner: Arc<dyn AnswerSource>, interrupted: watch::Receiver<bool>) -> Self {
        Self { inner, interrupted }
    }
}

#[async_trait]
impl AnswerSource for Interruptible {
    async fn collect(&self, fields: &[FieldDescriptor]) -> Result<Option<Answers>> {
        let mut interrupted = self.interrupted.clone();
        let already = *interrupted.borrow();
        if already {
            warn!("[PHASE: setup] [STEP: answers] Interrupted before prompting");
            return Ok(None);
        }

        tokio::select! {
            answers = self.inner.collect(fields) => answers,
            true = async { interrupted.wait_for(|v| *v).await.is_ok() } => {
                warn!("[PHASE: setup] [STEP: answers] Interrupted while prompting");
                Ok(None)
            }
        }
    }
}
