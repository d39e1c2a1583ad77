// Setup error kinds
//
// Every kind except `PartialExtensionFailure` is fatal to the setup run.

use std::path::PathBuf;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum SetupError {
    /// Operator cancelled, or a prompt produced no answers.
    #[error("setup aborted: {0}")]
    Aborted(String),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid value for '{field}': {message}")]
    ValidationFailed { field: String, message: String },

    #[error("failed to write {path:?}: {source}")]
    PersistFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A collaborator (settings, users, groups, categories, plugins) call failed.
    #[error("{operation} failed: {source}")]
    StoreUnavailable {
        operation: String,
        #[source]
        source: BoxError,
    },

    /// The bundled (or overriding) default dataset could not be read or parsed.
    #[error("default dataset {origin} is unusable: {reason}")]
    DatasetUnavailable { origin: String, reason: String },

    /// Non-fatal: some extensions could not be checked or activated.
    #[error("{} extension(s) could not be activated: {}", failed.len(), failed.join(", "))]
    PartialExtensionFailure { failed: Vec<String> },
}

impl SetupError {
    pub fn store(operation: impl Into<String>, source: anyhow::Error) -> Self {
        SetupError::StoreUnavailable {
            operation: operation.into(),
            source: source.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        SetupError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether the orchestrator must stop on this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SetupError::PartialExtensionFailure { .. })
    }
}

pub type Result<T, E = SetupError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_partial_extension_failure_is_non_fatal() {
        let partial = SetupError::PartialExtensionFailure {
            failed: vec!["nodebb-plugin-mentions".to_string()],
        };
        assert!(!partial.is_fatal());
        assert!(SetupError::Aborted("cancelled".into()).is_fatal());
        assert!(SetupError::validation("email", "bad").is_fatal());
        assert!(SetupError::store("groups.get", anyhow::anyhow!("down")).is_fatal());
    }

    #[test]
    fn store_error_keeps_source_message() {
        let err = SetupError::store("users.create", anyhow::anyhow!("connection refused"));
        let text = err.to_string();
        assert!(text.contains("users.create"), "{}", text);
        assert!(text.contains("connection refused"), "{}", text);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn partial_failure_lists_ids() {
        let err = SetupError::PartialExtensionFailure {
            failed: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "2 extension(s) could not be activated: a, b");
    }
}
