//! Configuration document persistence.
//!
//! - Async I/O only (tokio)
//! - Both documents are written concurrently; neither write is undone if the other fails
//! - Every write is bounded by a timeout
//! - Never log document contents (the server document carries secrets)

use crate::error::{Result, SetupError};
use crate::models::documents::{ClientConfig, ServerConfig};
use crate::store::SettingsStore;
use crate::utils::path_resolver::{client_config_path, server_config_path};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{timeout, Duration};

const WRITE_TIMEOUT: Duration = Duration::from_secs(60);

/// Serialize with a 4-space indent.
pub fn to_pretty_json<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

async fn write_document<T: Serialize>(path: &Path, doc: &T, label: &str) -> Result<()> {
    let started = Instant::now();
    debug!(
        "[PHASE: setup] [STEP: persist] write_document entered (label={}, path={:?})",
        label, path
    );

    let persist_err = |source: std::io::Error| SetupError::PersistFailed {
        path: path.to_path_buf(),
        source,
    };

    let bytes = to_pretty_json(doc).map_err(|e| persist_err(e.into()))?;

    let write = async {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &bytes).await
    };

    match timeout(WRITE_TIMEOUT, write).await {
        Ok(Ok(())) => {
            debug!(
                "[PHASE: setup] [STEP: persist] write_document exit ok (label={}, bytes={}, duration_ms={})",
                label,
                bytes.len(),
                started.elapsed().as_millis()
            );
            Ok(())
        }
        Ok(Err(e)) => {
            warn!(
                "[PHASE: setup] [STEP: persist] write failed (label={}, path={:?}, err={})",
                label, path, e
            );
            Err(persist_err(e))
        }
        Err(_) => {
            warn!(
                "[PHASE: setup] [STEP: persist] write timed out (label={}, path={:?}, timeout_ms={})",
                label,
                path,
                WRITE_TIMEOUT.as_millis()
            );
            Err(persist_err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "write timed out",
            )))
        }
    }
}

/// Writes the configuration documents under an installation root and
/// individual settings to the settings store.
#[derive(Clone)]
pub struct ConfigPersister {
    install_root: PathBuf,
    settings: Arc<dyn SettingsStore>,
}

impl ConfigPersister {
    pub fn new(install_root: impl Into<PathBuf>, settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            install_root: install_root.into(),
            settings,
        }
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    /// Write `config.json` and `public/config.json` concurrently.
    ///
    /// Fails with the first error if either write fails; a document that was
    /// written stays written.
    pub async fn save(&self, server: &ServerConfig, client: &ClientConfig) -> Result<()> {
        let server_path = server_config_path(&self.install_root);
        let client_path = client_config_path(&self.install_root);

        let (server_res, client_res) = tokio::join!(
            write_document(&server_path, server, "server"),
            write_document(&client_path, client, "client"),
        );

        match (server_res, client_res) {
            (Ok(()), Ok(())) => {
                info!("[PHASE: setup] [STEP: persist] Configuration Saved OK");
                Ok(())
            }
            (Err(e), Ok(())) => {
                warn!(
                    "[PHASE: setup] [STEP: persist] Partial write: {:?} was written and is kept",
                    client_path
                );
                Err(e)
            }
            (Ok(()), Err(e)) => {
                warn!(
                    "[PHASE: setup] [STEP: persist] Partial write: {:?} was written and is kept",
                    server_path
                );
                Err(e)
            }
            (Err(e), Err(_)) => Err(e),
        }
    }

    /// Write one setting (last write wins).
    pub async fn set_setting(&self, key: &str, value: Value) -> Result<()> {
        self.settings
            .set(key, value)
            .await
            .map_err(|e| SetupError::store(format!("settings.set({})", key), e))
    }
}
