use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const SERVER_CONFIG_FILE: &str = "config.json";
pub const CLIENT_CONFIG_DIR: &str = "public";
pub const DEFAULT_CATEGORIES_FILE: &str = "install/data/categories.json";
pub const STORE_FILE: &str = "data/store.json";
pub const LOG_DIR: &str = "logs";

/// Resolve the installation root (absolute path).
///
/// An explicit root wins; otherwise the current working directory is used.
pub fn resolve_install_root(explicit: Option<&Path>) -> Result<PathBuf> {
    let base = match explicit {
        Some(p) => p.to_path_buf(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    if base.is_absolute() {
        return Ok(base);
    }
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    Ok(cwd.join(base))
}

/// Resolve the log folder and make sure it exists.
///
/// Falls back to the user's local data directory when the installation root is
/// not writable.
pub fn resolve_log_folder(install_root: &Path, explicit: Option<&Path>) -> Result<PathBuf> {
    let preferred = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| install_root.join(LOG_DIR));

    match std::fs::create_dir_all(&preferred) {
        Ok(()) => Ok(preferred),
        Err(e) => {
            let fallback = dirs::data_local_dir()
                .ok_or_else(|| {
                    anyhow::anyhow!("Failed to create log folder {:?}: {}", preferred, e)
                })?
                .join("forum-setup")
                .join(LOG_DIR);
            std::fs::create_dir_all(&fallback)
                .with_context(|| format!("Failed to create log folder {:?}", fallback))?;
            Ok(fallback)
        }
    }
}

pub fn server_config_path(install_root: &Path) -> PathBuf {
    install_root.join(SERVER_CONFIG_FILE)
}

pub fn client_config_path(install_root: &Path) -> PathBuf {
    install_root.join(CLIENT_CONFIG_DIR).join(SERVER_CONFIG_FILE)
}
