// Setup smoke mode (deterministic).
//
// Runs the full pipeline twice against an in-memory store, with preset
// answers, into a scratch install root under the log folder. The second run
// must change nothing beyond re-applying the baseline settings.
//
// Writes:
// - `setup_smoke_transcript.log`

use crate::models::fields::{ADMIN_EMAIL, ADMIN_PASSWORD, ADMIN_USERNAME, BASE_URL, USE_PORT};
use crate::prompt::PresetAnswers;
use crate::setup::{CategoryDataset, Orchestrator, SetupPlan, SetupReport, DEFAULT_PLUGINS};
use crate::store::{Collaborators, MemoryStore};
use crate::utils::path_resolver::{client_config_path, server_config_path};
use anyhow::{bail, Context, Result};
use log::info;
use std::path::Path;
use std::sync::Arc;

pub const TRANSCRIPT_FILE: &str = "setup_smoke_transcript.log";

fn plan(install_root: &Path, store: &Arc<MemoryStore>) -> SetupPlan {
    let answers = PresetAnswers::new()
        .with(BASE_URL, "http://localhost/forum")
        .with(USE_PORT, "y")
        .with(ADMIN_USERNAME, "admin")
        .with(ADMIN_EMAIL, "admin@localhost")
        .with(ADMIN_PASSWORD, "smoke-password");

    SetupPlan {
        install_root: install_root.to_path_buf(),
        collaborators: Collaborators::from_store(store.clone()),
        answers: Arc::new(answers),
        dataset: CategoryDataset::Bundled,
        default_plugins: DEFAULT_PLUGINS.iter().map(|s| s.to_string()).collect(),
    }
}

fn push_report(t: &mut String, label: &str, report: &SetupReport) {
    t.push_str(&format!("=== {} ===\n", label));
    for line in report.summary_lines() {
        t.push_str(&line);
        t.push('\n');
    }
}

pub async fn setup_smoke(log_dir: &Path) -> Result<()> {
    let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
    let install_root = log_dir.join(format!("setup_smoke_{}", stamp));
    tokio::fs::create_dir_all(&install_root)
        .await
        .with_context(|| format!("Failed to create smoke install root {:?}", install_root))?;
    let transcript_path = log_dir.join(TRANSCRIPT_FILE);

    let mut transcript = String::new();
    transcript.push_str("SETUP_SMOKE begin\n");
    transcript.push_str(&format!("install_root={}\n", install_root.display()));

    let store = Arc::new(MemoryStore::new());

    let first = Orchestrator::standard(plan(&install_root, &store))
        .run()
        .await
        .context("First setup run failed")?;
    push_report(&mut transcript, "first run", &first);
    let after_first = store.journal().await;
    transcript.push_str(&format!("writes={}\n", after_first.len()));

    for path in [server_config_path(&install_root), client_config_path(&install_root)] {
        let exists = tokio::fs::try_exists(&path).await.unwrap_or(false);
        transcript.push_str(&format!("{} exists={}\n", path.display(), exists));
        if !exists {
            bail!("Expected {:?} after the first run", path);
        }
    }

    let second = Orchestrator::standard(plan(&install_root, &store))
        .run()
        .await
        .context("Second setup run failed")?;
    push_report(&mut transcript, "second run", &second);

    let after_second = store.journal().await;
    let repeated: Vec<&String> = after_second[after_first.len()..]
        .iter()
        .filter(|op| !op.starts_with("settings.set:"))
        .collect();
    transcript.push_str(&format!(
        "second_run_writes={} non_settings_writes={}\n",
        after_second.len() - after_first.len(),
        repeated.len()
    ));

    let idempotent = repeated.is_empty();
    transcript.push_str(&format!(
        "SETUP_SMOKE end result={}\n",
        if idempotent { "ok" } else { "fail" }
    ));
    tokio::fs::write(&transcript_path, &transcript)
        .await
        .with_context(|| format!("Failed to write {:?}", transcript_path))?;
    info!(
        "[PHASE: smoke] [STEP: transcript] Wrote {:?}",
        transcript_path
    );

    if !idempotent {
        bail!("Second run repeated writes: {:?}", repeated);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn smoke_passes_and_writes_transcript() {
        let dir = tempfile::tempdir().unwrap();
        setup_smoke(dir.path()).await.unwrap();

        let text = std::fs::read_to_string(dir.path().join(TRANSCRIPT_FILE)).unwrap();
        assert!(text.contains("SETUP_SMOKE end result=ok"), "{}", text);
        assert!(text.contains("non_settings_writes=0"), "{}", text);
    }
}
