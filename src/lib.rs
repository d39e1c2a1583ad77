// Forum first-run setup
// Main library entry point

pub mod error;
pub mod installation;
pub mod models;
pub mod options;
pub mod prompt;
pub mod setup;
pub mod smoke;
pub mod store;
pub mod utils;

use error::SetupError;
use log::{error, info, warn};
use options::{CliArgs, SetupOptions};
use prompt::{AnswerSource, PresetAnswers, TerminalAnswers};
use setup::{Orchestrator, SetupPlan, SetupReport};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use store::{Collaborators, JsonFileStore};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FATAL: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

/// Initialize logging system with dual format (JSON + human-readable)
fn init_logging(log_dir: &Path, with_stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(log_dir)?;

    let timestamp = chrono::Utc::now().format("%Y-%m-%d-%H%M%S");
    let json_log_file = log_dir.join(format!("setup-{}.log", timestamp));
    let txt_log_file = log_dir.join(format!("setup-{}.txt", timestamp));

    let mut dispatch = fern::Dispatch::new().level(log::LevelFilter::Debug);

    if with_stdout {
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .level(log::LevelFilter::Info)
                .format(move |out, message, record| {
                    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let txt_line = utils::logging::format_human_readable_log(
                        &timestamp_local.to_string(),
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}", txt_line));
                })
                .chain(std::io::stdout()),
        );
    }

    dispatch = dispatch
        .chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    let timestamp_utc = chrono::Utc::now().to_rfc3339();
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let json_line = utils::logging::format_json_log(
                        &timestamp_utc,
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}\n", json_line));
                })
                .chain(fern::log_file(json_log_file)?),
        )
        .chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let txt_line = utils::logging::format_human_readable_log(
                        &timestamp_local.to_string(),
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}\n", txt_line));
                })
                .chain(fern::log_file(txt_log_file)?),
        );

    dispatch.apply()?;

    log::info!(
        "[PHASE: initialization] Logging initialized, log directory: {:?}",
        log_dir
    );
    Ok(())
}

/// Resolve options, install root and log folder, and start logging.
fn prepare(cli: &CliArgs, with_stdout: bool) -> Result<(SetupOptions, PathBuf, PathBuf), i32> {
    let mut options = match SetupOptions::load(cli.config.as_deref()) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("forum-setup: {:#}", e);
            return Err(EXIT_USAGE);
        }
    };
    options.apply_cli(cli);

    let install_root =
        match utils::path_resolver::resolve_install_root(options.install_root.as_deref()) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("forum-setup: {:#}", e);
                return Err(EXIT_USAGE);
            }
        };
    let log_dir =
        match utils::path_resolver::resolve_log_folder(&install_root, options.log_dir.as_deref()) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("forum-setup: {:#}", e);
                return Err(EXIT_FATAL);
            }
        };

    if let Err(e) = init_logging(&log_dir, with_stdout) {
        eprintln!("Failed to initialize logging: {}", e);
    }
    Ok((options, install_root, log_dir))
}

fn build_runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

async fn answer_source(options: &SetupOptions) -> anyhow::Result<Arc<dyn AnswerSource>> {
    if !options.uses_preset_answers() {
        info!("[PHASE: initialization] [STEP: answers] Prompting on the terminal");
        return Ok(Arc::new(TerminalAnswers));
    }

    let preset = match &options.answers_file {
        Some(path) => {
            info!(
                "[PHASE: initialization] [STEP: answers] Reading answers from {:?}",
                path
            );
            PresetAnswers::load(path).await?
        }
        None => PresetAnswers::new(),
    };
    Ok(Arc::new(preset.merge_env(std::env::vars())))
}

async fn run_pipeline(options: &SetupOptions, install_root: PathBuf) -> error::Result<SetupReport> {
    let answers = answer_source(options).await.map_err(|e| {
        SetupError::Aborted(format!("answers could not be loaded: {:#}", e))
    })?;

    let store_path = options.store_path(&install_root);
    info!(
        "[PHASE: initialization] [STEP: store] Using store {:?}",
        store_path
    );
    let store = JsonFileStore::open(&store_path, options.hash_cost)
        .await
        .map_err(|e| SetupError::store(format!("store.open({})", store_path.display()), e))?;

    // Interrupts only cancel a pending prompt; store writes are never dropped mid-step.
    let (interrupt_tx, interrupt_rx) = tokio::sync::watch::channel(false);
    let listener = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("[PHASE: setup] Interrupted by operator, stopping at the next prompt");
            let _ = interrupt_tx.send(true);
        }
    });

    let dataset = options.dataset(&install_root);
    let orchestrator = Orchestrator::standard(SetupPlan {
        install_root,
        collaborators: Collaborators::from_store(Arc::new(store)),
        answers: Arc::new(prompt::Interruptible::new(answers, interrupt_rx)),
        dataset,
        default_plugins: options.default_plugins.clone(),
    });

    let result = orchestrator.run().await;
    listener.abort();
    result
}

/// Interactive (or preset) first-run setup. Returns the process exit code.
pub fn run_setup(cli: &CliArgs) -> i32 {
    let (options, install_root, _log_dir) = match prepare(cli, true) {
        Ok(prepared) => prepared,
        Err(code) => return code,
    };

    info!(
        "[PHASE: initialization] Forum setup starting at {} (install root {:?})",
        chrono::Utc::now(),
        install_root
    );

    let rt = match build_runtime() {
        Ok(rt) => rt,
        Err(e) => {
            error!("[PHASE: initialization] Failed to create async runtime: {}", e);
            eprintln!("Forum setup error: {}", e);
            return EXIT_FATAL;
        }
    };
    let result = rt.block_on(run_pipeline(&options, install_root));
    // A terminal prompt may still be blocked on stdin after an interrupt.
    rt.shutdown_background();

    match result {
        Ok(report) => {
            println!();
            for line in report.summary_lines() {
                println!("  {}", line);
            }
            info!("[PHASE: setup] Forum Setup Completed");
            EXIT_OK
        }
        Err(e) => {
            error!("[PHASE: setup] Forum Setup Aborted: {}", e);
            eprintln!("Forum setup aborted: {}", e);
            EXIT_FATAL
        }
    }
}

/// Non-interactive setup smoke (deterministic).
/// Writes `setup_smoke_transcript.log` under the log folder and returns 0/1.
pub fn run_setup_smoke(cli: &CliArgs) -> i32 {
    let (_options, _install_root, log_dir) = match prepare(cli, false) {
        Ok(prepared) => prepared,
        Err(code) => return code,
    };

    info!(
        "[PHASE: initialization] Setup smoke starting at {}",
        chrono::Utc::now()
    );

    let result = match build_runtime() {
        Ok(rt) => rt.block_on(smoke::setup_smoke(&log_dir)),
        Err(e) => Err(anyhow::anyhow!(
            "Failed to create async runtime for setup smoke: {}",
            e
        )),
    };

    match result {
        Ok(()) => {
            println!("Setup smoke passed, see {:?}", log_dir.join(smoke::TRANSCRIPT_FILE));
            EXIT_OK
        }
        Err(e) => {
            error!(
                "[PHASE: smoke] [STEP: smoke] Setup smoke exited with error: {:?}",
                e
            );
            eprintln!("Setup smoke failed: {:#}", e);
            EXIT_FATAL
        }
    }
}
