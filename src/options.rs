// Run options
//
// Layered with the `config` crate: built-in defaults, then `setup.toml` in the
// working directory (or the file named by --config), then FORUM_SETUP_*
// environment variables. Command-line flags are applied last.

use crate::setup::{CategoryDataset, DEFAULT_PLUGINS};
use crate::utils::path_resolver::STORE_FILE;
use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "FORUM_SETUP";
pub const DEFAULT_CONFIG_NAME: &str = "setup";
pub const DEFAULT_HASH_COST: u32 = 12;

pub const USAGE: &str = "Usage: forum-setup [--root DIR] [--config FILE] [--answers FILE] \
[--log-dir DIR] [--non-interactive] [--setup-smoke]";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SetupOptions {
    pub install_root: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub answers_file: Option<PathBuf>,
    pub non_interactive: bool,
    /// Replaces the bundled default categories.
    pub categories_file: Option<PathBuf>,
    pub default_plugins: Vec<String>,
    pub store_file: Option<PathBuf>,
    pub hash_cost: u32,
}

impl Default for SetupOptions {
    fn default() -> Self {
        Self {
            install_root: None,
            log_dir: None,
            answers_file: None,
            non_interactive: false,
            categories_file: None,
            default_plugins: DEFAULT_PLUGINS.iter().map(|s| s.to_string()).collect(),
            store_file: None,
            hash_cost: DEFAULT_HASH_COST,
        }
    }
}

impl SetupOptions {
    /// Load options from the optional config file and the process environment.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        Self::load_with(config_file, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with(config_file: Option<&Path>, env: Environment) -> Result<Self> {
        let defaults = SetupOptions::default();
        let mut builder = Config::builder()
            .set_default("non_interactive", defaults.non_interactive)?
            .set_default("hash_cost", i64::from(defaults.hash_cost))?
            .set_default("default_plugins", defaults.default_plugins.clone())?;

        builder = match config_file {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file {:?} does not exist", path);
                }
                builder.add_source(File::from(path))
            }
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_NAME).required(false)),
        };

        let options: SetupOptions = builder
            .add_source(
                env.try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("default_plugins"),
            )
            .build()
            .context("Failed to read setup options")?
            .try_deserialize()
            .context("Invalid setup options")?;

        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if !(4..=31).contains(&self.hash_cost) {
            bail!("hash_cost must be between 4 and 31, got {}", self.hash_cost);
        }
        if self.default_plugins.iter().any(|p| p.trim().is_empty()) {
            bail!("default_plugins must not contain empty ids");
        }
        Ok(())
    }

    /// Flags given on the command line win over every other layer.
    pub fn apply_cli(&mut self, cli: &CliArgs) {
        if let Some(root) = &cli.root {
            self.install_root = Some(root.clone());
        }
        if let Some(answers) = &cli.answers {
            self.answers_file = Some(answers.clone());
        }
        if let Some(log_dir) = &cli.log_dir {
            self.log_dir = Some(log_dir.clone());
        }
        if cli.non_interactive {
            self.non_interactive = true;
        }
    }

    /// Preset answers are used when asked for, or when an answers file is given.
    pub fn uses_preset_answers(&self) -> bool {
        self.non_interactive || self.answers_file.is_some()
    }

    pub fn store_path(&self, install_root: &Path) -> PathBuf {
        match &self.store_file {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => install_root.join(p),
            None => install_root.join(STORE_FILE),
        }
    }

    /// An explicit `categories_file` wins; otherwise the installation's own
    /// dataset, falling back to the compiled-in one.
    pub fn dataset(&self, install_root: &Path) -> CategoryDataset {
        match &self.categories_file {
            Some(p) if p.is_absolute() => CategoryDataset::File(p.clone()),
            Some(p) => CategoryDataset::File(install_root.join(p)),
            None => CategoryDataset::for_install_root(install_root),
        }
    }
}

/// Command-line flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub root: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub answers: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub non_interactive: bool,
    pub setup_smoke: bool,
    pub help: bool,
}

impl CliArgs {
    /// Scan arguments (without the program name). Value flags accept both
    /// `--flag value` and `--flag=value`.
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut cli = CliArgs::default();
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((f, v)) if f.starts_with("--") => (f, Some(v.to_string())),
                _ => (arg.as_str(), None),
            };

            let mut value = |name: &str| -> Result<PathBuf> {
                let v = match inline.clone() {
                    Some(v) => v,
                    None => iter
                        .next()
                        .cloned()
                        .with_context(|| format!("{} requires a value", name))?,
                };
                if v.trim().is_empty() {
                    bail!("{} requires a value", name);
                }
                Ok(PathBuf::from(v))
            };

            match flag {
                "--root" => cli.root = Some(value("--root")?),
                "--config" => cli.config = Some(value("--config")?),
                "--answers" => cli.answers = Some(value("--answers")?),
                "--log-dir" => cli.log_dir = Some(value("--log-dir")?),
                "--non-interactive" => cli.non_interactive = true,
                "--setup-smoke" => cli.setup_smoke = true,
                "--help" | "-h" => cli.help = true,
                other => bail!("Unknown argument '{}'", other),
            }
        }

        Ok(cli)
    }
}
