//! Configuration file loading for cmorfix.
//!
//! Discovers and loads `cmorfix.toml` from the root directory.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use cmorfix_core::settings::{DatasetSpec, LoadSettings};
use fs_err as fs;
use serde::Deserialize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "cmorfix.toml";

/// Top-level configuration from cmorfix.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CmorfixConfig {
    pub paths: PathsConfig,
    pub policy: PolicyConfig,
    pub run: RunConfig,
    pub datasets: Vec<DatasetConfig>,
}

/// Paths section. Relative paths are resolved against the root directory.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_root: Option<Utf8PathBuf>,
    pub out_dir: Option<Utf8PathBuf>,
    pub scratch_dir: Option<Utf8PathBuf>,
}

/// Policy section of the config.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Fail a load when a registered fix cannot be constructed.
    pub strict_resolution: bool,

    /// Glob patterns over `project/model/variable` for fixes to skip.
    pub disabled: Vec<String>,

    /// Verify cubes after the data stage.
    pub check_contract: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            strict_resolution: false,
            disabled: Vec::new(),
            check_contract: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub jobs: Option<usize>,
}

/// One `[[datasets]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    pub project: String,
    pub dataset: String,
    #[serde(default)]
    pub variables: Vec<String>,
}

impl From<&DatasetConfig> for DatasetSpec {
    fn from(c: &DatasetConfig) -> Self {
        DatasetSpec::new(&c.project, &c.dataset).with_variables(c.variables.clone())
    }
}

/// Discover the cmorfix.toml config file.
///
/// Returns `None` if no config file is found.
pub fn discover_config(root: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = root.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a cmorfix.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<CmorfixConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<CmorfixConfig> {
    let config: CmorfixConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load config from the root directory, or return default if not found.
pub fn load_or_default(root: &Utf8Path) -> anyhow::Result<CmorfixConfig> {
    match discover_config(root) {
        Some(path) => load_config(&path),
        None => Ok(CmorfixConfig::default()),
    }
}

/// Parse `PROJECT/DATASET` or `PROJECT/DATASET:var1,var2`.
pub fn parse_dataset_arg(arg: &str) -> anyhow::Result<DatasetSpec> {
    let (name, vars) = match arg.split_once(':') {
        Some((name, vars)) => (name, Some(vars)),
        None => (arg, None),
    };
    let (project, dataset) = name
        .split_once('/')
        .map(|(p, d)| (p.trim(), d.trim()))
        .filter(|(p, d)| !p.is_empty() && !d.is_empty() && !d.contains('/'))
        .ok_or_else(|| anyhow::anyhow!("invalid dataset '{}': expected PROJECT/DATASET", arg))?;

    let variables = vars
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(DatasetSpec::new(project, dataset).with_variables(variables))
}

/// CLI values that take part in the merge. `None`/`false` means "not given".
#[derive(Debug, Clone, Default)]
pub struct LoadOverrides {
    pub data_root: Option<Utf8PathBuf>,
    pub out_dir: Option<Utf8PathBuf>,
    pub scratch_dir: Option<Utf8PathBuf>,
    pub strict: bool,
    pub disable: Vec<String>,
    pub no_contract_check: bool,
    pub jobs: Option<usize>,
    pub datasets: Vec<DatasetSpec>,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: CmorfixConfig,
}

impl ConfigMerger {
    pub fn new(config: CmorfixConfig) -> Self {
        Self { config }
    }

    /// Merge with `load` arguments into runner settings.
    ///
    /// CLI scalars override the file. CLI `disable` patterns extend the file list.
    /// CLI datasets replace the configured ones when any are given.
    pub fn merge_load_args(self, root: &Utf8Path, cli: &LoadOverrides) -> LoadSettings {
        let paths = &self.config.paths;
        let resolve = |p: &Utf8PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                root.join(p)
            }
        };

        let data_root = cli
            .data_root
            .clone()
            .or_else(|| paths.data_root.as_ref().map(resolve))
            .unwrap_or_else(|| root.join("data"));
        let out_dir = cli
            .out_dir
            .clone()
            .or_else(|| paths.out_dir.as_ref().map(resolve))
            .unwrap_or_else(|| root.join("artifacts").join("cmorfix"));
        let scratch_dir = cli
            .scratch_dir
            .clone()
            .or_else(|| paths.scratch_dir.as_ref().map(resolve));

        let mut disabled = self.config.policy.disabled.clone();
        for pattern in &cli.disable {
            if !disabled.contains(pattern) {
                disabled.push(pattern.clone());
            }
        }

        let datasets = if cli.datasets.is_empty() {
            self.config.datasets.iter().map(DatasetSpec::from).collect()
        } else {
            cli.datasets.clone()
        };

        LoadSettings {
            data_root,
            out_dir,
            scratch_dir,
            strict_resolution: cli.strict || self.config.policy.strict_resolution,
            disabled,
            check_contract: !cli.no_contract_check && self.config.policy.check_contract,
            jobs: cli.jobs.or(self.config.run.jobs).unwrap_or(1).max(1),
            datasets,
        }
    }

    /// Disabled patterns for `resolve`: the file list extended by the CLI.
    pub fn merge_disabled(self, cli_disable: &[String]) -> Vec<String> {
        let mut disabled = self.config.policy.disabled;
        for pattern in cli_disable {
            if !disabled.contains(pattern) {
                disabled.push(pattern.clone());
            }
        }
        disabled
    }
}
