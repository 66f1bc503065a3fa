//! Clap-free settings for the dataset runner.

use camino::Utf8PathBuf;

/// One dataset to correct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSpec {
    pub project: String,
    pub dataset: String,
    /// Short names to load. Empty means every variable file found.
    pub variables: Vec<String>,
}

impl DatasetSpec {
    pub fn new(project: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
            variables: Vec::new(),
        }
    }

    pub fn with_variables(mut self, variables: Vec<String>) -> Self {
        self.variables = variables;
        self
    }
}

/// Settings for `run_load`.
#[derive(Debug, Clone)]
pub struct LoadSettings {
    pub data_root: Utf8PathBuf,
    pub out_dir: Utf8PathBuf,
    /// Where file-stage fixes write repaired copies. Defaults to `<out_dir>/scratch`.
    pub scratch_dir: Option<Utf8PathBuf>,

    // Policy
    pub strict_resolution: bool,
    /// Glob patterns over `project/model/variable`.
    pub disabled: Vec<String>,
    pub check_contract: bool,

    // Run
    pub jobs: usize,
    pub datasets: Vec<DatasetSpec>,
}

impl LoadSettings {
    pub fn scratch_dir(&self) -> Utf8PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(|| self.out_dir.join("scratch"))
    }
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            data_root: Utf8PathBuf::from("data"),
            out_dir: Utf8PathBuf::from("artifacts/cmorfix"),
            scratch_dir: None,
            strict_resolution: false,
            disabled: Vec::new(),
            check_contract: true,
            jobs: 1,
            datasets: Vec::new(),
        }
    }
}
