//! Port traits abstracting all I/O away from the dataset runner.

use camino::{Utf8Path, Utf8PathBuf};

/// One variable file found in a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableInput {
    /// CMOR short name, e.g. `tas`.
    pub short_name: String,
    pub path: Utf8PathBuf,
}

/// Lists the variable files of a dataset.
pub trait DatasetSource: Sync {
    fn list_variables(&self, project: &str, dataset: &str) -> anyhow::Result<Vec<VariableInput>>;
}

/// File-system write operations.
pub trait WritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()>;
    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()>;
}
