//! Default filesystem-backed port implementations.

use crate::ports::{DatasetSource, VariableInput, WritePort};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use tracing::debug;

/// Short name of a CMOR-style file: the stem up to the first `_`.
///
/// `tas_Amon_CESM2_historical.json` gives `tas`; a stem without `_` is used whole.
pub fn short_name_of(path: &Utf8Path) -> Option<&str> {
    let stem = path.file_stem()?;
    let short = stem.split('_').next().unwrap_or(stem);
    (!short.is_empty()).then_some(short)
}

/// Globs `<data_root>/<project>/<dataset>/*.json`.
#[derive(Debug, Clone)]
pub struct FsDatasetSource {
    pub data_root: Utf8PathBuf,
}

impl FsDatasetSource {
    pub fn new(data_root: Utf8PathBuf) -> Self {
        Self { data_root }
    }

    fn dataset_dir(&self, project: &str, dataset: &str) -> Utf8PathBuf {
        self.data_root.join(project).join(dataset)
    }
}

impl DatasetSource for FsDatasetSource {
    fn list_variables(&self, project: &str, dataset: &str) -> anyhow::Result<Vec<VariableInput>> {
        let dir = self.dataset_dir(project, dataset);
        if !dir.is_dir() {
            anyhow::bail!("dataset directory {} does not exist", dir);
        }

        let pattern = format!("{}/*.json", glob::Pattern::escape(dir.as_str()));
        let mut out = Vec::new();
        for entry in glob::glob(&pattern).with_context(|| format!("glob {}", pattern))? {
            let path = entry.with_context(|| format!("read entry under {}", dir))?;
            let path = Utf8PathBuf::from_path_buf(path)
                .map_err(|p| anyhow::anyhow!("non-utf8 path {}", p.display()))?;
            let Some(short_name) = short_name_of(&path) else {
                debug!(path = %path, "skipping file without a short name");
                continue;
            };
            out.push(VariableInput {
                short_name: short_name.to_string(),
                path,
            });
        }

        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }
}

/// In-memory dataset source for embedding and testing.
///
/// Inputs are keyed by `(project, dataset)` and returned sorted by path to match
/// `FsDatasetSource`'s deterministic ordering.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDatasetSource {
    datasets: Vec<(String, String, Vec<VariableInput>)>,
}

impl InMemoryDatasetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(mut self, project: &str, dataset: &str, paths: &[&str]) -> Self {
        let mut inputs: Vec<VariableInput> = paths
            .iter()
            .map(Utf8PathBuf::from)
            .filter_map(|path| {
                let short_name = short_name_of(&path)?.to_string();
                Some(VariableInput { short_name, path })
            })
            .collect();
        inputs.sort_by(|a, b| a.path.cmp(&b.path));
        self.datasets
            .push((project.to_string(), dataset.to_string(), inputs));
        self
    }
}

impl DatasetSource for InMemoryDatasetSource {
    fn list_variables(&self, project: &str, dataset: &str) -> anyhow::Result<Vec<VariableInput>> {
        self.datasets
            .iter()
            .find(|(p, d, _)| p == project && d == dataset)
            .map(|(_, _, inputs)| inputs.clone())
            .ok_or_else(|| anyhow::anyhow!("unknown dataset {}/{}", project, dataset))
    }
}

/// Filesystem write operations.
#[derive(Debug, Clone, Default)]
pub struct FsWritePort;

impl WritePort for FsWritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create parent dir for {}", path))?;
        }
        fs::write(path, contents).with_context(|| format!("write {}", path))
    }

    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()> {
        fs::create_dir_all(path).with_context(|| format!("create_dir_all {}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn root(temp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8")
    }

    #[test]
    fn short_name_stops_at_first_underscore() {
        assert_eq!(
            short_name_of(Utf8Path::new("/d/tas_Amon_CESM2_historical.json")),
            Some("tas")
        );
        assert_eq!(short_name_of(Utf8Path::new("pr.json")), Some("pr"));
        assert_eq!(short_name_of(Utf8Path::new("_x.json")), None);
    }

    #[test]
    fn fs_source_lists_json_files_sorted() {
        let temp = TempDir::new().unwrap();
        let dir = root(&temp).join("CMIP6").join("CESM2");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("tas_Amon.json"), "{}").unwrap();
        std::fs::write(dir.join("cl_Amon.json"), "{}").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let source = FsDatasetSource::new(root(&temp));
        let inputs = source.list_variables("CMIP6", "CESM2").unwrap();
        let names: Vec<&str> = inputs.iter().map(|i| i.short_name.as_str()).collect();
        assert_eq!(names, vec!["cl", "tas"]);
    }

    #[test]
    fn fs_source_fails_for_missing_dataset() {
        let temp = TempDir::new().unwrap();
        let source = FsDatasetSource::new(root(&temp));
        let err = source.list_variables("CMIP6", "NOPE").unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn in_memory_source_sorts_and_rejects_unknown() {
        let source = InMemoryDatasetSource::new().with_dataset(
            "CMIP6",
            "CESM2",
            &["b/tas_1.json", "a/pr_1.json"],
        );
        let inputs = source.list_variables("CMIP6", "CESM2").unwrap();
        assert_eq!(inputs[0].short_name, "pr");
        assert_eq!(inputs[1].short_name, "tas");
        assert!(source.list_variables("CMIP5", "CESM2").is_err());
    }

    #[test]
    fn fs_write_port_creates_parents() {
        let temp = TempDir::new().unwrap();
        let path = root(&temp).join("a").join("b").join("out.json");
        FsWritePort.write_file(&path, b"{}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }
}
