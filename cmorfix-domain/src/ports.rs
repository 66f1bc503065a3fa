use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use cmorfix_types::Cube;
use fs_err as fs;

/// Turns a file path into a cube.
///
/// The pipeline calls this with whatever path the file stage returned, which may differ from the
/// nominal one.
pub trait CubeLoader: Sync {
    fn load(&self, path: &Utf8Path) -> anyhow::Result<Cube>;
}

/// File-system backed `CubeLoader` reading JSON cubes.
///
/// Relative paths are resolved against `root`.
#[derive(Debug, Clone)]
pub struct FsCubeLoader {
    root: Utf8PathBuf,
}

impl FsCubeLoader {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn abs(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl CubeLoader for FsCubeLoader {
    fn load(&self, path: &Utf8Path) -> anyhow::Result<Cube> {
        let abs = self.abs(path);
        let contents = fs::read_to_string(&abs).with_context(|| format!("read {}", abs))?;
        let cube: Cube =
            serde_json::from_str(&contents).with_context(|| format!("parse cube {}", abs))?;
        cube.validate()
            .with_context(|| format!("inconsistent cube {}", abs))?;
        Ok(cube)
    }
}
