//! Contracts shared by every correction handler.
//!
//! A handler corrects one quirk of one dataset. It overrides only the stages it needs; the rest are
//! identity. Stages are driven in a fixed order by `cmorfix-domain`:
//!
//! 1. [`Fix::fix_file`] before the loader parses anything,
//! 2. [`Fix::fix_metadata`] on the freshly loaded cube,
//! 3. [`Fix::fix_data`] on the metadata-corrected cube.

use camino::{Utf8Path, Utf8PathBuf};
use cmorfix_types::{Cube, Stage};

pub use cmorfix_types::HandlerKey;

/// A dataset-specific correction.
///
/// Handlers are constructed fresh for each load and dropped afterwards, so they may keep local
/// state but must not rely on it surviving between loads.
pub trait Fix: Send {
    /// Return the path the loader should open instead of `path`.
    ///
    /// Repaired copies go under `output_dir`; the input file is never modified in place.
    fn fix_file(&self, path: &Utf8Path, output_dir: &Utf8Path) -> anyhow::Result<Utf8PathBuf> {
        let _ = output_dir;
        Ok(path.to_path_buf())
    }

    fn fix_metadata(&self, cube: Cube) -> anyhow::Result<Cube> {
        Ok(cube)
    }

    fn fix_data(&self, cube: Cube) -> anyhow::Result<Cube> {
        Ok(cube)
    }

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Handler constructor as stored in a registry.
///
/// An `Err` means the handler exists but cannot be built.
pub type FixConstructor = fn() -> anyhow::Result<Box<dyn Fix>>;

/// Catalog entry describing a built-in handler.
#[derive(Debug, Clone, Copy)]
pub struct FixMeta {
    pub project: &'static str,
    pub model: &'static str,
    pub variable: &'static str,
    /// Stages the handler overrides.
    pub stages: &'static [Stage],
    pub title: &'static str,
    pub description: &'static str,
}

impl FixMeta {
    pub fn key(&self) -> HandlerKey {
        HandlerKey::new(self.project, self.model, self.variable)
    }

    pub fn overrides(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }
}

/// Handler that changes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFix;

impl Fix for NoopFix {}
