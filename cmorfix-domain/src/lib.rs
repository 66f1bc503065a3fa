//! Domain logic: resolve correction handlers for a (project, model, variable) triple and drive them
//! through the file, metadata and data stages.
//!
//! This crate owns *which* fix applies and the fixed stage order. Reading files is delegated to the
//! [`CubeLoader`] port; dataset discovery and artifact writing live in `cmorfix-core`.

mod error;
mod fixers;
mod pipeline;
mod ports;
mod registry;
mod resolved;

pub use error::{PipelineError, RegistryError, StageFailure};
pub use fixers::{builtin_fix_metas, lookup_fix_meta};
pub use pipeline::{FixPipeline, LoadOutcome, PipelineOptions, VariableRequest};
pub use ports::{CubeLoader, FsCubeLoader};
pub use registry::{FixRegistry, Resolution};
pub use resolved::ResolvedFix;

pub use cmorfix_fixer_api::{Fix, FixConstructor, FixMeta, NoopFix};
