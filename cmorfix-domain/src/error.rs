//! Error types for cmorfix-domain.
//!
//! Resolution problems are not errors here: absent and broken handlers are values of
//! [`Resolution`](crate::Resolution). What is left are failures that must stop a load:
//! - a handler stage that raised (`StageFailure`),
//! - the loader or the output contract,
//! - a broken handler when strict resolution is requested.

use camino::Utf8PathBuf;
use cmorfix_types::{HandlerKey, Stage};
use thiserror::Error;

/// Errors raised while building a registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("a fix is already registered for {key}")]
    Duplicate { key: HandlerKey },
}

/// A resolved handler failed inside one of its stages.
#[derive(Debug, Error)]
#[error("{stage} fix {handler} failed for {project}/{model}/{variable}: {source:#}")]
pub struct StageFailure {
    /// Names as requested, before normalization.
    pub project: String,
    pub model: String,
    pub variable: String,
    pub stage: Stage,
    /// Key of the handler that failed.
    pub handler: HandlerKey,
    #[source]
    pub source: anyhow::Error,
}

/// Why a single variable load stopped.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Stage(#[from] StageFailure),

    #[error("load {path}: {source:#}")]
    Load {
        path: Utf8PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("fix {key} is registered but cannot be constructed: {reason}")]
    BrokenHandler { key: HandlerKey, reason: String },

    #[error("output contract violated for {variable}: {message}")]
    Contract { variable: String, message: String },
}

impl PipelineError {
    /// Stage that failed, if the failure came from a handler stage.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Stage(f) => Some(f.stage),
            _ => None,
        }
    }
}
