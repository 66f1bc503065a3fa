use crate::error::StageFailure;
use crate::registry::{FixRegistry, Resolution};
use camino::{Utf8Path, Utf8PathBuf};
use cmorfix_fixer_api::Fix;
use cmorfix_types::report::{HandlerRecord, ResolutionStatus};
use cmorfix_types::{Cube, HandlerKey, Stage};
use glob::Pattern;
use tracing::{debug, warn};

/// The handler resolved for one variable load, owned for the duration of that load.
///
/// Built from a single registry resolution. With no usable handler every stage is the identity.
pub struct ResolvedFix {
    project: String,
    model: String,
    variable: String,
    /// Requested key, or the registration that served it.
    key: HandlerKey,
    status: ResolutionStatus,
    detail: Option<String>,
    handler: Option<Box<dyn Fix>>,
}

impl std::fmt::Debug for ResolvedFix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedFix")
            .field("key", &self.key)
            .field("status", &self.status)
            .field("detail", &self.detail)
            .field("handler", &self.handler.as_ref().map(|h| h.name()))
            .finish()
    }
}

impl ResolvedFix {
    /// Resolve a requested triple. A registration matching a `disabled` pattern is skipped
    /// without constructing its handler.
    pub fn resolve(
        registry: &FixRegistry,
        project: &str,
        model: &str,
        variable: &str,
        disabled: &[Pattern],
    ) -> Self {
        let requested = HandlerKey::new(project, model, variable);
        let mut resolved = Self {
            project: project.to_string(),
            model: model.to_string(),
            variable: variable.to_string(),
            key: requested,
            status: ResolutionStatus::Absent,
            detail: None,
            handler: None,
        };

        let Some(matched) = registry.lookup(&resolved.key) else {
            return resolved;
        };
        let text = matched.to_string();
        if let Some(p) = disabled.iter().find(|p| p.matches(&text)) {
            debug!(key = %matched, pattern = %p, "fix disabled by policy");
            resolved.key = matched.clone();
            resolved.status = ResolutionStatus::Disabled;
            resolved.detail = Some(format!("disabled by '{}'", p));
            return resolved;
        }

        match registry.resolve_key(&resolved.key) {
            Resolution::Absent => {}
            Resolution::Found { key, handler } => {
                resolved.key = key;
                resolved.status = ResolutionStatus::Found;
                resolved.detail = Some(handler.name().to_string());
                resolved.handler = Some(handler);
            }
            Resolution::Broken { key, reason } => {
                warn!(key = %key, reason = %reason, "fix is registered but cannot be constructed");
                resolved.key = key;
                resolved.status = ResolutionStatus::Broken;
                resolved.detail = Some(reason);
            }
        }
        resolved
    }

    pub fn key(&self) -> &HandlerKey {
        &self.key
    }

    pub fn status(&self) -> ResolutionStatus {
        self.status
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn handler(&self) -> Option<&dyn Fix> {
        self.handler.as_deref()
    }

    pub fn is_identity(&self) -> bool {
        self.handler.is_none()
    }

    pub fn record(&self) -> HandlerRecord {
        HandlerRecord {
            key: self.key.to_string(),
            status: self.status,
            detail: self.detail.clone(),
        }
    }

    pub fn fix_file(
        &self,
        path: &Utf8Path,
        output_dir: &Utf8Path,
    ) -> Result<Utf8PathBuf, StageFailure> {
        match self.handler() {
            Some(fix) => fix
                .fix_file(path, output_dir)
                .map_err(|source| self.failure(Stage::File, source)),
            None => Ok(path.to_path_buf()),
        }
    }

    pub fn fix_metadata(&self, cube: Cube) -> Result<Cube, StageFailure> {
        match self.handler() {
            Some(fix) => fix
                .fix_metadata(cube)
                .map_err(|source| self.failure(Stage::Metadata, source)),
            None => Ok(cube),
        }
    }

    pub fn fix_data(&self, cube: Cube) -> Result<Cube, StageFailure> {
        match self.handler() {
            Some(fix) => fix
                .fix_data(cube)
                .map_err(|source| self.failure(Stage::Data, source)),
            None => Ok(cube),
        }
    }

    fn failure(&self, stage: Stage, source: anyhow::Error) -> StageFailure {
        StageFailure {
            project: self.project.clone(),
            model: self.model.clone(),
            variable: self.variable.clone(),
            stage,
            handler: self.key.clone(),
            source,
        }
    }
}
