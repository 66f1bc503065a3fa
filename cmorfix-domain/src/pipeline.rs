use crate::error::PipelineError;
use crate::ports::CubeLoader;
use crate::registry::FixRegistry;
use crate::resolved::ResolvedFix;
use camino::{Utf8Path, Utf8PathBuf};
use cmorfix_types::Cube;
use cmorfix_types::report::{HandlerRecord, ResolutionStatus};
use glob::Pattern;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Where file-stage fixes write repaired copies.
    pub scratch_dir: Utf8PathBuf,
    /// Fail the load when a registered handler cannot be constructed.
    pub strict_resolution: bool,
    /// Patterns over `project/model/variable`; matching fixes are skipped.
    pub disabled: Vec<Pattern>,
    /// Verify the output cube after the data stage.
    pub check_contract: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            scratch_dir: Utf8PathBuf::from("artifacts/cmorfix/scratch"),
            strict_resolution: false,
            disabled: Vec::new(),
            check_contract: true,
        }
    }
}

/// One variable to load.
#[derive(Debug, Clone)]
pub struct VariableRequest {
    pub project: String,
    pub model: String,
    pub variable: String,
    pub path: Utf8PathBuf,
}

impl VariableRequest {
    pub fn new(project: &str, model: &str, variable: &str, path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            project: project.to_string(),
            model: model.to_string(),
            variable: variable.to_string(),
            path: path.into(),
        }
    }
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub cube: Cube,
    /// Path the loader actually opened.
    pub loaded_path: Utf8PathBuf,
    pub handler: HandlerRecord,
}

/// Drives file, metadata and data correction for single variables.
pub struct FixPipeline<'a> {
    registry: &'a FixRegistry,
    loader: &'a dyn CubeLoader,
    options: PipelineOptions,
}

impl<'a> FixPipeline<'a> {
    pub fn new(
        registry: &'a FixRegistry,
        loader: &'a dyn CubeLoader,
        options: PipelineOptions,
    ) -> Self {
        Self {
            registry,
            loader,
            options,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Resolve the handler for `req` honoring the disabled patterns.
    pub fn resolve(&self, req: &VariableRequest) -> ResolvedFix {
        ResolvedFix::resolve(
            self.registry,
            &req.project,
            &req.model,
            &req.variable,
            &self.options.disabled,
        )
    }

    /// Load one variable with its fix applied.
    ///
    /// Stage errors are returned as-is; nothing is retried.
    pub fn load(&self, req: &VariableRequest) -> Result<LoadOutcome, PipelineError> {
        let fix = self.resolve(req);
        self.run(req, &fix)
    }

    /// Run the stages of an already resolved handler. Callers that need the resolution record
    /// when the load fails resolve once and keep `fix`.
    pub fn run(
        &self,
        req: &VariableRequest,
        fix: &ResolvedFix,
    ) -> Result<LoadOutcome, PipelineError> {
        if self.options.strict_resolution && fix.status() == ResolutionStatus::Broken {
            return Err(PipelineError::BrokenHandler {
                key: fix.key().clone(),
                reason: fix.detail().unwrap_or_default().to_string(),
            });
        }

        debug!(
            project = %req.project,
            model = %req.model,
            variable = %req.variable,
            key = %fix.key(),
            status = ?fix.status(),
            "resolved fix"
        );

        let loaded_path = fix.fix_file(&req.path, &self.options.scratch_dir)?;
        if loaded_path != req.path {
            info!(from = %req.path, to = %loaded_path, "file fix redirected load");
        }

        let raw = self
            .loader
            .load(&loaded_path)
            .map_err(|source| PipelineError::Load {
                path: loaded_path.clone(),
                source,
            })?;

        let cube = fix.fix_metadata(raw)?;
        let reference = self.options.check_contract.then(|| ContractReference::of(&cube));
        let cube = fix.fix_data(cube)?;

        if let Some(reference) = reference {
            reference.check(&req.variable, &cube)?;
        }

        Ok(LoadOutcome {
            cube,
            loaded_path,
            handler: fix.record(),
        })
    }
}

/// What the data stage must preserve from the metadata stage's output.
struct ContractReference {
    ndim: usize,
    has_time: bool,
}

impl ContractReference {
    fn of(cube: &Cube) -> Self {
        Self {
            ndim: cube.ndim(),
            has_time: cube.has_dim("time"),
        }
    }

    fn check(&self, variable: &str, cube: &Cube) -> Result<(), PipelineError> {
        let violation = |message: String| PipelineError::Contract {
            variable: variable.to_string(),
            message,
        };
        cube.validate().map_err(|e| violation(e.to_string()))?;
        if cube.ndim() != self.ndim {
            return Err(violation(format!(
                "data stage changed dimensionality from {} to {}",
                self.ndim,
                cube.ndim()
            )));
        }
        if self.has_time && !cube.has_dim("time") {
            return Err(violation("data stage dropped the time coordinate".to_string()));
        }
        Ok(())
    }
}

/// Absolute scratch path for a repaired copy of `path`.
pub(crate) fn repaired_path(path: &Utf8Path, output_dir: &Utf8Path, suffix: &str) -> Utf8PathBuf {
    let stem = path.file_stem().unwrap_or("cube");
    let ext = path.extension().unwrap_or("json");
    output_dir.join(format!("{stem}.{suffix}.{ext}"))
}
