//! Dataset runner, extracted from the CLI.
//!
//! These entry points are I/O-agnostic: discovery goes through [`DatasetSource`], parsing
//! through [`CubeLoader`], and writing through [`WritePort`].

use crate::ports::{DatasetSource, VariableInput, WritePort};
use crate::settings::{DatasetSpec, LoadSettings};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use cmorfix_domain::{
    CubeLoader, FixPipeline, FixRegistry, PipelineError, PipelineOptions, VariableRequest,
};
use cmorfix_render::render_report_md;
use cmorfix_types::Cube;
use cmorfix_types::report::{
    DatasetReport, DatasetStatus, FailureInfo, LoadReport, ToolInfo, VariableReport,
    VariableStatus,
};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Error type for pipeline results. Exit code 2 = dataset failures, 1 = tool error.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{failed} of {total} datasets failed")]
    DatasetFailure { failed: u64, total: u64 },
    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

/// Reasons a whole dataset is skipped before any variable is loaded.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("multiple input files found for variable {short_name} in {project}/{dataset}: {}", join_paths(.paths))]
    DuplicateVariable {
        project: String,
        dataset: String,
        short_name: String,
        paths: Vec<Utf8PathBuf>,
    },
    #[error("list variables of {project}/{dataset}: {source:#}")]
    Discovery {
        project: String,
        dataset: String,
        #[source]
        source: anyhow::Error,
    },
}

fn join_paths(paths: &[Utf8PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A corrected cube waiting to be written.
#[derive(Debug, Clone)]
pub struct CorrectedCube {
    /// Path relative to the output directory.
    pub rel_path: Utf8PathBuf,
    pub cube: Cube,
}

/// Outcome of `run_load`.
#[derive(Debug)]
pub struct LoadOutcome {
    pub report: LoadReport,
    pub cubes: Vec<CorrectedCube>,
}

impl LoadOutcome {
    /// `Err(ToolError::DatasetFailure)` when any dataset failed or was aborted.
    pub fn check(&self) -> Result<(), ToolError> {
        if self.report.has_failures() {
            return Err(ToolError::DatasetFailure {
                failed: self.report.summary.datasets_failed,
                total: self.report.summary.datasets_total,
            });
        }
        Ok(())
    }
}

/// Output location of a corrected variable, relative to the output directory.
pub fn output_rel_path(project: &str, dataset: &str, short_name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(project)
        .join(dataset)
        .join(format!("{short_name}.json"))
}

/// Compile the disabled patterns and build the driver options.
pub fn pipeline_options(settings: &LoadSettings) -> anyhow::Result<PipelineOptions> {
    let disabled = settings
        .disabled
        .iter()
        .map(|p| glob::Pattern::new(p).with_context(|| format!("invalid disabled pattern '{p}'")))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(PipelineOptions {
        scratch_dir: settings.scratch_dir(),
        strict_resolution: settings.strict_resolution,
        disabled,
        check_contract: settings.check_contract,
    })
}

/// Run every configured dataset through the fix pipeline.
///
/// Datasets run on up to `settings.jobs` worker threads; the report keeps the configured order.
/// Dataset failures are recorded in the report, not returned; see [`LoadOutcome::check`].
pub fn run_load(
    settings: &LoadSettings,
    registry: &FixRegistry,
    source: &dyn DatasetSource,
    loader: &dyn CubeLoader,
    tool: ToolInfo,
) -> Result<LoadOutcome, ToolError> {
    let options = pipeline_options(settings)?;
    let pipeline = FixPipeline::new(registry, loader, options);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.jobs.max(1))
        .build()
        .context("build worker pool")?;

    let runs: Vec<DatasetRun> = pool.install(|| {
        settings
            .datasets
            .par_iter()
            .map(|spec| run_dataset(&pipeline, source, spec))
            .collect()
    });

    let mut report = LoadReport::new(tool);
    let mut cubes = Vec::new();
    for run in runs {
        report.datasets.push(run.report);
        cubes.extend(run.cubes);
    }
    report.finish();

    info!(
        datasets = report.summary.datasets_total,
        failed = report.summary.datasets_failed,
        variables = report.summary.variables_total,
        "load finished"
    );

    Ok(LoadOutcome { report, cubes })
}

/// Result of one dataset.
#[derive(Debug)]
pub struct DatasetRun {
    pub report: DatasetReport,
    pub cubes: Vec<CorrectedCube>,
}

/// Load every selected variable of one dataset.
///
/// Duplicate short names abort the dataset before anything is loaded. A failing variable does
/// not stop its siblings.
pub fn run_dataset(
    pipeline: &FixPipeline<'_>,
    source: &dyn DatasetSource,
    spec: &DatasetSpec,
) -> DatasetRun {
    let inputs = match select_inputs(source, spec) {
        Ok(inputs) => inputs,
        Err(err) => {
            warn!(project = %spec.project, dataset = %spec.dataset, error = %err, "dataset aborted");
            return DatasetRun {
                report: DatasetReport {
                    project: spec.project.clone(),
                    dataset: spec.dataset.clone(),
                    status: DatasetStatus::Aborted,
                    reason: Some(err.to_string()),
                    variables: vec![],
                },
                cubes: vec![],
            };
        }
    };

    let mut variables = Vec::new();
    let mut cubes = Vec::new();

    for wanted in missing_variables(spec, &inputs) {
        variables.push(VariableReport {
            short_name: wanted.clone(),
            source_path: String::new(),
            loaded_path: None,
            output_path: None,
            handler: None,
            status: VariableStatus::Failed,
            failure: Some(FailureInfo {
                stage: None,
                message: format!("no input file found for {wanted}"),
            }),
            metadata_digest: None,
        });
    }

    for input in &inputs {
        let req = VariableRequest::new(
            &spec.project,
            &spec.dataset,
            &input.short_name,
            input.path.clone(),
        );
        // One resolution per variable; its record is reported whether or not the load succeeds.
        let fix = pipeline.resolve(&req);
        match pipeline.run(&req, &fix) {
            Ok(outcome) => {
                let rel_path = output_rel_path(&spec.project, &spec.dataset, &input.short_name);
                debug!(variable = %input.short_name, output = %rel_path, "variable loaded");
                variables.push(VariableReport {
                    short_name: input.short_name.clone(),
                    source_path: input.path.to_string(),
                    loaded_path: Some(outcome.loaded_path.to_string()),
                    output_path: Some(rel_path.to_string()),
                    handler: Some(outcome.handler),
                    status: VariableStatus::Loaded,
                    failure: None,
                    metadata_digest: Some(outcome.cube.metadata_digest()),
                });
                cubes.push(CorrectedCube {
                    rel_path,
                    cube: outcome.cube,
                });
            }
            Err(err) => {
                warn!(variable = %input.short_name, error = %err, "variable failed");
                variables.push(VariableReport {
                    short_name: input.short_name.clone(),
                    source_path: input.path.to_string(),
                    loaded_path: None,
                    output_path: None,
                    handler: Some(fix.record()),
                    status: VariableStatus::Failed,
                    failure: Some(failure_info(&err)),
                    metadata_digest: None,
                });
            }
        }
    }

    let status = if variables.iter().all(|v| v.status == VariableStatus::Loaded) {
        DatasetStatus::Ok
    } else {
        DatasetStatus::Failed
    };

    DatasetRun {
        report: DatasetReport {
            project: spec.project.clone(),
            dataset: spec.dataset.clone(),
            status,
            reason: None,
            variables,
        },
        cubes,
    }
}

fn failure_info(err: &PipelineError) -> FailureInfo {
    FailureInfo {
        stage: err.stage(),
        message: err.to_string(),
    }
}

/// List the dataset's inputs, keep the requested ones and reject duplicate short names.
fn select_inputs(
    source: &dyn DatasetSource,
    spec: &DatasetSpec,
) -> Result<Vec<VariableInput>, DatasetError> {
    let mut inputs = source
        .list_variables(&spec.project, &spec.dataset)
        .map_err(|source| DatasetError::Discovery {
            project: spec.project.clone(),
            dataset: spec.dataset.clone(),
            source,
        })?;

    if !spec.variables.is_empty() {
        inputs.retain(|i| spec.variables.contains(&i.short_name));
    }

    let mut by_name: BTreeMap<&str, Vec<&Utf8PathBuf>> = BTreeMap::new();
    for input in &inputs {
        by_name
            .entry(input.short_name.as_str())
            .or_default()
            .push(&input.path);
    }
    if let Some((short_name, paths)) = by_name.into_iter().find(|(_, p)| p.len() > 1) {
        return Err(DatasetError::DuplicateVariable {
            project: spec.project.clone(),
            dataset: spec.dataset.clone(),
            short_name: short_name.to_string(),
            paths: paths.into_iter().cloned().collect(),
        });
    }

    Ok(inputs)
}

fn missing_variables<'a>(spec: &'a DatasetSpec, inputs: &[VariableInput]) -> Vec<&'a String> {
    spec.variables
        .iter()
        .filter(|v| !inputs.iter().any(|i| &i.short_name == *v))
        .collect()
}

/// Write corrected cubes, `report.json` and `report.md` to the output directory.
pub fn write_load_artifacts(
    outcome: &LoadOutcome,
    out_dir: &Utf8Path,
    writer: &dyn WritePort,
) -> anyhow::Result<()> {
    writer.create_dir_all(out_dir)?;

    for corrected in &outcome.cubes {
        let json = serde_json::to_string_pretty(&corrected.cube)
            .with_context(|| format!("serialize {}", corrected.rel_path))?;
        writer.write_file(&out_dir.join(&corrected.rel_path), json.as_bytes())?;
    }

    let report_json =
        serde_json::to_string_pretty(&outcome.report).context("serialize report")?;
    writer.write_file(&out_dir.join("report.json"), report_json.as_bytes())?;

    let report_md = render_report_md(&outcome.report);
    writer.write_file(&out_dir.join("report.md"), report_md.as_bytes())?;

    Ok(())
}
