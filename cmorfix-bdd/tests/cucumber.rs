use camino::Utf8PathBuf;
use cmorfix_bdd::{parse_values, series_cube, write_input};
use cmorfix_core::adapters::FsDatasetSource;
use cmorfix_core::pipeline::{LoadOutcome, output_rel_path, run_load};
use cmorfix_core::settings::{DatasetSpec, LoadSettings};
use cmorfix_domain::{FixRegistry, FsCubeLoader, ResolvedFix};
use cmorfix_types::report::{DatasetStatus, ResolutionStatus, ToolInfo};
use cmorfix_types::{Coord, Cube, HandlerKey};
use cucumber::{World, given, then, when};
use fs_err as fs;
use std::collections::HashMap;
use tempfile::TempDir;

#[derive(Debug, Default, World)]
pub struct CmorfixWorld {
    temp: Option<TempDir>,
    data_root: Option<Utf8PathBuf>,
    registry: FixRegistry,
    disabled: Vec<String>,
    lookup_key: Option<HandlerKey>,
    resolved: Option<ResolvedFix>,
    originals: HashMap<Utf8PathBuf, String>,
    outcome: Option<LoadOutcome>,
}

impl CmorfixWorld {
    fn data_root(&self) -> &Utf8PathBuf {
        self.data_root.as_ref().expect("data root set")
    }

    fn resolved(&self) -> &ResolvedFix {
        self.resolved.as_ref().expect("resolved fix")
    }

    fn outcome(&self) -> &LoadOutcome {
        self.outcome.as_ref().expect("load ran")
    }

    fn cube(&self, variable: &str, dataset: &str) -> &Cube {
        let (project, name) = split_dataset(dataset);
        let rel = output_rel_path(project, name, variable);
        &self
            .outcome()
            .cubes
            .iter()
            .find(|c| c.rel_path == rel)
            .unwrap_or_else(|| panic!("no corrected cube at {rel}"))
            .cube
    }
}

fn split_dataset(text: &str) -> (&str, &str) {
    text.split_once('/').expect("PROJECT/DATASET")
}

// ── resolution ──────────────────────────────────────────────────────────

#[given("the built-in fix registry")]
async fn builtin_registry(world: &mut CmorfixWorld) {
    world.registry = FixRegistry::builtin();
}

#[given(expr = "fixes matching {string} are disabled")]
async fn fixes_disabled(world: &mut CmorfixWorld, pattern: String) {
    world.disabled.push(pattern);
}

#[when(expr = "I resolve {string} {string} {string}")]
async fn resolve(world: &mut CmorfixWorld, project: String, model: String, variable: String) {
    let disabled: Vec<glob::Pattern> = world
        .disabled
        .iter()
        .map(|p| glob::Pattern::new(p).expect("valid pattern"))
        .collect();
    world.lookup_key = Some(HandlerKey::new(&project, &model, &variable));
    world.resolved = Some(ResolvedFix::resolve(
        &world.registry,
        &project,
        &model,
        &variable,
        &disabled,
    ));
}

#[then(expr = "the lookup key is {string}")]
async fn lookup_key_is(world: &mut CmorfixWorld, expected: String) {
    let key = world.lookup_key.as_ref().expect("resolved");
    assert_eq!(key.to_string(), expected);
}

#[then("no fix applies")]
async fn no_fix_applies(world: &mut CmorfixWorld) {
    assert!(world.resolved().is_identity(), "{:?}", world.resolved());
}

#[then("a fix applies")]
async fn a_fix_applies(world: &mut CmorfixWorld) {
    assert!(!world.resolved().is_identity(), "{:?}", world.resolved());
}

#[then(expr = "the fix {string} is found")]
async fn fix_is_found(world: &mut CmorfixWorld, key: String) {
    assert_eq!(status_of(world.resolved(), &key), ResolutionStatus::Found);
}

#[then(expr = "the fix {string} is disabled")]
async fn fix_is_disabled(world: &mut CmorfixWorld, key: String) {
    assert_eq!(status_of(world.resolved(), &key), ResolutionStatus::Disabled);
}

fn status_of(resolved: &ResolvedFix, key: &str) -> ResolutionStatus {
    assert_eq!(resolved.key().to_string(), key, "{resolved:?}");
    resolved.status()
}

// ── loading ─────────────────────────────────────────────────────────────

#[given("a data root")]
async fn a_data_root(world: &mut CmorfixWorld) {
    let td = tempfile::tempdir().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).expect("utf8 tempdir");
    world.data_root = Some(root.join("data"));
    world.temp = Some(td);
}

#[given(expr = "dataset {string} has variable {string} in {string} with values {string}")]
async fn dataset_has_variable(
    world: &mut CmorfixWorld,
    dataset: String,
    variable: String,
    units: String,
    values: String,
) {
    let (project, name) = split_dataset(&dataset);
    let cube = series_cube(&variable, &units, &parse_values(&values));
    let file = format!("{variable}_Amon_{name}.json");
    write_input(world.data_root(), project, name, &file, &cube).expect("write input");
}

#[given(expr = "dataset {string} has a second {string} file")]
async fn dataset_has_second_file(world: &mut CmorfixWorld, dataset: String, variable: String) {
    let (project, name) = split_dataset(&dataset);
    let cube = series_cube(&variable, "K", &[1.0]);
    let file = format!("{variable}_day_{name}.json");
    write_input(world.data_root(), project, name, &file, &cube).expect("write input");
}

#[given(expr = "dataset {string} has a {string} file with inverted level bounds")]
async fn dataset_has_inverted_bounds(world: &mut CmorfixWorld, dataset: String, variable: String) {
    let (project, name) = split_dataset(&dataset);
    let cube = Cube::new(&variable, "%")
        .with_dim(Coord::new("time", "days since 2000-01-01", vec![0.0]))
        .with_dim(
            Coord::new("lev", "1", vec![0.9, 0.5]).with_bounds(vec![[1.0, 0.8], [0.6, 0.4]]),
        )
        .with_data(vec![10.0, 20.0]);
    let file = format!("{variable}_Amon_{name}.json");
    let path = write_input(world.data_root(), project, name, &file, &cube).expect("write input");
    let contents = fs::read_to_string(&path).expect("read input");
    world.originals.insert(path, contents);
}

#[when(expr = "I load dataset {string}")]
async fn load_dataset(world: &mut CmorfixWorld, dataset: String) {
    let (project, name) = split_dataset(&dataset);
    let data_root = world.data_root().clone();
    let out_dir = data_root
        .parent()
        .expect("data root has a parent")
        .join("out");

    let settings = LoadSettings {
        data_root: data_root.clone(),
        out_dir,
        disabled: world.disabled.clone(),
        datasets: vec![DatasetSpec::new(project, name)],
        ..Default::default()
    };
    let registry = FixRegistry::builtin();
    let tool = ToolInfo {
        name: "cmorfix".to_string(),
        version: None,
    };
    let outcome = run_load(
        &settings,
        &registry,
        &FsDatasetSource::new(data_root.clone()),
        &FsCubeLoader::new(data_root),
        tool,
    )
    .expect("run load");
    world.outcome = Some(outcome);
}

#[then("the load succeeds")]
async fn load_succeeds(world: &mut CmorfixWorld) {
    let outcome = world.outcome();
    assert!(outcome.check().is_ok(), "{:#?}", outcome.report.datasets);
}

#[then(expr = "variable {string} of {string} has units {string}")]
async fn variable_has_units(
    world: &mut CmorfixWorld,
    variable: String,
    dataset: String,
    units: String,
) {
    assert_eq!(world.cube(&variable, &dataset).units, units);
}

#[then(expr = "variable {string} of {string} has values {string}")]
async fn variable_has_values(
    world: &mut CmorfixWorld,
    variable: String,
    dataset: String,
    values: String,
) {
    assert_eq!(world.cube(&variable, &dataset).data, parse_values(&values));
}

#[then(expr = "the report counts {int} applied fixes")]
async fn report_counts_applied(world: &mut CmorfixWorld, n: u64) {
    assert_eq!(world.outcome().report.summary.handlers_applied, n);
}

#[then(expr = "dataset {string} is aborted with {string}")]
async fn dataset_aborted(world: &mut CmorfixWorld, dataset: String, reason: String) {
    let (project, name) = split_dataset(&dataset);
    let ds = world
        .outcome()
        .report
        .datasets
        .iter()
        .find(|d| d.project == project && d.dataset == name)
        .expect("dataset in report");
    assert_eq!(ds.status, DatasetStatus::Aborted);
    let actual = ds.reason.as_deref().unwrap_or_default();
    assert!(actual.contains(&reason), "reason was: {actual}");
}

#[then("no cubes are produced")]
async fn no_cubes(world: &mut CmorfixWorld) {
    assert!(world.outcome().cubes.is_empty());
}

#[then(expr = "variable {string} of {string} was loaded from the scratch directory")]
async fn loaded_from_scratch(world: &mut CmorfixWorld, variable: String, dataset: String) {
    let (project, name) = split_dataset(&dataset);
    let report = world
        .outcome()
        .report
        .datasets
        .iter()
        .find(|d| d.project == project && d.dataset == name)
        .and_then(|d| d.variables.iter().find(|v| v.short_name == variable))
        .expect("variable in report");
    let loaded = report.loaded_path.as_deref().expect("loaded path");
    assert!(loaded.contains("scratch"), "loaded from {loaded}");
    assert_ne!(loaded, report.source_path);
}

#[then(expr = "the original {string} file of {string} is unchanged")]
async fn original_unchanged(world: &mut CmorfixWorld, variable: String, dataset: String) {
    let (project, name) = split_dataset(&dataset);
    let path = world
        .data_root()
        .join(project)
        .join(name)
        .join(format!("{variable}_Amon_{name}.json"));
    let now = fs::read_to_string(&path).expect("read original");
    assert_eq!(Some(&now), world.originals.get(&path));
}

#[tokio::main]
async fn main() {
    let features_path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("features");
    CmorfixWorld::cucumber().run(features_path).await;
}
