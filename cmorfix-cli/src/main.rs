mod config;
mod explain;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use cmorfix_core::adapters::{FsDatasetSource, FsWritePort};
use cmorfix_core::pipeline::{ToolError, run_load, write_load_artifacts};
use cmorfix_domain::{FixRegistry, FsCubeLoader, ResolvedFix};
use cmorfix_types::HandlerKey;
use cmorfix_types::report::ToolInfo;
use config::{ConfigMerger, LoadOverrides};
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "cmorfix",
    version,
    about = "Resolve and apply dataset-specific fixes to climate model variables."
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load datasets with their fixes applied and write corrected cubes plus a report.
    Load(LoadArgs),
    /// Show which fixes apply to a project/model/variable triple.
    Resolve(ResolveArgs),
    /// Explain what a built-in fix does and which stages it touches.
    Explain(ExplainArgs),
    /// List all built-in fixes.
    ListFixes(ListFixesArgs),
}

#[derive(Debug, Parser)]
struct LoadArgs {
    /// Root directory holding cmorfix.toml (default: current directory).
    #[arg(long, default_value = ".")]
    root: Utf8PathBuf,

    /// Directory with <project>/<dataset>/*.json inputs (default: <root>/data).
    #[arg(long)]
    data_root: Option<Utf8PathBuf>,

    /// Output directory for corrected cubes and the report (default: <root>/artifacts/cmorfix).
    #[arg(long)]
    out_dir: Option<Utf8PathBuf>,

    /// Scratch directory for repaired file copies (default: <out_dir>/scratch).
    #[arg(long)]
    scratch_dir: Option<Utf8PathBuf>,

    /// Dataset to load, as PROJECT/DATASET or PROJECT/DATASET:var1,var2.
    /// Replaces the datasets from cmorfix.toml.
    #[arg(long = "dataset")]
    datasets: Vec<String>,

    /// Glob pattern over project/model/variable of fixes to skip.
    #[arg(long)]
    disable: Vec<String>,

    /// Fail a variable when a registered fix cannot be constructed.
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Skip the output check after the data stage.
    #[arg(long, default_value_t = false)]
    no_contract_check: bool,

    /// Number of datasets processed in parallel.
    #[arg(long)]
    jobs: Option<usize>,
}

#[derive(Debug, Parser)]
struct ResolveArgs {
    project: String,
    model: String,
    variable: String,

    /// Root directory holding cmorfix.toml (default: current directory).
    #[arg(long, default_value = ".")]
    root: Utf8PathBuf,

    /// Glob pattern over project/model/variable of fixes to skip.
    #[arg(long)]
    disable: Vec<String>,

    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Parser)]
struct ExplainArgs {
    /// Fix key to explain (e.g., "CMIP6/CESM2/tas").
    fix_key: String,
}

#[derive(Debug, Parser)]
struct ListFixesArgs {
    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    match real_main() {
        Ok(()) => ExitCode::from(0),
        Err(ToolError::DatasetFailure { failed, total }) => {
            error!("{} of {} datasets failed; see the report", failed, total);
            ExitCode::from(2)
        }
        Err(ToolError::Internal(e)) => {
            error!("{:?}", e);
            ExitCode::from(1)
        }
    }
}

fn real_main() -> Result<(), ToolError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Load(args) => cmd_load(args),
        Command::Resolve(args) => Ok(cmd_resolve(args)?),
        Command::Explain(args) => Ok(cmd_explain(args)?),
        Command::ListFixes(args) => Ok(cmd_list_fixes(args)?),
    }
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "cmorfix".to_string(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    }
}

fn cmd_load(args: LoadArgs) -> Result<(), ToolError> {
    let root = args.root;

    // Load config file and merge with CLI arguments
    let file_config = config::load_or_default(&root).context("load cmorfix.toml config")?;
    let datasets = args
        .datasets
        .iter()
        .map(|d| config::parse_dataset_arg(d))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let overrides = LoadOverrides {
        data_root: args.data_root,
        out_dir: args.out_dir,
        scratch_dir: args.scratch_dir,
        strict: args.strict,
        disable: args.disable,
        no_contract_check: args.no_contract_check,
        jobs: args.jobs,
        datasets,
    };
    let settings = ConfigMerger::new(file_config).merge_load_args(&root, &overrides);

    debug!(
        "merged config: data_root={}, out_dir={}, strict={}, disabled={:?}, jobs={}",
        settings.data_root,
        settings.out_dir,
        settings.strict_resolution,
        settings.disabled,
        settings.jobs
    );

    if settings.datasets.is_empty() {
        return Err(anyhow::anyhow!(
            "no datasets to load; pass --dataset PROJECT/DATASET or add [[datasets]] to cmorfix.toml"
        )
        .into());
    }

    let registry = FixRegistry::builtin();
    let source = FsDatasetSource::new(settings.data_root.clone());
    // Discovered and repaired paths already carry their directories.
    let loader = FsCubeLoader::new(Utf8PathBuf::from("."));

    let outcome = run_load(&settings, &registry, &source, &loader, tool_info())?;
    write_load_artifacts(&outcome, &settings.out_dir, &FsWritePort)
        .context("write load artifacts")?;

    info!("wrote report to {}", settings.out_dir);
    println!(
        "loaded {} of {} variables across {} datasets; report at {}",
        outcome.report.summary.variables_loaded,
        outcome.report.summary.variables_total,
        outcome.report.summary.datasets_total,
        settings.out_dir.join("report.md")
    );

    outcome.check()
}

fn cmd_resolve(args: ResolveArgs) -> anyhow::Result<()> {
    let file_config = config::load_or_default(&args.root).context("load cmorfix.toml config")?;
    let disabled = ConfigMerger::new(file_config)
        .merge_disabled(&args.disable)
        .iter()
        .map(|p| glob::Pattern::new(p).with_context(|| format!("invalid disabled pattern '{p}'")))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let registry = FixRegistry::builtin();
    let fix = ResolvedFix::resolve(
        &registry,
        &args.project,
        &args.model,
        &args.variable,
        &disabled,
    );
    let key = HandlerKey::new(&args.project, &args.model, &args.variable);

    match args.format {
        OutputFormat::Text => {
            println!("Lookup key: {}", key);
            let detail = fix.detail().map(|d| format!("  ({})", d)).unwrap_or_default();
            println!(
                "Fix:        {} {}{}",
                fix.key(),
                status_label(fix.status()),
                detail
            );
            println!();
            if fix.is_identity() {
                println!("No fix applies; all stages are identity.");
            } else if fix.key() != &key {
                println!("The dataset-wide fix of {}/{} applies.", key.project, key.model);
            } else {
                println!("The variable fix applies.");
            }
        }
        OutputFormat::Json => {
            let out = serde_json::json!({
                "key": key,
                "handler": fix.record(),
                "identity": fix.is_identity(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}

fn status_label(status: cmorfix_types::report::ResolutionStatus) -> &'static str {
    use cmorfix_types::report::ResolutionStatus;
    match status {
        ResolutionStatus::Absent => "absent",
        ResolutionStatus::Found => "found",
        ResolutionStatus::Broken => "broken",
        ResolutionStatus::Disabled => "disabled",
    }
}

fn cmd_explain(args: ExplainArgs) -> anyhow::Result<()> {
    use explain::{
        display_key, format_stages, list_fix_keys, lookup_fix, scope_label, stage_meaning,
    };

    let Some(fix) = lookup_fix(&args.fix_key) else {
        let available = list_fix_keys().join(", ");
        anyhow::bail!(
            "Unknown fix key: '{}'\n\nAvailable fixes: {}",
            args.fix_key,
            available
        );
    };

    println!("================================================================================");
    println!("FIX: {}", fix.title);
    println!("================================================================================");
    println!();
    println!("Key:         {}", display_key(&fix));
    println!("Lookup key:  {}", fix.key());
    println!("Scope:       {}", scope_label(&fix));
    println!("Stages:      {}", format_stages(fix.stages));
    println!();

    println!("DESCRIPTION");
    println!("--------------------------------------------------------------------------------");
    println!("{}", fix.description);
    println!();

    for stage in fix.stages {
        println!("STAGE: {}", stage);
        println!("--------------------------------------------------------------------------------");
        println!("{}", stage_meaning(*stage));
        println!();
    }

    Ok(())
}

fn cmd_list_fixes(args: ListFixesArgs) -> anyhow::Result<()> {
    use explain::{display_key, format_stages};

    let fixes = cmorfix_domain::builtin_fix_metas();
    match args.format {
        OutputFormat::Text => {
            println!("Available fixes:\n");
            println!("  {:<28} {:<16} TITLE", "KEY", "STAGES");
            println!("  {:<28} {:<16} -----", "---", "------");
            for fix in &fixes {
                println!(
                    "  {:<28} {:<16} {}",
                    display_key(fix),
                    format_stages(fix.stages),
                    fix.title
                );
            }
            println!();
            println!("Use 'cmorfix explain <key>' for details.");
        }
        OutputFormat::Json => {
            let out: Vec<_> = fixes
                .iter()
                .map(|f| {
                    serde_json::json!({
                        "key": display_key(f),
                        "lookup_key": f.key(),
                        "title": f.title,
                        "stages": f.stages,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}
