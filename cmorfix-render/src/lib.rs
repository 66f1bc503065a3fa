//! Rendering helpers (markdown) for human-readable artifacts.

use cmorfix_types::report::{
    DatasetStatus, LoadReport, ResolutionStatus, VariableReport, VariableStatus,
};

pub fn render_report_md(report: &LoadReport) -> String {
    let s = &report.summary;
    let mut out = String::new();
    out.push_str("# cmorfix load\n\n");
    out.push_str(&format!("- Run: `{}`\n", report.run.run_id));
    out.push_str(&format!(
        "- Datasets: {} (failed {})\n",
        s.datasets_total, s.datasets_failed
    ));
    out.push_str(&format!(
        "- Variables: {} (loaded {}, failed {})\n",
        s.variables_total, s.variables_loaded, s.variables_failed
    ));
    out.push_str(&format!("- Fixes applied: {}\n\n", s.handlers_applied));

    out.push_str("## Datasets\n\n");
    if report.datasets.is_empty() {
        out.push_str("_No datasets configured._\n");
        return out;
    }

    for ds in &report.datasets {
        out.push_str(&format!("### {}/{}\n\n", ds.project, ds.dataset));
        out.push_str(&format!("- Status: `{}`\n", dataset_label(ds.status)));
        if let Some(reason) = &ds.reason {
            out.push_str(&format!("- Reason: {}\n", reason));
        }
        if !ds.variables.is_empty() {
            out.push_str("\n| Variable | Status | Fix | Output |\n");
            out.push_str("|---|---|---|---|\n");
            for v in &ds.variables {
                out.push_str(&format!(
                    "| `{}` | {} | {} | {} |\n",
                    v.short_name,
                    variable_label(v.status),
                    fixes_cell(v),
                    v.output_path.as_deref().unwrap_or("-"),
                ));
            }

            let failures: Vec<_> = ds
                .variables
                .iter()
                .filter_map(|v| v.failure.as_ref().map(|f| (v, f)))
                .collect();
            if !failures.is_empty() {
                out.push_str("\n**Failures**\n\n");
                for (v, f) in failures {
                    let stage = f.stage.map(|s| s.as_str()).unwrap_or("load");
                    out.push_str(&format!(
                        "- `{}` ({}): {}\n",
                        v.short_name, stage, f.message
                    ));
                }
            }
        }
        out.push('\n');
    }

    out
}

/// Key of the handler that ran, the skip reason, or `-`.
fn fixes_cell(v: &VariableReport) -> String {
    match &v.handler {
        Some(h) => match h.status {
            ResolutionStatus::Found => format!("`{}`", h.key),
            ResolutionStatus::Broken => format!("`{}` (broken, skipped)", h.key),
            ResolutionStatus::Disabled => format!("`{}` (disabled)", h.key),
            ResolutionStatus::Absent => "-".to_string(),
        },
        None => "-".to_string(),
    }
}

fn dataset_label(s: DatasetStatus) -> &'static str {
    match s {
        DatasetStatus::Ok => "ok",
        DatasetStatus::Failed => "failed",
        DatasetStatus::Aborted => "aborted",
    }
}

fn variable_label(s: VariableStatus) -> &'static str {
    match s {
        VariableStatus::Loaded => "loaded",
        VariableStatus::Failed => "failed",
    }
}
