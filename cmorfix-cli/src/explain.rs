//! Fix catalog helpers for the `cmorfix explain` and `cmorfix list-fixes` commands.
//!
//! The catalog is the built-in fix table of `cmorfix-domain`; nothing is duplicated here.

use cmorfix_domain::{FixMeta, builtin_fix_metas, lookup_fix_meta};
use cmorfix_types::Stage;

/// Look up a fix by `project/model/variable`. Hyphens and underscores are interchangeable.
pub fn lookup_fix(query: &str) -> Option<FixMeta> {
    lookup_fix_meta(query.trim())
}

/// Catalog keys as users type them (unnormalized).
pub fn list_fix_keys() -> Vec<String> {
    builtin_fix_metas().iter().map(display_key).collect()
}

pub fn display_key(meta: &FixMeta) -> String {
    format!("{}/{}/{}", meta.project, meta.model, meta.variable)
}

/// Comma separated stage names, e.g. `metadata, data`.
pub fn format_stages(stages: &[Stage]) -> String {
    stages
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn stage_meaning(stage: Stage) -> &'static str {
    match stage {
        Stage::File => {
            "Runs before the file is parsed. May write a repaired copy to the scratch \
             directory and return its path; the input file is never modified."
        }
        Stage::Metadata => {
            "Runs on the freshly loaded cube. Corrects names, units, attributes and \
             coordinates."
        }
        Stage::Data => {
            "Runs on the metadata-corrected cube. Corrects values; sees the units the \
             metadata stage produced."
        }
    }
}

/// Scope of a fix: one variable, or every variable of the model that has no fix of its own.
pub fn scope_label(meta: &FixMeta) -> &'static str {
    if meta.key().is_all_vars() {
        "variables without their own fix"
    } else {
        "single variable"
    }
}
