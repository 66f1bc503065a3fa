use serde::{Deserialize, Serialize};
use std::fmt;

/// Variable token under which dataset-wide handlers are registered.
pub const ALL_VARS: &str = "allvars";

/// Canonicalize a project, model or variable name into a lookup token.
///
/// Every `-` becomes `_`; all other characters, including case, are kept.
pub fn normalize(token: &str) -> String {
    token.replace('-', "_")
}

/// Normalized (project, model, variable) triple used to address a fix handler.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HandlerKey {
    pub project: String,
    pub model: String,
    pub variable: String,
}

impl HandlerKey {
    pub fn new(project: &str, model: &str, variable: &str) -> Self {
        Self {
            project: normalize(project),
            model: normalize(model),
            variable: normalize(variable),
        }
    }

    /// Key of the dataset-wide handler for `project`/`model`.
    pub fn all_vars(project: &str, model: &str) -> Self {
        Self::new(project, model, ALL_VARS)
    }

    pub fn is_all_vars(&self) -> bool {
        self.variable == ALL_VARS
    }

    /// Parse `project/model/variable`. Returns `None` unless there are exactly three parts.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split('/');
        let project = parts.next()?;
        let model = parts.next()?;
        let variable = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(project, model, variable))
    }
}

impl fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.project, self.model, self.variable)
    }
}
