use serde::{Deserialize, Serialize};
use std::fmt;

/// Correction stage. Stages always run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    File,
    Metadata,
    Data,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::File, Stage::Metadata, Stage::Data];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::File => "file",
            Stage::Metadata => "metadata",
            Stage::Data => "data",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
