use crate::stage::Stage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadReport {
    pub schema: String,
    pub tool: ToolInfo,
    pub run: RunInfo,

    #[serde(default)]
    pub datasets: Vec<DatasetReport>,

    #[serde(default)]
    pub summary: ReportSummary,
}

impl LoadReport {
    pub fn new(tool: ToolInfo) -> Self {
        Self {
            schema: crate::schema::CMORFIX_REPORT_V1.to_string(),
            tool,
            run: RunInfo {
                run_id: Uuid::new_v4(),
                started_at: Utc::now(),
                ended_at: None,
            },
            datasets: vec![],
            summary: ReportSummary::default(),
        }
    }

    /// Stamp the end time and recompute summary counts.
    pub fn finish(&mut self) {
        self.run.ended_at = Some(Utc::now());
        self.summary = ReportSummary::from_datasets(&self.datasets);
    }

    pub fn has_failures(&self) -> bool {
        self.datasets.iter().any(|d| d.status != DatasetStatus::Ok)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetStatus {
    /// Every variable loaded.
    Ok,
    /// At least one variable failed.
    Failed,
    /// Nothing was loaded (e.g. duplicate variable files).
    Aborted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetReport {
    pub project: String,
    pub dataset: String,
    pub status: DatasetStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default)]
    pub variables: Vec<VariableReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableStatus {
    Loaded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableReport {
    pub short_name: String,
    pub source_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loaded_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,

    /// What resolution produced; `None` when the variable never reached resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<HandlerRecord>,

    pub status: VariableStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_digest: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Absent,
    Found,
    Broken,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerRecord {
    /// Normalized `project/model/variable`.
    pub key: String,
    pub status: ResolutionStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureInfo {
    /// Stage that failed; `None` for loader or contract failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub datasets_total: u64,
    pub datasets_failed: u64,
    pub variables_total: u64,
    pub variables_loaded: u64,
    pub variables_failed: u64,
    pub handlers_applied: u64,
}

impl ReportSummary {
    pub fn from_datasets(datasets: &[DatasetReport]) -> Self {
        let mut s = ReportSummary {
            datasets_total: datasets.len() as u64,
            ..Default::default()
        };
        for d in datasets {
            if d.status != DatasetStatus::Ok {
                s.datasets_failed += 1;
            }
            for v in &d.variables {
                s.variables_total += 1;
                match v.status {
                    VariableStatus::Loaded => s.variables_loaded += 1,
                    VariableStatus::Failed => s.variables_failed += 1,
                }
                if v.status == VariableStatus::Loaded
                    && v.handler.as_ref().map(|h| h.status) == Some(ResolutionStatus::Found)
                {
                    s.handlers_applied += 1;
                }
            }
        }
        s
    }
}
