//! Request-side types: input files, options, and the schema catalog.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One raw SQL script, already materialized by the caller.
///
/// The engine performs no I/O; archive extraction and file reading happen
/// in the collaborator that constructs these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SqlFile {
    /// File name or relative path inside the uploaded bundle.
    pub name: String,
    /// Raw SQL text.
    pub content: String,
}

impl SqlFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Job name derived from the file: last path segment, extension stripped,
    /// lowercased. `etl/Job1.sql` becomes `job1`.
    pub fn job_name(&self) -> String {
        let base = self
            .name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.name.as_str());
        let stem = base.rsplit_once('.').map(|(s, _)| s).unwrap_or(base);
        stem.to_ascii_lowercase()
    }
}

/// Declared table schemas used to expand `SELECT *` projections.
///
/// Optional: without a catalog, a wildcard contributes no columns and is
/// not an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SchemaCatalog {
    /// Table name (lowercase) to declared columns, in declaration order.
    pub tables: BTreeMap<String, Vec<String>>,
}

impl SchemaCatalog {
    /// Looks up the declared columns of a table, case-insensitively.
    pub fn columns(&self, table: &str) -> Option<&[String]> {
        self.tables
            .get(&table.to_ascii_lowercase())
            .map(|cols| cols.as_slice())
    }
}

/// Default scheduling metadata stamped onto every assembled job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScheduleDefaults {
    /// DAG name; defaults to the workflow name when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dag_name: Option<String>,
    /// Business-day slot, e.g. "BD1".
    pub schedule_bd_day: String,
    /// Wall-clock slot, e.g. "20:00".
    pub schedule_hour: String,
}

impl Default for ScheduleDefaults {
    fn default() -> Self {
        Self {
            dag_name: None,
            schedule_bd_day: "BD1".to_string(),
            schedule_hour: "00:00".to_string(),
        }
    }
}

/// Engine configuration for one request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkflowOptions {
    /// Per-file size cap in bytes. Files above it are skipped with a warning
    /// before parsing is attempted. `None` disables the cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_bytes: Option<u64>,
    /// Optional schema catalog for `SELECT *` resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<SchemaCatalog>,
    /// Scheduling defaults applied during assembly.
    #[serde(default)]
    pub schedule: Option<ScheduleDefaults>,
}

/// A complete inference request: one workflow over a set of SQL files.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkflowRequest {
    /// Name of the resulting workflow, typically the archive stem.
    pub workflow_name: String,
    /// Input scripts; each yields at most one job.
    pub files: Vec<SqlFile>,
    #[serde(default)]
    pub options: WorkflowOptions,
}
