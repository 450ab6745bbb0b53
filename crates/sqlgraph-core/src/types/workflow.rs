//! Workflow output types: jobs, join clauses, and the assembled spec.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::ParseError;

/// One join clause observed in a job's SQL.
///
/// `tables_used` is the ordered pair of relations being joined (canonical
/// table names, or a job name when the relation is an upstream job's output).
/// `attr_list` enumerates the shared join-key columns in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct JoinClause {
    #[serde(rename = "tablesUsed")]
    pub tables_used: [String; 2],
    pub attr_list: Vec<String>,
}

/// Extraction result for a single parsed SQL statement.
///
/// Transient: statements belonging to one file are merged into a
/// [`JobLineage`] before resolution begins.
#[derive(Debug, Clone, Default)]
pub struct StatementSummary {
    /// Source relations referenced by the statement (lowercased).
    pub tables: BTreeSet<String>,
    /// Columns observed per relation, first-seen order, deduplicated.
    pub columns: BTreeMap<String, Vec<String>>,
    /// Relations projected with a wildcard, pending catalog expansion.
    pub wildcard_tables: BTreeSet<String>,
    pub inner_join: Vec<JoinClause>,
    pub left_join: Vec<JoinClause>,
    pub right_join: Vec<JoinClause>,
}

impl StatementSummary {
    /// Records a column for a relation, preserving first-seen order.
    pub fn add_column(&mut self, table: &str, column: &str) {
        let cols = self.columns.entry(table.to_string()).or_default();
        if !cols.iter().any(|c| c == column) {
            cols.push(column.to_string());
        }
    }
}

/// Merged lineage for one file (= one job), before dependency resolution.
#[derive(Debug, Clone, Default)]
pub struct JobLineage {
    pub job_name: String,
    pub tables: BTreeSet<String>,
    pub columns: BTreeMap<String, Vec<String>>,
    pub inner_join: Vec<JoinClause>,
    pub left_join: Vec<JoinClause>,
    pub right_join: Vec<JoinClause>,
    /// Total token count across the file's statements.
    pub token_count: usize,
}

/// Scheduling classification of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum JobType {
    /// No upstream jobs; reads raw source tables only.
    Ingest,
    /// Consumes at least one upstream job's output.
    Transform,
}

/// One node of the assembled workflow graph.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    pub job_name: String,
    pub job_type: JobType,
    pub dag_name: String,
    pub schedule_bd_day: String,
    pub schedule_hour: String,
    /// Topological depth; 1 for jobs with no dependencies.
    pub rank: u32,
    /// Names of upstream jobs this job reads from.
    pub dependencies: BTreeSet<String>,
    /// Raw source tables (virtual table references excluded).
    pub tables: BTreeSet<String>,
    /// Columns touched per relation; keys may include dependency job names.
    pub columns: BTreeMap<String, Vec<String>>,
    pub inner_join: Vec<JoinClause>,
    pub left_join: Vec<JoinClause>,
    pub right_join: Vec<JoinClause>,
    /// Deterministic downstream-significance estimate in [0, 100].
    pub impact: u8,
}

/// The final assembled workflow: jobs ordered by `(rank, job_name)`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkflowSpec {
    pub workflow_name: String,
    pub jobs: Vec<Job>,
}

/// Success payload: the spec plus per-file warnings that did not block
/// resolution. Warnings are stable-sorted by file name.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkflowResponse {
    #[serde(flatten)]
    pub spec: WorkflowSpec,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ParseError>,
}
