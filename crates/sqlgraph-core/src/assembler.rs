//! Workflow assembly: already-validated jobs to the final ordered spec.
//!
//! Pure assembly over resolved data; no further inference happens here.

use crate::resolver::ResolvedJob;
use crate::types::{Job, JobType, ScheduleDefaults, WorkflowSpec};

/// Builds the immutable [`WorkflowSpec`] from scored, resolved jobs.
///
/// Stamps `job_type` (`Ingest` for dependency-free jobs, `Transform`
/// otherwise), fills scheduling metadata from the configured defaults, and
/// sorts jobs by `(rank, job_name)`.
pub fn assemble(
    workflow_name: &str,
    jobs: Vec<(ResolvedJob, u8)>,
    defaults: &ScheduleDefaults,
) -> WorkflowSpec {
    let dag_name = defaults
        .dag_name
        .clone()
        .unwrap_or_else(|| workflow_name.to_string());

    let mut jobs: Vec<Job> = jobs
        .into_iter()
        .map(|(resolved, impact)| {
            let job_type = if resolved.dependencies.is_empty() {
                JobType::Ingest
            } else {
                JobType::Transform
            };
            Job {
                job_name: resolved.lineage.job_name,
                job_type,
                dag_name: dag_name.clone(),
                schedule_bd_day: defaults.schedule_bd_day.clone(),
                schedule_hour: defaults.schedule_hour.clone(),
                rank: resolved.rank,
                dependencies: resolved.dependencies,
                tables: resolved.lineage.tables,
                columns: resolved.lineage.columns,
                inner_join: resolved.lineage.inner_join,
                left_join: resolved.lineage.left_join,
                right_join: resolved.lineage.right_join,
                impact,
            }
        })
        .collect();

    jobs.sort_by(|a, b| (a.rank, &a.job_name).cmp(&(b.rank, &b.job_name)));

    WorkflowSpec {
        workflow_name: workflow_name.to_string(),
        jobs,
    }
}
