//! Engine entry point: files in, assembled workflow out.
//!
//! Per-file parse failures are isolated and reported as warnings alongside a
//! still-usable graph. Graph-level failures (cycle, unusable input) abort the
//! whole request; callers never see a partially ranked spec.

use crate::error::{InputError, ParseError, WorkflowError};
use crate::types::{
    JobLineage, ScheduleDefaults, SqlFile, WorkflowOptions, WorkflowRequest, WorkflowResponse,
};
use crate::{assembler, lineage, parser, resolver, scorer};
#[cfg(feature = "tracing")]
use tracing::info_span;

/// Parses one file and extracts its merged job lineage.
///
/// Files over the configured size cap are rejected before parsing is
/// attempted. This is the unit of parallelism: each file is independent, so
/// callers may fan these out across workers and feed the results to
/// [`resolve_and_assemble`].
pub fn extract_file(file: &SqlFile, options: &WorkflowOptions) -> Result<JobLineage, ParseError> {
    if let Some(cap) = options.max_file_bytes {
        let bytes = file.content.len() as u64;
        if bytes > cap {
            return Err(ParseError::file_too_large(&file.name, bytes, cap));
        }
    }
    let statements = parser::summarize_file(file)?;
    Ok(lineage::merge_statements(
        file.job_name(),
        statements,
        options.catalog.as_ref(),
        parser::count_tokens(&file.content),
    ))
}

/// Resolves dependencies, scores, and assembles the final spec.
///
/// Runs single-threaded over the complete job set; resolution cannot start
/// until every file's lineage is known.
pub fn resolve_and_assemble(
    workflow_name: &str,
    lineages: Vec<JobLineage>,
    mut warnings: Vec<ParseError>,
    schedule: &ScheduleDefaults,
) -> Result<WorkflowResponse, WorkflowError> {
    // Stable order so identical inputs serialize identically and so the
    // all-failed summary below is deterministic.
    warnings.sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));

    if lineages.is_empty() {
        let summary = if warnings.is_empty() {
            "no SQL files were given".to_string()
        } else {
            warnings
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        };
        return Err(InputError::NoUsableFiles { summary }.into());
    }

    let resolved = resolver::resolve(lineages)?;
    let scored = resolved
        .into_iter()
        .map(|job| {
            let impact = scorer::impact(&job.lineage);
            (job, impact)
        })
        .collect();
    let spec = assembler::assemble(workflow_name, scored, schedule);

    Ok(WorkflowResponse { spec, warnings })
}

/// Main entry point: one request, one workflow.
pub fn build_workflow(request: &WorkflowRequest) -> Result<WorkflowResponse, WorkflowError> {
    #[cfg(feature = "tracing")]
    let _span = info_span!("build_workflow", files = request.files.len()).entered();

    if request.files.is_empty() {
        return Err(InputError::EmptyArchive.into());
    }

    let mut lineages = Vec::new();
    let mut warnings = Vec::new();
    for file in &request.files {
        match extract_file(file, &request.options) {
            Ok(lineage) => lineages.push(lineage),
            Err(warning) => warnings.push(warning),
        }
    }

    let schedule = request.options.schedule.clone().unwrap_or_default();
    resolve_and_assemble(&request.workflow_name, lineages, warnings, &schedule)
}
