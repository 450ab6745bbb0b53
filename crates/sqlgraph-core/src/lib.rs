//! SQL lineage extraction and job-dependency inference.
//!
//! Turns a bundle of raw SQL scripts into a validated, topologically ordered
//! workflow: per-job table/column/join lineage, cross-job dependencies via
//! virtual table references, integer ranks, and a deterministic impact score.
//!
//! The crate is synchronous and performs no I/O: inputs are already
//! materialized `(name, text)` pairs and the output is a single
//! [`WorkflowResponse`]. Archive handling, HTTP plumbing, and timeouts live
//! in the caller.

pub mod assembler;
pub mod engine;
pub mod error;
pub mod lineage;
pub mod parser;
pub mod resolver;
pub mod scorer;
pub mod types;

pub use engine::{build_workflow, extract_file, resolve_and_assemble};
pub use error::{CycleError, InputError, ParseError, ParseErrorKind, WorkflowError};
pub use resolver::ResolvedJob;
pub use types::{
    Job, JobLineage, JobType, JoinClause, ScheduleDefaults, SchemaCatalog, SqlFile,
    StatementSummary, WorkflowOptions, WorkflowRequest, WorkflowResponse, WorkflowSpec,
};
