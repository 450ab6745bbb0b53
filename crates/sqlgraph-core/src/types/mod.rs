//! Public types for the workflow inference API.

mod request;
mod workflow;

pub use request::{ScheduleDefaults, SchemaCatalog, SqlFile, WorkflowOptions, WorkflowRequest};
pub use workflow::{
    Job, JobLineage, JobType, JoinClause, StatementSummary, WorkflowResponse, WorkflowSpec,
};
