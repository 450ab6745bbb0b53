//! sqlgraph - SQL workflow inference CLI

use anyhow::{bail, Context, Result};
use clap::Parser;
use sqlgraph_core::{
    build_workflow, CycleError, InputError, ScheduleDefaults, SqlFile, WorkflowError,
    WorkflowOptions, WorkflowRequest,
};
use sqlgraph_cli::cli::Args;
use sqlgraph_cli::input::{self, ArchiveLimits};
use sqlgraph_cli::output;
use sqlgraph_cli::server::{self, ServerConfig};
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Inference failed: bad input, cycle, or unparsable SQL.
const EXIT_FAILURE: u8 = 1;
/// Configuration or I/O error (unreadable file, bad catalog, bind failure).
const EXIT_CONFIG_ERROR: u8 = 66;

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing();

    if args.serve {
        return run_serve_mode(args);
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("sqlgraph: error: {e:#}");
            if is_workflow_failure(&e) {
                ExitCode::from(EXIT_FAILURE)
            } else {
                ExitCode::from(EXIT_CONFIG_ERROR)
            }
        }
    }
}

/// Route only stderr through tracing; stdout stays clean JSON.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// One-shot analysis: inputs to a WorkflowSpec JSON document.
fn run(args: Args) -> Result<()> {
    if args.inputs.is_empty() {
        bail!("no inputs given; pass SQL files, a directory, or a .zip archive");
    }

    let limits = ArchiveLimits {
        max_archive_bytes: args.max_archive_bytes,
        max_files: args.max_files,
    };
    let files = input::read_inputs(&args.inputs, &limits)?;

    let catalog = args
        .catalog
        .as_deref()
        .map(input::load_catalog)
        .transpose()
        .context("Failed to load schema catalog")?;

    let workflow_name = args.workflow_name.clone().unwrap_or_else(|| {
        SqlFile::new(args.inputs[0].display().to_string(), "").job_name()
    });

    let request = WorkflowRequest {
        workflow_name,
        files,
        options: WorkflowOptions {
            max_file_bytes: Some(args.max_file_bytes),
            catalog,
            schedule: Some(ScheduleDefaults {
                dag_name: args.dag_name.clone(),
                schedule_bd_day: args.bd_day.clone(),
                schedule_hour: args.hour.clone(),
            }),
        },
    };

    let response = build_workflow(&request)?;
    for warning in &response.warnings {
        warn!("skipped {warning}");
    }

    output::write_json(&response, args.output.as_deref(), args.compact)
}

/// Run the HTTP upload endpoint.
fn run_serve_mode(args: Args) -> ExitCode {
    let catalog = match args
        .catalog
        .as_deref()
        .map(input::load_catalog)
        .transpose()
    {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("sqlgraph: error: {e:#}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let config = ServerConfig {
        port: args.port,
        allowed_origins: args.allow_origins.clone(),
        limits: ArchiveLimits {
            max_archive_bytes: args.max_archive_bytes,
            max_files: args.max_files,
        },
        request_timeout_secs: args.timeout_secs,
        options: WorkflowOptions {
            max_file_bytes: Some(args.max_file_bytes),
            catalog,
            schedule: Some(ScheduleDefaults {
                dag_name: args.dag_name.clone(),
                schedule_bd_day: args.bd_day.clone(),
                schedule_hour: args.hour.clone(),
            }),
        },
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("sqlgraph: error: {e:#}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    match runtime.block_on(server::run_server(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("sqlgraph: error: {e:#}");
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

/// True for failures of the inference itself rather than of configuration.
fn is_workflow_failure(e: &anyhow::Error) -> bool {
    e.downcast_ref::<WorkflowError>().is_some()
        || e.downcast_ref::<InputError>().is_some()
        || e.downcast_ref::<CycleError>().is_some()
}
