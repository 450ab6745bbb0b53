//! CLI argument parsing using clap.

use clap::Parser;
use std::path::PathBuf;

/// sqlgraph - SQL workflow inference
#[derive(Parser, Debug)]
#[command(name = "sqlgraph")]
#[command(about = "Infer an ordered job workflow from SQL scripts", long_about = None)]
#[command(version)]
pub struct Args {
    /// SQL files, directories, or a .zip archive to analyze
    #[arg(value_name = "INPUTS")]
    pub inputs: Vec<PathBuf>,

    /// Workflow name (defaults to the first input's stem)
    #[arg(long, value_name = "NAME")]
    pub workflow_name: Option<String>,

    /// JSON schema catalog for SELECT * resolution: {"table": ["col", ...]}
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Compact JSON output (no pretty-printing)
    #[arg(short, long)]
    pub compact: bool,

    /// Default DAG name stamped on every job (defaults to the workflow name)
    #[arg(long, value_name = "NAME")]
    pub dag_name: Option<String>,

    /// Default business-day schedule slot
    #[arg(long, default_value = "BD1", value_name = "DAY")]
    pub bd_day: String,

    /// Default hour schedule slot
    #[arg(long, default_value = "00:00", value_name = "HH:MM")]
    pub hour: String,

    /// Maximum total decompressed archive size in bytes
    #[arg(long, default_value = "52428800", value_name = "BYTES")]
    pub max_archive_bytes: u64,

    /// Maximum number of files in an archive
    #[arg(long, default_value = "500", value_name = "N")]
    pub max_files: usize,

    /// Per-file size cap in bytes; larger files are skipped with a warning
    #[arg(long, default_value = "1048576", value_name = "BYTES")]
    pub max_file_bytes: u64,

    /// Start the HTTP upload endpoint instead of one-shot analysis
    #[arg(long)]
    pub serve: bool,

    /// Port for the HTTP server
    #[arg(long, default_value = "8080")]
    pub port: u16,

    /// Allowed CORS origin (can be repeated)
    #[arg(
        long = "allow-origin",
        value_name = "ORIGIN",
        default_values = ["http://localhost:5173", "http://localhost:3000"]
    )]
    pub allow_origins: Vec<String>,

    /// Per-request processing deadline in seconds (serve mode)
    #[arg(long, default_value = "30", value_name = "SECS")]
    pub timeout_secs: u64,
}
