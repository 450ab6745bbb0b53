//! Shared application state for serve mode.
//!
//! There is no cross-request mutable state: `AppState` carries only the
//! configuration and the optional schema catalog, both fixed at startup.
//! Each request's job set is isolated.

use crate::input::ArchiveLimits;
use sqlgraph_core::WorkflowOptions;

/// Server configuration derived from CLI arguments.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on.
    pub port: u16,
    /// Origins allowed by the CORS layer.
    pub allowed_origins: Vec<String>,
    /// Archive-level extraction limits.
    pub limits: ArchiveLimits,
    /// Per-request processing deadline in seconds.
    pub request_timeout_secs: u64,
    /// Engine options: per-file cap, catalog, schedule defaults.
    pub options: WorkflowOptions,
}

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }
}
