//! sqlgraph CLI library: input handling, output formatting, and serve mode.

pub mod cli;
pub mod input;
pub mod output;
pub mod server;
