//! JSON output to stdout or a file.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Serialize a value as JSON and write it to the given file or stdout.
pub fn write_json<T: Serialize>(value: &T, output: Option<&Path>, compact: bool) -> Result<()> {
    let json = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };

    match output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("Failed to write output: {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}").context("Failed to write to stdout")?;
        }
    }
    Ok(())
}
