//! Reading the newline-separated values file.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Read `path` and split it into one value per line.
///
/// Blank lines are kept; the runner drops them. A trailing `\r` is removed so
/// files written on Windows do not leak it into the child's environment.
pub fn read_values_file(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read values-file {:?}", path.display().to_string()))?;
    Ok(split_values(&text))
}

pub fn split_values(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}
