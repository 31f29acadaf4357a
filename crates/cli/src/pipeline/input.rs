//! JSON lines inputs.

use std::path::Path;

use serde_json::Value;

use crate::error::{CliError, Result};

/// Read a JSON lines file, one value per non-blank line
pub fn read_json_lines(path: &Path) -> Result<Vec<Value>> {
    let content = std::fs::read_to_string(path).map_err(|source| CliError::InputRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_json_lines(path, &content)
}

/// Parse JSON lines content; `path` is only used in error messages
pub fn parse_json_lines(path: &Path, content: &str) -> Result<Vec<Value>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line)
                .map_err(|e| CliError::input_parse(path, idx + 1, e.to_string()))
        })
        .collect()
}
