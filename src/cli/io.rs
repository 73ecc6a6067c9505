//! JSON I/O handling for CLI
//!
//! - Input: one JSON record from a file or the input stream
//! - Output: one pretty-printed JSON document per command
//! - UTF-8 only

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Reads a record from `path`, or from `input` when no path is given
pub fn read_record<R: Read>(path: Option<&Path>, mut input: R) -> CliResult<Value> {
    let content = match path {
        Some(path) => fs::read_to_string(path).map_err(|e| {
            CliError::io_error(format!("failed to read '{}': {}", path.display(), e))
        })?,
        None => {
            let mut content = String::new();
            input.read_to_string(&mut content)?;
            content
        }
    };

    if content.trim().is_empty() {
        return Err(CliError::input_error("Empty input"));
    }

    serde_json::from_str(&content).map_err(|e| CliError::input_error(format!("invalid JSON: {}", e)))
}

/// Writes `value` as pretty JSON followed by a newline
pub fn write_json<W: Write>(output: &mut W, value: &Value) -> CliResult<()> {
    serde_json::to_writer_pretty(&mut *output, value)
        .map_err(|e| CliError::io_error(format!("JSON error: {}", e)))?;
    writeln!(output)?;
    output.flush()?;

    Ok(())
}
