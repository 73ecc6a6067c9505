//! CLI module for dynoschema
//!
//! Provides command-line interface for:
//! - inspect: Compile a configuration and print the descriptor
//! - validate: Validate one record
//! - defaults: Apply defaults to one record

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{defaults, inspect, run, run_command, validate, Outcome};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_record, write_json};
