//! CLI command implementations
//!
//! Every command loads and compiles a model configuration first; a
//! configuration error ends the command before any record is read.

use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::observability::{self, JsonLogger, LogSink};
use crate::schema::{compile, ConfigLoader, SchemaDescriptor, ValidationOptions};

use super::args::{Cli, Command};
use super::errors::CliResult;
use super::io::{read_record, write_json};

/// How a successful command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Command completed
    Success,
    /// Validation ran and the record was rejected
    InvalidRecord,
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Success => 0,
            Outcome::InvalidRecord => 2,
        }
    }
}

/// Main CLI entry point
pub fn run() -> CliResult<Outcome> {
    let cli = Cli::parse_args();
    let log: Arc<dyn LogSink> = if cli.verbose {
        Arc::new(JsonLogger)
    } else {
        observability::noop()
    };

    run_command(cli.command, log, io::stdin().lock(), &mut io::stdout().lock())
}

/// Run the appropriate command based on CLI args
pub fn run_command<R: Read, W: Write>(
    command: Command,
    log: Arc<dyn LogSink>,
    input: R,
    output: &mut W,
) -> CliResult<Outcome> {
    match command {
        Command::Inspect { config } => inspect(&config, log, output),
        Command::Validate {
            config,
            record,
            convert,
            abort_early,
            allow_unknown,
            strip_unknown,
        } => {
            let options = ValidationOptions {
                abort_early,
                convert,
                allow_unknown: allow_unknown.then_some(true),
                strip_unknown: strip_unknown.then_some(true),
                ..ValidationOptions::default()
            };
            validate(&config, record.as_deref(), options, log, input, output)
        }
        Command::Defaults { config, record } => {
            defaults(&config, record.as_deref(), log, input, output)
        }
    }
}

/// Prints the compiled descriptor summary
pub fn inspect<W: Write>(config_path: &Path, log: Arc<dyn LogSink>, output: &mut W) -> CliResult<Outcome> {
    let descriptor = load_descriptor(config_path, log)?;
    write_json(output, &descriptor.summary())?;
    Ok(Outcome::Success)
}

/// Prints `{value, errors}` for one record
pub fn validate<R: Read, W: Write>(
    config_path: &Path,
    record_path: Option<&Path>,
    options: ValidationOptions,
    log: Arc<dyn LogSink>,
    input: R,
    output: &mut W,
) -> CliResult<Outcome> {
    let descriptor = load_descriptor(config_path, log)?;
    let record = read_record(record_path, input)?;

    let validation = descriptor.validate_with(&record, &options);
    let errors: Vec<Value> = validation
        .errors
        .iter()
        .map(|e| {
            json!({
                "path": e.path(),
                "code": e.code(),
                "message": e.to_string(),
            })
        })
        .collect();

    let valid = errors.is_empty();
    write_json(output, &json!({ "value": validation.value, "errors": errors }))?;

    if valid {
        Ok(Outcome::Success)
    } else {
        Ok(Outcome::InvalidRecord)
    }
}

/// Prints a record with defaults applied
pub fn defaults<R: Read, W: Write>(
    config_path: &Path,
    record_path: Option<&Path>,
    log: Arc<dyn LogSink>,
    input: R,
    output: &mut W,
) -> CliResult<Outcome> {
    let descriptor = load_descriptor(config_path, log)?;
    let record = match record_path {
        Some(path) => read_record(Some(path), input)?,
        None => json!({}),
    };

    write_json(output, &descriptor.apply_defaults(&record))?;
    Ok(Outcome::Success)
}

fn load_descriptor(config_path: &Path, log: Arc<dyn LogSink>) -> CliResult<SchemaDescriptor> {
    let config = ConfigLoader::load_file(config_path)?.log(log);
    Ok(compile(&config)?)
}
