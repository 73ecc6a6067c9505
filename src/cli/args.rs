//! CLI argument definitions using clap
//!
//! Commands:
//! - dynoschema inspect --config <path>
//! - dynoschema validate --config <path> [--record <path>]
//! - dynoschema defaults --config <path> [--record <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// dynoschema - compile and exercise DynamoDB model schemas
#[derive(Parser, Debug)]
#[command(name = "dynoschema")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Emit structured JSON log events on stderr
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a model configuration and print its descriptor
    Inspect {
        /// Path to the JSON model configuration
        #[arg(long, default_value = "./model.json")]
        config: PathBuf,
    },

    /// Validate a record against a model configuration
    Validate {
        /// Path to the JSON model configuration
        #[arg(long, default_value = "./model.json")]
        config: PathBuf,

        /// Record file; stdin when omitted
        #[arg(long)]
        record: Option<PathBuf>,

        /// Coerce strings to the declared kinds
        #[arg(long)]
        convert: Option<bool>,

        /// Stop at the first error
        #[arg(long)]
        abort_early: Option<bool>,

        /// Keep fields the schema does not declare
        #[arg(long)]
        allow_unknown: bool,

        /// Drop fields the schema does not declare
        #[arg(long)]
        strip_unknown: bool,
    },

    /// Print a record with defaults applied
    Defaults {
        /// Path to the JSON model configuration
        #[arg(long, default_value = "./model.json")]
        config: PathBuf,

        /// Record file; empty record when omitted
        #[arg(long)]
        record: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
