//! dynoschema CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`. Errors go to
//! stderr with exit code 1; a rejected record exits with code 2.

use dynoschema::cli;

fn main() {
    match cli::run() {
        Ok(outcome) => std::process::exit(outcome.exit_code()),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
