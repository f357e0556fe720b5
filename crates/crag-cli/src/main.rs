//! # crag CLI
//!
//! Command-line interface for the Corrective Retrieval Gate.
//!
//! This binary provides human-friendly access to `crag-core` functionality.
//! Run `crag --help` for usage information.

mod cli;
pub mod ui;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}
