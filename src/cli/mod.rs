//! CLI module for aerodoc
//!
//! Provides command-line interface for:
//! - check: Cast and validate a document file against a schema file
//! - inspect: List the declared paths of a schema

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, SchemaArgs};
pub use commands::{check, inspect, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_json, write_error, write_response};
