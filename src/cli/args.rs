//! CLI argument definitions using clap
//!
//! Commands:
//! - aerodoc check (--schema <path> | --schema-id <id>) --document <path> [--config <path>]
//! - aerodoc inspect (--schema <path> | --schema-id <id>) [--config <path>]
//!
//! `--schema-id` looks the schema up in the configured `schema_dir`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// aerodoc - schema-typed documents with map fields
#[derive(Parser, Debug)]
#[command(name = "aerodoc")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Cast and validate a document against a schema
    Check {
        #[command(flatten)]
        schema: SchemaArgs,

        /// Path to the document JSON file
        #[arg(long)]
        document: PathBuf,

        /// Path to configuration file
        #[arg(long, default_value = "./aerodoc.json")]
        config: PathBuf,
    },

    /// List every declared path of a schema with its type
    Inspect {
        #[command(flatten)]
        schema: SchemaArgs,

        /// Path to configuration file
        #[arg(long, default_value = "./aerodoc.json")]
        config: PathBuf,
    },
}

/// Where the schema comes from: a file, or an id in the schema directory
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SchemaArgs {
    /// Path to a schema JSON file
    #[arg(long, required_unless_present = "schema_id", conflicts_with = "schema_id")]
    pub schema: Option<PathBuf>,

    /// Schema id registered in the configured schema directory
    #[arg(long)]
    pub schema_id: Option<String>,

    /// Schema version used with --schema-id
    #[arg(long, default_value = "v1")]
    pub schema_version: String,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
