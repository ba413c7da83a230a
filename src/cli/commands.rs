//! CLI command implementations
//!
//! Every command loads configuration first, initializes logging from it
//! and writes one JSON response to stdout.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};

use super::args::{Command, SchemaArgs};
use super::errors::{CliError, CliResult};
use super::io::{read_json, write_error, write_response};
use crate::config::OdmConfig;
use crate::document::Document;
use crate::error::OdmError;
use crate::model::compile_schema;
use crate::observability::init_logging;
use crate::schema::{Schema, SchemaLoader};
use crate::validation::ValidationEngine;

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Check {
            schema,
            document,
            config,
        } => check(&schema, &document, &config),
        Command::Inspect { schema, config } => inspect(&schema, &config),
    }
}

/// Cast and validate a document.
///
/// Prints the normalized document on success. On rejection prints the
/// error code with the failing paths and returns an error.
pub fn check(schema: &SchemaArgs, document_path: &Path, config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let schema = load_schema(schema, &config)?;
    let input = read_json(document_path)?;

    match check_document(&schema, &input) {
        Ok(document) => write_response(document.to_object()),
        Err(err) => {
            write_error(err.code(), &err.to_string(), Some(rejection_details(&err)))?;
            Err(CliError::from(err))
        }
    }
}

/// Print every declared path of a schema with its type name.
pub fn inspect(schema: &SchemaArgs, config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let schema = load_schema(schema, &config)?;

    let paths: serde_json::Map<String, Value> = schema
        .paths()
        .into_iter()
        .map(|(path, type_name)| (path, Value::String(type_name)))
        .collect();

    write_response(json!({
        "schema_id": schema.schema_id,
        "schema_version": schema.schema_version,
        "strict": schema.strict,
        "paths": paths,
    }))
}

fn load_config(path: &Path) -> CliResult<OdmConfig> {
    let config = OdmConfig::from_file(path)?;
    init_logging(&config.log_filter);
    Ok(config)
}

/// Reads the schema declaration from a file, or from the configured
/// schema directory by id and version, and compiles it with the config.
fn load_schema(source: &SchemaArgs, config: &OdmConfig) -> CliResult<Arc<Schema>> {
    let declared = match (&source.schema, &source.schema_id) {
        (Some(path), _) => {
            let raw = read_json(path)?;
            serde_json::from_value(raw).map_err(|e| {
                CliError::rejected(format!("invalid schema {}: {}", path.display(), e))
            })?
        }
        (None, Some(schema_id)) => {
            let dir = config.schema_dir.as_deref().ok_or_else(|| {
                CliError::config_error("schema_dir must be set to look up --schema-id")
            })?;
            let mut loader = SchemaLoader::new(dir);
            loader.load_all().map_err(OdmError::from)?;
            let registered = loader
                .get(schema_id, &source.schema_version)
                .map_err(OdmError::from)?;
            Schema::clone(&registered)
        }
        (None, None) => {
            return Err(CliError::config_error(
                "either --schema or --schema-id is required",
            ))
        }
    };
    Ok(compile_schema(declared, config).map_err(OdmError::from)?)
}

fn check_document(schema: &Arc<Schema>, input: &Value) -> Result<Document, OdmError> {
    let document = Document::new(schema, input)?;
    ValidationEngine::new().validate(&document)?;
    Ok(document)
}

fn rejection_details(err: &OdmError) -> Value {
    if let Some(validation) = err.as_validation() {
        return json!({ "errors": validation.errors() });
    }
    if let Some(cast) = err.as_cast() {
        return json!({ "path": cast.path(), "kind": cast.kind() });
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, value: &Value) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
        path
    }

    fn from_file(path: std::path::PathBuf) -> SchemaArgs {
        SchemaArgs {
            schema: Some(path),
            schema_id: None,
            schema_version: "v1".to_string(),
        }
    }

    fn by_id(schema_id: &str) -> SchemaArgs {
        SchemaArgs {
            schema: None,
            schema_id: Some(schema_id.to_string()),
            schema_version: "v1".to_string(),
        }
    }

    fn write_into(dir: &Path, name: &str, value: &Value) {
        fs::write(dir.join(name), serde_json::to_string(value).unwrap()).unwrap();
    }

    fn schema_json() -> Value {
        json!({
            "schema_id": "users",
            "schema_version": "v1",
            "fields": {
                "name": {"type": "string", "required": true},
                "scores": {
                    "type": "map",
                    "of": {"type": "number", "validators": [{"kind": "min", "value": 0}]}
                }
            }
        })
    }

    #[test]
    fn test_check_accepts_valid_document() {
        let dir = TempDir::new().unwrap();
        let schema = from_file(write(&dir, "schema.json", &schema_json()));
        let doc = write(&dir, "doc.json", &json!({"name": "a", "scores": {"x": "3"}}));
        let config = dir.path().join("missing.json");

        check(&schema, &doc, &config).unwrap();
    }

    #[test]
    fn test_check_rejects_invalid_entry() {
        let dir = TempDir::new().unwrap();
        let schema = from_file(write(&dir, "schema.json", &schema_json()));
        let doc = write(&dir, "doc.json", &json!({"name": "a", "scores": {"x": -1}}));
        let config = dir.path().join("missing.json");

        let err = check(&schema, &doc, &config).unwrap_err();
        assert_eq!(err.code().code(), "AERO_CLI_REJECTED");
    }

    #[test]
    fn test_inspect_reports_paths() {
        let dir = TempDir::new().unwrap();
        let schema = from_file(write(&dir, "schema.json", &schema_json()));
        inspect(&schema, &dir.path().join("missing.json")).unwrap();
    }

    #[test]
    fn test_bad_config_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let schema = from_file(write(&dir, "schema.json", &schema_json()));
        let config = dir.path().join("aerodoc.json");
        fs::write(&config, "{not json").unwrap();

        let err = inspect(&schema, &config).unwrap_err();
        assert_eq!(err.code().code(), "AERO_CLI_CONFIG_ERROR");
    }

    #[test]
    fn test_schema_id_resolves_through_schema_dir() {
        let dir = TempDir::new().unwrap();
        let schemas = dir.path().join("schemas");
        fs::create_dir(&schemas).unwrap();
        write_into(&schemas, "schema_users_v1.json", &schema_json());
        let config = write(
            &dir,
            "aerodoc.json",
            &json!({"schema_dir": schemas, "strict": false}),
        );
        let doc = write(&dir, "doc.json", &json!({"name": "a", "scores": {"x": 2}}));

        check(&by_id("users"), &doc, &config).unwrap();
        inspect(&by_id("users"), &config).unwrap();

        let err = inspect(
            &SchemaArgs {
                schema_version: "v2".to_string(),
                ..by_id("users")
            },
            &config,
        )
        .unwrap_err();
        assert_eq!(err.code().code(), "AERO_CLI_REJECTED");
    }

    #[test]
    fn test_schema_id_without_schema_dir_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let err = inspect(&by_id("users"), &dir.path().join("missing.json")).unwrap_err();
        assert_eq!(err.code().code(), "AERO_CLI_CONFIG_ERROR");
    }

    #[test]
    fn test_loaded_schema_uses_config_strictness() {
        let dir = TempDir::new().unwrap();
        let source = from_file(write(&dir, "schema.json", &schema_json()));
        let config = OdmConfig {
            strict: Some(false),
            ..OdmConfig::default()
        };

        let schema = load_schema(&source, &config).unwrap();
        assert!(!schema.strict);
        assert!(load_schema(&source, &OdmConfig::default()).unwrap().strict);
    }
}
