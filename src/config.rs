//! Mapper configuration
//!
//! Loaded from a JSON file. Every field has a default, and a missing file
//! yields the default configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{OdmError, OdmResult};
use crate::schema::Schema;

/// Configuration shared by models and the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdmConfig {
    /// Generate a UUID `_id` for root documents whose schema declares none
    #[serde(default = "default_auto_id")]
    pub auto_id: bool,

    /// Overrides every schema's `strict` flag when set
    #[serde(default)]
    pub strict: Option<bool>,

    /// Default `tracing` filter directive; `RUST_LOG` wins when set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Directory of JSON schema files for the loader
    #[serde(default)]
    pub schema_dir: Option<PathBuf>,
}

fn default_auto_id() -> bool {
    true
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for OdmConfig {
    fn default() -> Self {
        Self {
            auto_id: default_auto_id(),
            strict: None,
            log_filter: default_log_filter(),
            schema_dir: None,
        }
    }
}

impl OdmConfig {
    /// Loads configuration from a JSON file, or the defaults if the file
    /// does not exist.
    pub fn from_file(path: &Path) -> OdmResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            OdmError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let config: OdmConfig = serde_json::from_str(&content)
            .map_err(|e| OdmError::Config(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> OdmResult<()> {
        if self.log_filter.trim().is_empty() {
            return Err(OdmError::Config("log_filter must not be empty".to_string()));
        }
        Ok(())
    }

    /// Effective strictness for a schema
    pub fn strict_for(&self, schema: &Schema) -> bool {
        self.strict.unwrap_or(schema.strict)
    }
}
