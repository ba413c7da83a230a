//! Schema type definitions
//!
//! Supported types:
//! - string, number, boolean, date, uuid: scalars with casting rules
//! - mixed: any JSON value, stored verbatim
//! - map: ordered string-keyed container whose values conform to `of`
//! - array: homogeneous array whose elements conform to `of`
//! - embedded: nested document with its own schema (and discriminators)

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{SchemaError, SchemaResult};
use super::validators::Validator;

/// Default discriminator key
pub const DEFAULT_DISCRIMINATOR_KEY: &str = "__t";

/// Scalar casting targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Number,
    Boolean,
    Date,
    Uuid,
    Mixed,
}

impl ScalarType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarType::String => "String",
            ScalarType::Number => "Number",
            ScalarType::Boolean => "Boolean",
            ScalarType::Date => "Date",
            ScalarType::Uuid => "Uuid",
            ScalarType::Mixed => "Mixed",
        }
    }
}

/// Field type tag, decided when the schema is declared.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    Uuid,
    Mixed,
    /// String-keyed map whose values conform to `of`
    Map { of: Arc<FieldDef> },
    /// Array whose elements conform to `of`
    Array { of: Arc<FieldDef> },
    /// Nested document
    Embedded { schema: Arc<Schema> },
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Map { .. } => "Map",
            FieldType::Array { .. } => "Array",
            FieldType::Embedded { .. } => "Embedded",
            other => other.scalar().map_or("Mixed", |s| s.type_name()),
        }
    }

    /// Returns the scalar casting target, if this is a scalar type
    pub fn scalar(&self) -> Option<ScalarType> {
        match self {
            FieldType::String => Some(ScalarType::String),
            FieldType::Number => Some(ScalarType::Number),
            FieldType::Boolean => Some(ScalarType::Boolean),
            FieldType::Date => Some(ScalarType::Date),
            FieldType::Uuid => Some(ScalarType::Uuid),
            FieldType::Mixed => Some(ScalarType::Mixed),
            _ => None,
        }
    }
}

/// Default value for a field: a static JSON value or a generator.
#[derive(Clone)]
pub enum DefaultValue {
    Static(Value),
    Computed(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    /// Produces the raw (uncast) default value
    pub fn produce(&self) -> Value {
        match self {
            DefaultValue::Static(value) => value.clone(),
            DefaultValue::Computed(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Static(value) => f.debug_tuple("Static").field(value).finish(),
            DefaultValue::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

// Computed defaults have no JSON form and serialize as null.
impl Serialize for DefaultValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DefaultValue::Static(value) => value.serialize(serializer),
            DefaultValue::Computed(_) => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for DefaultValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(DefaultValue::Static)
    }
}

/// Field definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field data type
    #[serde(flatten)]
    pub field_type: FieldType,
    /// Whether the value must be present and non-null
    #[serde(default)]
    pub required: bool,
    /// Validators run against the value
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<Validator>,
    /// Default applied when the value is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
}

impl FieldDef {
    /// Create an optional field of the given type
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            validators: Vec::new(),
            default: None,
        }
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    pub fn date() -> Self {
        Self::new(FieldType::Date)
    }

    pub fn uuid() -> Self {
        Self::new(FieldType::Uuid)
    }

    pub fn mixed() -> Self {
        Self::new(FieldType::Mixed)
    }

    /// Create a map field whose values conform to `of`
    pub fn map_of(of: FieldDef) -> Self {
        Self::new(FieldType::Map { of: Arc::new(of) })
    }

    /// Create an array field whose elements conform to `of`
    pub fn array_of(of: FieldDef) -> Self {
        Self::new(FieldType::Array { of: Arc::new(of) })
    }

    /// Create an embedded document field
    pub fn embedded(schema: Schema) -> Self {
        Self::new(FieldType::Embedded {
            schema: Arc::new(schema),
        })
    }

    /// Marks the field required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Adds a validator
    pub fn validate(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Sets a static default
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(DefaultValue::Static(value));
        self
    }

    /// Sets a computed default
    pub fn default_with<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Computed(Arc::new(f)));
        self
    }

    /// Returns the map value definition, if this is a map field
    pub fn map_value(&self) -> Option<&FieldDef> {
        match &self.field_type {
            FieldType::Map { of } => Some(of),
            _ => None,
        }
    }

    /// Checks the declaration and compiles nested schemas.
    fn compile(&self, path: &str) -> SchemaResult<FieldDef> {
        for validator in &self.validators {
            validator
                .check_declaration()
                .map_err(|reason| SchemaError::invalid(path, reason))?;
        }

        let field_type = match &self.field_type {
            FieldType::Map { of } => FieldType::Map {
                of: Arc::new(of.compile(&format!("{}.$*", path))?),
            },
            FieldType::Array { of } => FieldType::Array {
                of: Arc::new(of.compile(&format!("{}.$", path))?),
            },
            FieldType::Embedded { schema } => FieldType::Embedded {
                schema: schema.as_ref().clone().compile_at(path)?,
            },
            scalar => scalar.clone(),
        };

        Ok(FieldDef {
            field_type,
            ..self.clone()
        })
    }
}

/// Result of resolving a dotted path against a schema
#[derive(Debug, Clone, Copy)]
pub enum PathTarget<'a> {
    /// Path addresses a declared field, map entry or array element
    Field(&'a FieldDef),
    /// Path lies inside a mixed value; no casting applies
    Mixed,
    /// Path is not declared
    Unknown,
}

fn default_version() -> String {
    "v1".to_string()
}

fn default_true() -> bool {
    true
}

fn default_discriminator_key() -> String {
    DEFAULT_DISCRIMINATOR_KEY.to_string()
}

/// Schema definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    /// Schema identifier (empty for inline embedded schemas)
    #[serde(default)]
    pub schema_id: String,
    /// Schema version
    #[serde(default = "default_version")]
    pub schema_version: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Field definitions in declaration order
    pub fields: IndexMap<String, FieldDef>,
    /// Drop undeclared input fields (true) or keep them as mixed (false)
    #[serde(default = "default_true")]
    pub strict: bool,
    /// Field holding the discriminator tag
    #[serde(default = "default_discriminator_key")]
    pub discriminator_key: String,
    /// Variant declarations keyed by tag (variant-only fields)
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub discriminators: IndexMap<String, Schema>,
    /// Tag of this schema when it is a merged variant
    #[serde(skip)]
    pub(crate) variant: Option<String>,
    /// Merged variant schemas, built by `compile`
    #[serde(skip)]
    pub(crate) variants: IndexMap<String, Arc<Schema>>,
}

impl Schema {
    /// Create a new schema
    pub fn new(
        schema_id: impl Into<String>,
        schema_version: impl Into<String>,
        fields: IndexMap<String, FieldDef>,
    ) -> Self {
        Self {
            schema_id: schema_id.into(),
            schema_version: schema_version.into(),
            description: None,
            fields,
            strict: true,
            discriminator_key: default_discriminator_key(),
            discriminators: IndexMap::new(),
            variant: None,
            variants: IndexMap::new(),
        }
    }

    /// Create an inline schema for embedded documents
    pub fn inline(fields: IndexMap<String, FieldDef>) -> Self {
        Self::new("", default_version(), fields)
    }

    /// Builder: add a field
    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    /// Builder: set strictness
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Builder: set the discriminator key
    pub fn with_discriminator_key(mut self, key: impl Into<String>) -> Self {
        self.discriminator_key = key.into();
        self
    }

    /// Builder: declare a discriminator variant with its own fields
    pub fn with_discriminator(mut self, tag: impl Into<String>, variant: Schema) -> Self {
        self.discriminators.insert(tag.into(), variant);
        self
    }

    /// Returns the unique key for this schema (id, version)
    pub fn key(&self) -> (&str, &str) {
        (&self.schema_id, &self.schema_version)
    }

    /// Returns the discriminator tag if this is a merged variant schema
    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    /// Returns the merged schema for a variant tag
    pub fn variant_schema(&self, tag: &str) -> Option<&Arc<Schema>> {
        self.variants.get(tag)
    }

    /// Returns merged variant schemas in declaration order
    pub fn variants(&self) -> impl Iterator<Item = (&str, &Arc<Schema>)> {
        self.variants.iter().map(|(tag, schema)| (tag.as_str(), schema))
    }

    /// Returns true if the schema declares discriminator variants
    pub fn has_discriminators(&self) -> bool {
        !self.discriminators.is_empty()
    }

    /// Validates the declaration and produces the immutable compiled form.
    ///
    /// Embedded schemas are compiled recursively and every discriminator
    /// variant is merged into an effective schema.
    pub fn compile(self) -> SchemaResult<Arc<Schema>> {
        self.compile_at("")
    }

    pub(crate) fn compile_at(self, prefix: &str) -> SchemaResult<Arc<Schema>> {
        let mut fields = IndexMap::with_capacity(self.fields.len());
        for (name, def) in &self.fields {
            let path = join_path(prefix, name);
            if name.is_empty() || name.contains('.') || name.starts_with('$') {
                return Err(SchemaError::invalid(
                    path,
                    "field names must be non-empty and contain no '.' or leading '$'",
                ));
            }
            fields.insert(name.clone(), def.compile(&path)?);
        }

        let mut compiled = Schema {
            fields,
            variants: IndexMap::new(),
            ..self
        };

        if compiled.has_discriminators() {
            if let Some(def) = compiled.fields.get(&compiled.discriminator_key) {
                if !matches!(def.field_type, FieldType::String) {
                    return Err(SchemaError::invalid(
                        join_path(prefix, &compiled.discriminator_key),
                        "discriminator key must be a string field",
                    ));
                }
            }
            compiled.variants = super::discriminator::merge_variants(&compiled, prefix)?;
        }

        Ok(Arc::new(compiled))
    }

    /// Looks up a top-level field, searching variant fields when the
    /// base schema does not declare it.
    pub fn lookup_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name).or_else(|| {
            self.variants
                .values()
                .find_map(|variant| variant.fields.get(name))
        })
    }

    /// Resolves a dotted path to the definition that governs its value.
    ///
    /// Map segments select the map's value definition; numeric segments
    /// index arrays, other segments apply to every array element.
    pub fn resolve_path(&self, path: &str) -> PathTarget<'_> {
        let mut segments = path.split('.');
        let first = match segments.next() {
            Some(first) => first,
            None => return PathTarget::Unknown,
        };
        let mut def = match self.lookup_field(first) {
            Some(def) => def,
            None => return PathTarget::Unknown,
        };

        for segment in segments {
            def = match descend(def, segment) {
                Step::Into(next) => next,
                Step::Mixed => return PathTarget::Mixed,
                Step::Unknown => return PathTarget::Unknown,
            };
        }

        PathTarget::Field(def)
    }

    /// Lists every declared path with its type name, map entries as `$*`
    /// and array elements as `$`.
    pub fn paths(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        collect_paths(&self.fields, "", &mut out);
        for (tag, variant) in &self.variants {
            let mut variant_paths = Vec::new();
            collect_paths(&variant.fields, "", &mut variant_paths);
            for (path, type_name) in variant_paths {
                if !self.fields.contains_key(path.split('.').next().unwrap_or_default()) {
                    out.push((path, format!("{} ({})", type_name, tag)));
                }
            }
        }
        out
    }
}

enum Step<'a> {
    Into(&'a FieldDef),
    Mixed,
    Unknown,
}

fn descend<'a>(def: &'a FieldDef, segment: &str) -> Step<'a> {
    match &def.field_type {
        FieldType::Map { of } => Step::Into(of),
        FieldType::Array { of } => {
            if segment.parse::<usize>().is_ok() {
                Step::Into(of)
            } else {
                descend(of, segment)
            }
        }
        FieldType::Embedded { schema } => match schema.lookup_field(segment) {
            Some(next) => Step::Into(next),
            None => Step::Unknown,
        },
        FieldType::Mixed => Step::Mixed,
        _ => Step::Unknown,
    }
}

fn collect_paths(fields: &IndexMap<String, FieldDef>, prefix: &str, out: &mut Vec<(String, String)>) {
    for (name, def) in fields {
        let path = join_path(prefix, name);
        collect_def(def, &path, out);
    }
}

fn collect_def(def: &FieldDef, path: &str, out: &mut Vec<(String, String)>) {
    out.push((path.to_string(), def.field_type.type_name().to_string()));
    match &def.field_type {
        FieldType::Map { of } => collect_def(of, &format!("{}.$*", path), out),
        FieldType::Array { of } => collect_def(of, &format!("{}.$", path), out),
        FieldType::Embedded { schema } => collect_paths(&schema.fields, path, out),
        _ => {}
    }
}

/// Creates a dotted path from prefix and segment.
pub fn join_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", prefix, segment)
    }
}
