mod parser;
mod types;

pub use parser::{parse_schema, parse_schema_str};
pub use types::{FieldConfig, FieldKind, FieldSpec, FieldType, SchemaDeclaration};

use crate::document::Document;
use crate::error::{Result, VaultDbError};
use crate::validation::{self, ValidationResult};
use indexmap::IndexMap;

/// A compiled, immutable document schema.
///
/// The set of unique fields is computed once here and only covers top-level
/// fields; `unique` on a nested field is accepted but never enforced.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    fields: IndexMap<String, FieldSpec>,
    unique_fields: Vec<String>,
}

impl Schema {
    /// Compile a declaration into the field type tree.
    pub fn new(declaration: SchemaDeclaration) -> Result<Self> {
        let fields = compile_fields(declaration, "")?;
        let unique_fields = fields
            .iter()
            .filter(|(_, spec)| spec.unique)
            .map(|(name, _)| name.clone())
            .collect();
        Ok(Schema {
            fields,
            unique_fields,
        })
    }

    /// Build a schema from `(name, config)` pairs, keeping their order.
    pub fn from_fields<I, K>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, FieldConfig)>,
        K: Into<String>,
    {
        Self::new(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Parse a JSON schema declaration
    pub fn from_json(content: &str) -> Result<Self> {
        let declaration: SchemaDeclaration = serde_json::from_str(content)?;
        Self::new(declaration)
    }

    pub fn fields(&self) -> &IndexMap<String, FieldSpec> {
        &self.fields
    }

    /// Top-level fields declared unique, in declaration order
    pub fn unique_fields(&self) -> &[String] {
        &self.unique_fields
    }

    pub fn validate(&self, candidate: &Document) -> ValidationResult {
        validation::validate_document(self, candidate)
    }
}

fn compile_fields(declaration: SchemaDeclaration, prefix: &str) -> Result<IndexMap<String, FieldSpec>> {
    let mut fields = IndexMap::with_capacity(declaration.len());
    for (name, config) in declaration {
        if name.is_empty() || name.starts_with('$') {
            return Err(VaultDbError::Schema(format!(
                "Invalid field name '{prefix}{name}': names must be non-empty and must not start with '$'"
            )));
        }
        let path = format!("{prefix}{name}");
        let spec = compile_field(config, &path)?;
        fields.insert(name, spec);
    }
    Ok(fields)
}

fn compile_field(config: FieldConfig, path: &str) -> Result<FieldSpec> {
    if config.items.is_some() && config.field_type != FieldKind::Array {
        log::debug!("Ignoring 'items' on non-array field '{path}'");
    }
    if config.schema.is_some() && config.field_type != FieldKind::Object {
        log::debug!("Ignoring 'schema' on non-object field '{path}'");
    }

    let field_type = match config.field_type {
        FieldKind::String => FieldType::String,
        FieldKind::Number => FieldType::Number,
        FieldKind::Boolean => FieldType::Boolean,
        FieldKind::Date => FieldType::Date,
        FieldKind::Array => FieldType::Array(config.items),
        FieldKind::Object => match config.schema {
            Some(nested) => FieldType::Object(Some(compile_fields(nested, &format!("{path}."))?)),
            None => FieldType::Object(None),
        },
    };

    Ok(FieldSpec {
        field_type,
        required: config.required,
        unique: config.unique,
    })
}
