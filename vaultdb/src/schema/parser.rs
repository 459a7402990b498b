use super::types::SchemaDeclaration;
use super::Schema;
use crate::error::Result;
use std::path::Path;

/// Parse a schema YAML file into a compiled Schema
pub fn parse_schema(path: &Path) -> Result<Schema> {
    let content = std::fs::read_to_string(path)?;
    parse_schema_str(&content)
}

/// Parse a schema YAML string into a compiled Schema
pub fn parse_schema_str(content: &str) -> Result<Schema> {
    let declaration: SchemaDeclaration = serde_yaml::from_str(content)?;
    Schema::new(declaration)
}
