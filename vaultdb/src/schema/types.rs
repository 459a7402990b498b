use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered schema declaration as written by the caller: field name -> config.
pub type SchemaDeclaration = IndexMap<String, FieldConfig>;

/// Declared type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Date,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Object => "object",
            FieldKind::Array => "array",
            FieldKind::Date => "date",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration of a single field, as parsed from YAML or JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(rename = "type")]
    pub field_type: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    /// Element type, only meaningful for `array`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<FieldKind>,
    /// Nested declaration, only meaningful for `object`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaDeclaration>,
}

impl FieldConfig {
    pub fn new(field_type: FieldKind) -> Self {
        FieldConfig {
            field_type,
            required: false,
            unique: false,
            items: None,
            schema: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn items(mut self, items: FieldKind) -> Self {
        self.items = Some(items);
        self
    }

    pub fn schema<I, K>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldConfig)>,
        K: Into<String>,
    {
        self.schema = Some(fields.into_iter().map(|(k, v)| (k.into(), v)).collect());
        self
    }
}

/// Compiled field type tree
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    /// Element type, when declared
    Array(Option<FieldKind>),
    /// Nested fields, when declared
    Object(Option<IndexMap<String, FieldSpec>>),
}

impl FieldType {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldType::String => FieldKind::String,
            FieldType::Number => FieldKind::Number,
            FieldType::Boolean => FieldKind::Boolean,
            FieldType::Date => FieldKind::Date,
            FieldType::Array(_) => FieldKind::Array,
            FieldType::Object(_) => FieldKind::Object,
        }
    }
}

/// A compiled field: its type tree plus constraints
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub field_type: FieldType,
    pub required: bool,
    pub unique: bool,
}
