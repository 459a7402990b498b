// Document model - ordered field maps with engine-managed metadata

mod value;

pub use value::{Value, DATE_KEY, OBJECT_KEY};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Engine-managed identifier field.
pub const ID_FIELD: &str = "_id";
/// Engine-managed creation timestamp, set once at insert.
pub const CREATED_AT_FIELD: &str = "createdAt";
/// Engine-managed modification timestamp, refreshed on every update.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// A stored document: caller fields plus `_id`, `createdAt` and `updatedAt`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    fields: IndexMap<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: IndexMap<String, Value>) -> Self {
        Document { fields }
    }

    /// Parse a JSON object into a document, keeping its field order.
    /// Anything else is rejected.
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        match serde_json::from_str::<Value>(json)? {
            Value::Object(fields) => Ok(Document { fields }),
            other => Err(crate::VaultDbError::Validation(format!(
                "Document must be an object, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.fields.get(ID_FIELD).and_then(Value::as_str)
    }

    pub fn created_at(&self) -> Option<&DateTime<Utc>> {
        self.fields.get(CREATED_AT_FIELD).and_then(Value::as_date)
    }

    pub fn updated_at(&self) -> Option<&DateTime<Utc>> {
        self.fields.get(UPDATED_AT_FIELD).and_then(Value::as_date)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Set a field, keeping its original position if it already exists.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.shift_remove(field)
    }

    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Overlay every field of `patch` onto this document.
    pub fn merge(&mut self, patch: &Document) {
        for (k, v) in &patch.fields {
            self.fields.insert(k.clone(), v.clone());
        }
    }

    /// Copy of this document without the engine-managed fields.
    pub fn without_metadata(&self) -> Document {
        let fields = self
            .fields
            .iter()
            .filter(|(k, _)| !is_metadata_field(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Document { fields }
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Object(doc.fields)
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Document {
            fields: iter.into_iter().collect(),
        }
    }
}

/// True for `_id`, `createdAt` and `updatedAt`.
pub fn is_metadata_field(field: &str) -> bool {
    matches!(field, ID_FIELD | CREATED_AT_FIELD | UPDATED_AT_FIELD)
}

/// Build a [`Document`] from `"field" => value` pairs.
#[macro_export]
macro_rules! doc {
    () => {
        $crate::Document::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut doc = $crate::Document::new();
        $(doc.insert($key, $value);)+
        doc
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_document_serializes_as_plain_object() {
        let doc = crate::doc! { "name" => "Alice", "age" => 30 };
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(json, r#"{"name":"Alice","age":30}"#);
    }

    #[test]
    fn test_from_json_str_rejects_non_objects() {
        assert!(Document::from_json_str("[1, 2]").is_err());
        assert!(Document::from_json_str(r#"{ "a": 1 }"#).is_ok());
    }

    #[test]
    fn test_from_json_str_keeps_field_order() {
        let doc = Document::from_json_str(r#"{"zeta":1,"alpha":2,"mid":3}"#).unwrap();
        let keys: Vec<&String> = doc.fields().keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_merge_overwrites_in_place() {
        let mut doc = crate::doc! { "a" => 1, "b" => 2 };
        doc.merge(&crate::doc! { "a" => 10, "c" => 3 });
        let keys: Vec<&String> = doc.fields().keys().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(doc.get("a"), Some(&Value::from(10)));
    }

    #[test]
    fn test_without_metadata() {
        let mut doc = crate::doc! { "name" => "Alice" };
        doc.insert(ID_FIELD, "abc");
        doc.insert(CREATED_AT_FIELD, Utc::now());
        assert_eq!(doc.without_metadata(), crate::doc! { "name" => "Alice" });
    }
}
