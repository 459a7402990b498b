// Serialization adapters - persisted text <-> document sequence

mod encrypted;

pub use encrypted::{Credentials, EncryptedAdapter};

use crate::document::Document;
use crate::error::Result;

/// Converts a whole collection to and from its persisted text.
///
/// Implementations must satisfy `deserialize(serialize(x)) == x`, including
/// field order and the engine-managed metadata fields. Failures are returned,
/// never swallowed.
pub trait Adapter: Send + Sync {
    fn serialize(&self, documents: &[Document]) -> Result<String>;

    fn deserialize(&self, text: &str) -> Result<Vec<Document>>;
}

/// Plain JSON array codec
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonAdapter;

impl JsonAdapter {
    pub fn new() -> Self {
        JsonAdapter
    }
}

impl Adapter for JsonAdapter {
    fn serialize(&self, documents: &[Document]) -> Result<String> {
        Ok(serde_json::to_string(documents)?)
    }

    fn deserialize(&self, text: &str) -> Result<Vec<Document>> {
        // A freshly created file holds nothing yet
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::document::Value;
    use crate::error::VaultDbError;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_json_round_trip() {
        let mut first = doc! {
            "name" => "Alice",
            "age" => 30,
            "score" => 9.5,
            "tags" => vec![Value::from("a")],
            "address" => doc! { "city" => "NYC" },
        };
        first.insert("_id", "65a1b2c3d4e5f6a7b8c9d0e1");
        first.insert("createdAt", Utc::now());
        first.insert("updatedAt", Utc::now());
        let docs = vec![first, doc! { "name" => "Bob", "nothing" => Value::Null }];

        let adapter = JsonAdapter::new();
        let text = adapter.serialize(&docs).unwrap();
        assert!(text.starts_with('['));
        assert_eq!(adapter.deserialize(&text).unwrap(), docs);
    }

    #[test]
    fn test_json_round_trip_keeps_wrapper_shaped_objects() {
        let meta = doc! { "$date" => "2026-01-01T00:00:00Z" };
        let docs = vec![doc! { "meta" => meta, "when" => Utc::now() }];

        let text = JsonAdapter.serialize(&docs).unwrap();
        let back = JsonAdapter.deserialize(&text).unwrap();
        assert_eq!(back, docs);
        assert!(back[0].get("meta").unwrap().as_object().is_some());
        assert!(back[0].get("when").unwrap().as_date().is_some());
    }

    #[test]
    fn test_json_empty_text_is_empty_collection() {
        assert!(JsonAdapter.deserialize("").unwrap().is_empty());
        assert!(JsonAdapter.deserialize("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_json_malformed_is_parse_error() {
        let err = JsonAdapter.deserialize("[{").unwrap_err();
        assert!(matches!(err, VaultDbError::Json(_)));
    }
}
