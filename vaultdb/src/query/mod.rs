// Query predicates - literal equality, comparison and membership operators

use crate::document::{Document, Value};
use crate::error::{Result, VaultDbError};
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::fmt;

/// Per-field operator set. Every operator present must hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Operators {
    pub gt: Option<Value>,
    pub lt: Option<Value>,
    pub gte: Option<Value>,
    pub lte: Option<Value>,
    pub eq: Option<Value>,
    pub ne: Option<Value>,
    pub in_values: Option<Vec<Value>>,
    pub nin_values: Option<Vec<Value>>,
}

impl Operators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gt(mut self, value: impl Into<Value>) -> Self {
        self.gt = Some(value.into());
        self
    }

    pub fn lt(mut self, value: impl Into<Value>) -> Self {
        self.lt = Some(value.into());
        self
    }

    pub fn gte(mut self, value: impl Into<Value>) -> Self {
        self.gte = Some(value.into());
        self
    }

    pub fn lte(mut self, value: impl Into<Value>) -> Self {
        self.lte = Some(value.into());
        self
    }

    pub fn eq(mut self, value: impl Into<Value>) -> Self {
        self.eq = Some(value.into());
        self
    }

    pub fn ne(mut self, value: impl Into<Value>) -> Self {
        self.ne = Some(value.into());
        self
    }

    pub fn is_in<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.in_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn not_in<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.nin_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    fn parse(field: &str, spec: &IndexMap<String, Value>) -> Result<Self> {
        let mut ops = Operators::new();
        for (op, operand) in spec {
            match op.as_str() {
                "$gt" => ops.gt = Some(operand.clone()),
                "$lt" => ops.lt = Some(operand.clone()),
                "$gte" => ops.gte = Some(operand.clone()),
                "$lte" => ops.lte = Some(operand.clone()),
                "$eq" => ops.eq = Some(operand.clone()),
                "$ne" => ops.ne = Some(operand.clone()),
                "$in" => ops.in_values = Some(membership_list(field, op, operand)?),
                "$nin" => ops.nin_values = Some(membership_list(field, op, operand)?),
                unknown => log::warn!("Ignoring unknown query operator '{unknown}' on field '{field}'"),
            }
        }
        Ok(ops)
    }

    /// Evaluate against a field value; `None` means the field is absent.
    pub fn matches(&self, field: Option<&Value>) -> bool {
        let ordered = |bound: &Option<Value>, accept: fn(Ordering) -> bool| match bound {
            None => true,
            Some(bound) => field
                .and_then(|v| v.compare(bound))
                .map(accept)
                .unwrap_or(false),
        };

        if !ordered(&self.gt, |o| o == Ordering::Greater)
            || !ordered(&self.gte, |o| o != Ordering::Less)
            || !ordered(&self.lt, |o| o == Ordering::Less)
            || !ordered(&self.lte, |o| o != Ordering::Greater)
        {
            return false;
        }

        if let Some(expected) = &self.eq {
            if field != Some(expected) {
                return false;
            }
        }
        if let Some(excluded) = &self.ne {
            if field == Some(excluded) {
                return false;
            }
        }
        if let Some(list) = &self.in_values {
            if !field.map(|v| is_member(v, list)).unwrap_or(false) {
                return false;
            }
        }
        if let Some(list) = &self.nin_values {
            if field.map(|v| is_member(v, list)).unwrap_or(false) {
                return false;
            }
        }
        true
    }

    fn to_value(&self) -> Value {
        let mut map = IndexMap::new();
        let scalars = [
            ("$gt", &self.gt),
            ("$lt", &self.lt),
            ("$gte", &self.gte),
            ("$lte", &self.lte),
            ("$eq", &self.eq),
            ("$ne", &self.ne),
        ];
        for (key, operand) in scalars {
            if let Some(v) = operand {
                map.insert(key.to_string(), v.clone());
            }
        }
        if let Some(list) = &self.in_values {
            map.insert("$in".to_string(), Value::Array(list.clone()));
        }
        if let Some(list) = &self.nin_values {
            map.insert("$nin".to_string(), Value::Array(list.clone()));
        }
        Value::Object(map)
    }
}

/// Array fields are members when any element is.
fn is_member(value: &Value, list: &[Value]) -> bool {
    match value {
        Value::Array(elements) => elements.iter().any(|e| list.contains(e)),
        single => list.contains(single),
    }
}

fn membership_list(field: &str, op: &str, operand: &Value) -> Result<Vec<Value>> {
    match operand {
        Value::Array(list) => Ok(list.clone()),
        other => Err(VaultDbError::InvalidQuery(format!(
            "'{op}' on field '{field}' expects an array, got {}",
            other.type_name()
        ))),
    }
}

/// What a single query key asks of its field
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equals(Value),
    Operators(Operators),
    Nested(Query),
}

impl Condition {
    fn matches(&self, field: Option<&Value>) -> bool {
        match self {
            Condition::Equals(expected) => field == Some(expected),
            Condition::Operators(ops) => ops.matches(field),
            Condition::Nested(query) => {
                let empty = IndexMap::new();
                let object = field.and_then(Value::as_object).unwrap_or(&empty);
                query.matches_fields(object)
            }
        }
    }
}

/// A conjunction of per-field conditions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    conditions: IndexMap<String, Condition>,
}

impl Query {
    /// The empty query, which matches every document
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field` to equal `value`.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions
            .insert(field.into(), Condition::Equals(value.into()));
        self
    }

    /// Require `field` to satisfy every operator in `ops`.
    pub fn matching(mut self, field: impl Into<String>, ops: Operators) -> Self {
        self.conditions
            .insert(field.into(), Condition::Operators(ops));
        self
    }

    /// Apply `query` to the object stored under `field`.
    pub fn nested(mut self, field: impl Into<String>, query: Query) -> Self {
        self.conditions.insert(field.into(), Condition::Nested(query));
        self
    }

    /// Parse a query object.
    ///
    /// A value object whose keys all start with `$` is an operator object (the
    /// empty object included); any other object is a nested query.
    pub fn parse(value: &Value) -> Result<Self> {
        let fields = value.as_object().ok_or_else(|| {
            VaultDbError::InvalidQuery(format!("query must be an object, got {}", value.type_name()))
        })?;

        let mut conditions = IndexMap::with_capacity(fields.len());
        for (field, spec) in fields {
            let condition = match spec {
                Value::Object(inner) if inner.keys().all(|k| k.starts_with('$')) => {
                    Condition::Operators(Operators::parse(field, inner)?)
                }
                Value::Object(_) => Condition::Nested(Query::parse(spec)?),
                literal => Condition::Equals(literal.clone()),
            };
            conditions.insert(field.clone(), condition);
        }
        Ok(Query { conditions })
    }

    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        Self::parse(&Value::from(json))
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &IndexMap<String, Condition> {
        &self.conditions
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.matches_fields(document.fields())
    }

    fn matches_fields(&self, fields: &IndexMap<String, Value>) -> bool {
        self.conditions
            .iter()
            .all(|(name, condition)| condition.matches(fields.get(name)))
    }

    pub fn to_value(&self) -> Value {
        let map = self
            .conditions
            .iter()
            .map(|(name, condition)| {
                let v = match condition {
                    Condition::Equals(v) => v.clone(),
                    Condition::Operators(ops) => ops.to_value(),
                    Condition::Nested(q) => q.to_value(),
                };
                (name.clone(), v)
            })
            .collect();
        Value::Object(map)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn q(json: serde_json::Value) -> Query {
        Query::from_json(json).unwrap()
    }

    fn person(name: &str, age: i32) -> Document {
        doc! {
            "name" => name,
            "age" => age,
            "tags" => vec![Value::from("rust"), Value::from("db")],
            "address" => doc! { "city" => "NYC", "zip" => "10001" },
        }
    }

    #[test]
    fn test_empty_query_matches_everything() {
        assert!(q(json!({})).matches(&person("A", 1)));
        assert!(Query::new().matches(&Document::new()));
    }

    #[test]
    fn test_literal_equality() {
        let doc = person("Alice", 30);
        assert!(q(json!({ "name": "Alice" })).matches(&doc));
        assert!(q(json!({ "name": "Alice", "age": 30 })).matches(&doc));
        assert!(!q(json!({ "name": "Alice", "age": 31 })).matches(&doc));
        assert!(!q(json!({ "missing": "x" })).matches(&doc));
        assert!(!q(json!({ "age": "30" })).matches(&doc));
    }

    #[test]
    fn test_range_operators() {
        let query = q(json!({ "age": { "$gte": 18, "$lt": 65 } }));
        assert!(query.matches(&person("a", 18)));
        assert!(query.matches(&person("b", 64)));
        assert!(!query.matches(&person("c", 17)));
        assert!(!query.matches(&person("d", 65)));

        assert!(q(json!({ "age": { "$gt": 10, "$lte": 20 } })).matches(&person("e", 20)));
        assert!(!q(json!({ "age": { "$gt": 20 } })).matches(&person("f", 20)));
    }

    #[test]
    fn test_comparison_needs_same_kind_and_present_field() {
        let doc = person("A", 30);
        assert!(!q(json!({ "age": { "$gt": "10" } })).matches(&doc));
        assert!(!q(json!({ "missing": { "$lt": 100 } })).matches(&doc));
        assert!(q(json!({ "name": { "$gt": "A" } })).matches(&person("B", 1)));
    }

    #[test]
    fn test_date_comparison() {
        let early = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let doc = doc! { "when" => late };
        let query = Query::new().matching("when", Operators::new().gt(early));
        assert!(query.matches(&doc));
        let query = Query::new().matching("when", Operators::new().lt(early));
        assert!(!query.matches(&doc));
    }

    #[test]
    fn test_eq_and_ne() {
        let doc = person("Alice", 30);
        assert!(q(json!({ "age": { "$eq": 30 } })).matches(&doc));
        assert!(!q(json!({ "age": { "$ne": 30 } })).matches(&doc));
        assert!(q(json!({ "age": { "$ne": 31 } })).matches(&doc));
        assert!(!q(json!({ "missing": { "$eq": 1 } })).matches(&doc));
        assert!(q(json!({ "missing": { "$ne": 1 } })).matches(&doc));
    }

    #[test]
    fn test_in_and_nin() {
        let doc = person("Alice", 30);
        assert!(q(json!({ "name": { "$in": ["Alice", "Bob"] } })).matches(&doc));
        assert!(!q(json!({ "name": { "$in": ["Bob"] } })).matches(&doc));
        assert!(q(json!({ "name": { "$nin": ["Bob"] } })).matches(&doc));
        assert!(!q(json!({ "name": { "$nin": ["Alice"] } })).matches(&doc));
        assert!(!q(json!({ "missing": { "$in": [1] } })).matches(&doc));
        assert!(q(json!({ "missing": { "$nin": [1] } })).matches(&doc));
    }

    #[test]
    fn test_membership_on_array_fields() {
        let doc = person("Alice", 30);
        assert!(q(json!({ "tags": { "$in": ["go", "db"] } })).matches(&doc));
        assert!(!q(json!({ "tags": { "$in": ["go"] } })).matches(&doc));
        assert!(!q(json!({ "tags": { "$nin": ["rust"] } })).matches(&doc));
        assert!(q(json!({ "tags": { "$nin": ["go"] } })).matches(&doc));
    }

    #[test]
    fn test_operators_are_anded() {
        let doc = person("Alice", 30);
        assert!(!q(json!({ "age": { "$gt": 10, "$ne": 30 } })).matches(&doc));
        assert!(q(json!({ "age": { "$gt": 10, "$in": [30, 40] } })).matches(&doc));
    }

    #[test]
    fn test_empty_operator_object_always_true() {
        let doc = person("Alice", 30);
        assert!(q(json!({ "age": {} })).matches(&doc));
        assert!(q(json!({ "missing": {} })).matches(&doc));
        assert!(q(json!({ "age": { "$regex": "x" } })).matches(&doc));
    }

    #[test]
    fn test_nested_queries() {
        let doc = person("Alice", 30);
        assert!(q(json!({ "address": { "city": "NYC" } })).matches(&doc));
        assert!(!q(json!({ "address": { "city": "LA" } })).matches(&doc));
        assert!(q(json!({ "address": { "zip": { "$in": ["10001"] } } })).matches(&doc));
        assert!(!q(json!({ "name": { "first": "Alice" } })).matches(&doc));
        assert!(!q(json!({ "missing": { "city": "NYC" } })).matches(&doc));
    }

    #[test]
    fn test_literal_object_via_eq() {
        let doc = person("Alice", 30);
        let query = Query::new().matching(
            "address",
            Operators::new().eq(doc! { "city" => "NYC", "zip" => "10001" }),
        );
        assert!(query.matches(&doc));
    }

    #[test]
    fn test_invalid_queries() {
        assert!(matches!(
            Query::from_json(json!([1])),
            Err(VaultDbError::InvalidQuery(_))
        ));
        assert!(matches!(
            Query::from_json(json!({ "age": { "$in": 30 } })),
            Err(VaultDbError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_builder_matches_parsed() {
        let built = Query::new()
            .eq("name", "Alice")
            .matching("age", Operators::new().gte(18).lt(65))
            .nested("address", Query::new().eq("city", "NYC"));
        let parsed = q(json!({
            "name": "Alice",
            "age": { "$gte": 18, "$lt": 65 },
            "address": { "city": "NYC" },
        }));
        assert_eq!(built, parsed);
        assert_eq!(
            built.to_string(),
            r#"{"name":"Alice","age":{"$lt":65,"$gte":18},"address":{"city":"NYC"}}"#
        );
    }
}
