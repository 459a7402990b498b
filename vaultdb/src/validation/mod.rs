use crate::document::{Document, Value};
use crate::error::{Result, VaultDbError};
use crate::schema::{FieldKind, FieldSpec, FieldType, Schema};
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStatus {
    Success,
    Error,
}

/// Result of validating a document: the first failure wins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    pub message: String,
}

impl ValidationResult {
    pub fn success() -> Self {
        ValidationResult {
            status: ValidationStatus::Success,
            message: String::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ValidationResult {
            status: ValidationStatus::Error,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ValidationStatus::Success
    }

    /// Convert an ERROR result into `VaultDbError::Validation`.
    pub fn into_result(self) -> Result<()> {
        match self.status {
            ValidationStatus::Success => Ok(()),
            ValidationStatus::Error => Err(VaultDbError::Validation(self.message)),
        }
    }
}

/// Validate a candidate document against a schema.
///
/// Fields are checked depth-first in declaration order and the first failing
/// field short-circuits. Fields the schema does not declare are ignored.
pub fn validate_document(schema: &Schema, candidate: &Document) -> ValidationResult {
    validate_fields(schema.fields(), candidate.fields())
}

fn validate_fields(
    fields: &IndexMap<String, FieldSpec>,
    candidate: &IndexMap<String, Value>,
) -> ValidationResult {
    for (field_name, spec) in fields {
        match candidate.get(field_name) {
            None => {
                if spec.required {
                    return ValidationResult::error(format!("Field '{field_name}' is required"));
                }
            }
            Some(value) => {
                let result = validate_field_value(field_name, &spec.field_type, value);
                if !result.is_ok() {
                    return result;
                }
            }
        }
    }

    ValidationResult::success()
}

fn validate_field_value(field_name: &str, field_type: &FieldType, value: &Value) -> ValidationResult {
    match field_type {
        FieldType::Array(items) => {
            let elements = match value {
                Value::Array(elements) => elements,
                other => return type_mismatch(field_name, FieldKind::Array, other),
            };
            if let Some(item_kind) = items {
                for (index, element) in elements.iter().enumerate() {
                    if element.kind() != Some(*item_kind) {
                        return ValidationResult::error(format!(
                            "Field '{field_name}' expected items of type {item_kind}, found {} at index {index}",
                            element.type_name()
                        ));
                    }
                }
            }
            ValidationResult::success()
        }
        FieldType::Object(nested) => {
            let object = match value {
                Value::Object(object) => object,
                other => return type_mismatch(field_name, FieldKind::Object, other),
            };
            match nested {
                // Nested failures propagate verbatim
                Some(nested_fields) => validate_fields(nested_fields, object),
                None => ValidationResult::success(),
            }
        }
        // Only a real instant counts; date-like strings and numbers do not
        primitive => {
            let expected = primitive.kind();
            if value.kind() == Some(expected) {
                ValidationResult::success()
            } else {
                type_mismatch(field_name, expected, value)
            }
        }
    }
}

fn type_mismatch(field_name: &str, expected: FieldKind, actual: &Value) -> ValidationResult {
    ValidationResult::error(format!(
        "Field '{field_name}' expected {expected}, got {}",
        actual.type_name()
    ))
}
