pub mod adapter;
pub mod collection;
pub mod database;
pub mod document;
pub mod error;
pub mod query;
pub mod schema;
pub mod storage;
pub mod validation;

pub use adapter::{Adapter, Credentials, EncryptedAdapter, JsonAdapter};
pub use collection::{Collection, SortOrder};
pub use database::{Database, DatabaseConfig};
pub use document::{Document, Value};
pub use error::{Result, VaultDbError};
pub use query::{Operators, Query};
pub use schema::{parse_schema, parse_schema_str, FieldConfig, FieldKind, Schema};
pub use validation::{ValidationResult, ValidationStatus};
