use thiserror::Error;

#[derive(Error, Debug)]
pub enum VaultDbError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("E11000 duplicate key error collection: {collection} index: {field}_1 dup key: {{ {field}: {value} }}")]
    DuplicateKey {
        collection: String,
        field: String,
        value: String,
    },

    #[error("No document matching {criteria} in collection '{collection}'")]
    NotFound { collection: String, criteria: String },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, VaultDbError>;
