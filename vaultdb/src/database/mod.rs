use crate::adapter::{Adapter, Credentials, EncryptedAdapter};
use crate::collection::Collection;
use crate::error::Result;
use crate::schema::Schema;
use crate::storage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default collection file extension.
pub const DEFAULT_EXTENSION: &str = "vdb";

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

/// Where collections live and how they are encoded
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub directory: PathBuf,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl DatabaseConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        DatabaseConfig {
            directory: directory.into(),
            extension: default_extension(),
            username: None,
            password: None,
        }
    }

    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Load a YAML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    fn credential_pair(&self) -> Option<Credentials> {
        Credentials::from_parts(self.username.as_deref(), self.password.as_deref())
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("directory", &self.directory)
            .field("extension", &self.extension)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// A directory of collection files sharing one adapter.
pub struct Database {
    config: DatabaseConfig,
    adapter: Arc<dyn Adapter>,
}

impl Database {
    /// Open a database directory, creating it if needed.
    ///
    /// Collections are encrypted when both `username` and `password` are set.
    pub fn open(config: DatabaseConfig) -> Result<Self> {
        let adapter = EncryptedAdapter::new(config.credential_pair())?;
        Self::with_adapter(config, Arc::new(adapter))
    }

    /// Open a database directory with a caller-supplied codec.
    pub fn with_adapter(config: DatabaseConfig, adapter: Arc<dyn Adapter>) -> Result<Self> {
        storage::ensure_dir(&config.directory)?;
        log::debug!("Opened database at {}", config.directory.display());
        Ok(Database { config, adapter })
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    /// Path of the file backing `name`
    pub fn collection_path(&self, name: &str) -> PathBuf {
        self.config
            .directory
            .join(format!("{name}.{}", self.config.extension))
    }

    /// Get a handle to a collection, creating its file if missing.
    pub fn collection(&self, name: &str, schema: impl Into<Arc<Schema>>) -> Result<Collection> {
        Collection::open(
            name,
            self.collection_path(name),
            schema.into(),
            Arc::clone(&self.adapter),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::JsonAdapter;
    use crate::collection::SortOrder;
    use crate::doc;
    use crate::schema::parse_schema_str;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn schema() -> Schema {
        parse_schema_str("title: { type: string, required: true, unique: true }").unwrap()
    }

    #[test]
    fn test_open_creates_directory_and_file() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("data");
        let db = Database::open(DatabaseConfig::new(&dir)).unwrap();
        assert!(dir.is_dir());

        let notes = db.collection("notes", schema()).unwrap();
        assert_eq!(notes.path(), dir.join("notes.vdb"));
        assert!(notes.path().exists());
    }

    #[test]
    fn test_custom_extension() {
        let tmp = TempDir::new().unwrap();
        let db = Database::open(DatabaseConfig::new(tmp.path()).extension("json")).unwrap();
        assert_eq!(db.collection_path("notes"), tmp.path().join("notes.json"));
    }

    #[test]
    fn test_credentials_enable_encryption() {
        let tmp = TempDir::new().unwrap();
        let config = DatabaseConfig::new(tmp.path()).credentials("admin", "secret");
        let db = Database::open(config.clone()).unwrap();
        let notes = db.collection("notes", schema()).unwrap();
        notes.insert_one(doc! { "title" => "hello" }).unwrap();

        let raw = std::fs::read_to_string(notes.path()).unwrap();
        assert!(!raw.contains("hello"));

        let again = Database::open(config).unwrap().collection("notes", schema()).unwrap();
        let found = again.find(None, SortOrder::Ascending).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_custom_adapter() {
        let tmp = TempDir::new().unwrap();
        let db = Database::with_adapter(DatabaseConfig::new(tmp.path()), Arc::new(JsonAdapter)).unwrap();
        let notes = db.collection("notes", schema()).unwrap();
        notes.insert_one(doc! { "title" => "plain" }).unwrap();
        assert!(std::fs::read_to_string(notes.path()).unwrap().contains("plain"));
    }

    #[test]
    fn test_config_from_yaml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("vaultdb.yaml");
        std::fs::write(&path, "directory: ./data\nusername: admin\npassword: secret\n").unwrap();

        let config = DatabaseConfig::from_file(&path).unwrap();
        assert_eq!(config.directory, PathBuf::from("./data"));
        assert_eq!(config.extension, "vdb");
        assert!(config.credential_pair().is_some());
        assert!(!format!("{config:?}").contains("secret"));
    }
}
