mod id;

pub use id::{IdGenerator, ID_LEN};

use crate::adapter::Adapter;
use crate::document::{Document, Value, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD};
use crate::error::{Result, VaultDbError};
use crate::query::Query;
use crate::schema::Schema;
use crate::storage;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Ordering of `find` results by `createdAt`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// A handle to one collection file.
///
/// Every operation reloads the whole file through the adapter, works on the
/// documents in memory, and (when it mutates) writes the whole file back.
/// All checks run before that single write, so a failed call never leaves a
/// partial file behind.
///
/// There is no locking. Two callers mutating the same file at the same time
/// race: each reads, mutates and rewrites the full sequence, and the last
/// write wins. Use one handle per file from one thread of control, or wrap
/// calls in your own lock.
pub struct Collection {
    name: String,
    path: PathBuf,
    schema: Arc<Schema>,
    adapter: Arc<dyn Adapter>,
    ids: IdGenerator,
}

impl Collection {
    /// Open a collection file, creating it with an empty sequence if missing.
    pub fn open(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        schema: Arc<Schema>,
        adapter: Arc<dyn Adapter>,
    ) -> Result<Self> {
        let collection = Collection {
            name: name.into(),
            path: path.into(),
            schema,
            adapter,
            ids: IdGenerator::new(),
        };

        if !collection.path.exists() {
            log::info!(
                "Creating collection '{}' at {}",
                collection.name,
                collection.path.display()
            );
            collection.persist(&[])?;
        }

        Ok(collection)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    // ── Inserts ────────────────────────────────────────────────────

    /// Insert a single document. Returns the stored document with its metadata.
    pub fn insert_one(&self, document: Document) -> Result<Document> {
        let mut inserted = self.insert_many(vec![document])?;
        Ok(inserted.remove(0))
    }

    /// Insert a batch of documents. The batch is all-or-nothing.
    ///
    /// Unique fields are only checked against documents already stored;
    /// two documents in the same batch sharing a new unique value are both
    /// accepted.
    pub fn insert_many(&self, documents: Vec<Document>) -> Result<Vec<Document>> {
        let mut stored = self.load()?;

        let candidates: Vec<Document> = documents
            .iter()
            .map(Document::without_metadata)
            .collect();

        for candidate in &candidates {
            self.schema.validate(candidate).into_result()?;
        }

        let index = self.unique_index(&stored, None);
        for candidate in &candidates {
            self.check_unique(&index, candidate)?;
        }

        let now = Utc::now();
        let inserted: Vec<Document> = candidates
            .into_iter()
            .map(|mut doc| {
                doc.insert(ID_FIELD, self.ids.next_id());
                doc.insert(CREATED_AT_FIELD, now);
                doc.insert(UPDATED_AT_FIELD, now);
                doc
            })
            .collect();

        stored.extend(inserted.iter().cloned());
        self.persist(&stored)?;
        log::debug!(
            "Inserted {} document(s) into '{}'",
            inserted.len(),
            self.name
        );
        Ok(inserted)
    }

    // ── Reads ──────────────────────────────────────────────────────

    /// Documents matching `query` (all when `None`), ordered by `createdAt`.
    pub fn find(&self, query: Option<&Query>, order: SortOrder) -> Result<Vec<Document>> {
        let mut documents: Vec<Document> = self
            .load()?
            .into_iter()
            .filter(|doc| query.map(|q| q.matches(doc)).unwrap_or(true))
            .collect();

        documents.sort_by(|a, b| {
            let ordering = a.created_at().cmp(&b.created_at());
            match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });
        Ok(documents)
    }

    pub fn find_by_id(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.load()?.into_iter().find(|doc| doc.id() == Some(id)))
    }

    /// Number of documents matching `query` (all when `None`).
    pub fn count(&self, query: Option<&Query>) -> Result<usize> {
        let documents = self.load()?;
        Ok(match query {
            Some(q) => documents.iter().filter(|doc| q.matches(doc)).count(),
            None => documents.len(),
        })
    }

    // ── Deletes ────────────────────────────────────────────────────

    /// Remove the first document matching `query`. Returns the removed document.
    pub fn delete_one(&self, query: &Query) -> Result<Document> {
        let mut documents = self.load()?;
        let position = documents
            .iter()
            .position(|doc| query.matches(doc))
            .ok_or_else(|| self.not_found(query.to_string()))?;
        self.remove_at(&mut documents, position)
    }

    pub fn delete_by_id(&self, id: &str) -> Result<Document> {
        let mut documents = self.load()?;
        let position = position_of_id(&documents, id).ok_or_else(|| self.id_not_found(id))?;
        self.remove_at(&mut documents, position)
    }

    fn remove_at(&self, documents: &mut Vec<Document>, position: usize) -> Result<Document> {
        let removed = documents.remove(position);
        self.persist(documents)?;
        log::debug!(
            "Deleted document {} from '{}'",
            removed.id().unwrap_or("<no id>"),
            self.name
        );
        Ok(removed)
    }

    // ── Updates ────────────────────────────────────────────────────

    /// Merge `patch` into the first document matching `query`.
    pub fn update_one(&self, query: &Query, patch: Document) -> Result<Document> {
        let mut documents = self.load()?;
        let position = documents
            .iter()
            .position(|doc| query.matches(doc))
            .ok_or_else(|| self.not_found(query.to_string()))?;
        self.update_at(&mut documents, position, patch)
    }

    /// Merge `patch` into the document with the given `_id`.
    pub fn update_by_id(&self, id: &str, patch: Document) -> Result<Document> {
        let mut documents = self.load()?;
        let position = position_of_id(&documents, id).ok_or_else(|| self.id_not_found(id))?;
        self.update_at(&mut documents, position, patch)
    }

    /// Shared update path: merge, validate, check uniqueness, then write
    /// unless the merge changed nothing.
    fn update_at(
        &self,
        documents: &mut [Document],
        position: usize,
        patch: Document,
    ) -> Result<Document> {
        // `_id` and `createdAt` are immutable, `updatedAt` is ours to set
        let patch = patch.without_metadata();
        let original = &documents[position];

        let mut merged = original.clone();
        merged.merge(&patch);
        self.schema.validate(&merged).into_result()?;

        let index = self.unique_index(documents, Some(position));
        self.check_unique(&index, &patch)?;

        if merged == *original {
            log::debug!(
                "Update of {} in '{}' changed nothing, skipping write",
                original.id().unwrap_or("<no id>"),
                self.name
            );
            return Ok(merged);
        }

        merged.insert(UPDATED_AT_FIELD, Utc::now());
        documents[position] = merged.clone();
        self.persist(documents)?;
        Ok(merged)
    }

    // ── Unique constraints ─────────────────────────────────────────

    /// Existing values of every unique field, optionally skipping one position.
    ///
    /// `Value` holds `f64` and is not `Hash`, so each field keeps a plain list
    /// and lookups scan it linearly.
    fn unique_index<'a>(
        &self,
        documents: &'a [Document],
        skip: Option<usize>,
    ) -> HashMap<String, Vec<&'a Value>> {
        let mut index = HashMap::new();
        for field in self.schema.unique_fields() {
            let values: Vec<&Value> = documents
                .iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != skip)
                .filter_map(|(_, doc)| doc.get(field))
                .collect();
            index.insert(field.clone(), values);
        }
        index
    }

    fn check_unique(&self, index: &HashMap<String, Vec<&Value>>, candidate: &Document) -> Result<()> {
        for field in self.schema.unique_fields() {
            let Some(value) = candidate.get(field) else {
                continue;
            };
            let taken = index
                .get(field)
                .map(|existing| existing.contains(&value))
                .unwrap_or(false);
            if taken {
                return Err(VaultDbError::DuplicateKey {
                    collection: self.name.clone(),
                    field: field.clone(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    // ── Storage ────────────────────────────────────────────────────

    fn load(&self) -> Result<Vec<Document>> {
        let text = storage::read_collection(&self.path)?;
        let documents = self.adapter.deserialize(&text)?;
        log::debug!("Loaded {} document(s) from '{}'", documents.len(), self.name);
        Ok(documents)
    }

    fn persist(&self, documents: &[Document]) -> Result<()> {
        let text = self.adapter.serialize(documents)?;
        storage::write_collection(&self.path, &text)?;
        log::debug!("Persisted {} document(s) to '{}'", documents.len(), self.name);
        Ok(())
    }

    fn not_found(&self, criteria: String) -> VaultDbError {
        VaultDbError::NotFound {
            collection: self.name.clone(),
            criteria,
        }
    }

    fn id_not_found(&self, id: &str) -> VaultDbError {
        self.not_found(format!("{{ \"{ID_FIELD}\": \"{id}\" }}"))
    }
}

fn position_of_id(documents: &[Document], id: &str) -> Option<usize> {
    documents.iter().position(|doc| doc.id() == Some(id))
}
