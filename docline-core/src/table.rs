// docline-core/src/table.rs
//! Document table: primary key -> document, the dirty set and the indexes
//! derived from them.
//!
//! The table is the single source of truth. Indexes are reconciled lazily:
//! mutations only record the id in the dirty set, and [`DocumentTable::refresh_indexes`]
//! folds the dirty ids back into every existing index. Deletions are the
//! exception and are purged from all indexes immediately.

use ahash::AHashSet;
use indexmap::IndexMap;

use crate::document::{bind_primary_key, ensure_primary_key, primary_key_of, Document, DocumentId};
use crate::error::{DoclineError, Result};
use crate::index::{Index, IndexManager};

pub struct DocumentTable {
    /// `None` once closed
    docs: Option<IndexMap<DocumentId, Document>>,
    dirty: AHashSet<DocumentId>,
    indexes: IndexManager,
    primary_key: String,
}

impl DocumentTable {
    pub fn new(primary_key: impl Into<String>, dotted_fallback: bool) -> Self {
        DocumentTable {
            docs: Some(IndexMap::new()),
            dirty: AHashSet::new(),
            indexes: IndexManager::new(dotted_fallback),
            primary_key: primary_key.into(),
        }
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn dotted_fallback(&self) -> bool {
        self.indexes.dotted_fallback()
    }

    pub fn is_closed(&self) -> bool {
        self.docs.is_none()
    }

    /// All documents in table order
    pub fn documents(&self) -> Result<&IndexMap<DocumentId, Document>> {
        self.docs.as_ref().ok_or(DoclineError::ClosedCollection)
    }

    fn documents_mut(&mut self) -> Result<&mut IndexMap<DocumentId, Document>> {
        self.docs.as_mut().ok_or(DoclineError::ClosedCollection)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.documents()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.documents()?.is_empty())
    }

    pub fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.documents()?.contains_key(id))
    }

    /// Position of `id` in table order
    pub fn position(&self, id: &str) -> Option<usize> {
        self.docs.as_ref()?.get_index_of(id)
    }

    /// Copy of the document stored under `id`
    pub fn get(&self, id: &str) -> Result<Document> {
        self.documents()?
            .get(id)
            .cloned()
            .ok_or_else(|| DoclineError::NotFound(id.to_string()))
    }

    /// Store a canonical document under `id`.
    ///
    /// The document's primary-key field is filled in when missing and must
    /// equal `id` otherwise. An existing id keeps its table position.
    pub fn set(&mut self, id: &str, mut doc: Document) -> Result<()> {
        self.documents()?;
        bind_primary_key(&mut doc, &self.primary_key, id)?;
        self.documents_mut()?.insert(id.to_string(), doc);
        self.dirty.insert(id.to_string());
        Ok(())
    }

    /// Store a document under its own key, generating one when absent
    pub fn insert_auto_key(&mut self, mut doc: Document) -> Result<DocumentId> {
        self.documents()?;
        let id = ensure_primary_key(&mut doc, &self.primary_key)?;
        self.set(&id, doc)?;
        Ok(id)
    }

    /// Store a document that must already carry its key (initial loads)
    pub fn load(&mut self, doc: Document) -> Result<DocumentId> {
        let id = primary_key_of(&doc, &self.primary_key)?
            .ok_or_else(|| DoclineError::MissingPrimaryKey(self.primary_key.clone()))?;
        self.set(&id, doc)?;
        Ok(id)
    }

    /// Remove and return the document stored under `id`
    pub fn delete(&mut self, id: &str) -> Result<Document> {
        let doc = self
            .documents_mut()?
            .shift_remove(id)
            .ok_or_else(|| DoclineError::NotFound(id.to_string()))?;
        self.indexes.purge(id);
        self.dirty.remove(id);
        Ok(doc)
    }

    /// Empty the table, its indexes and the dirty set
    pub fn clear(&mut self) -> Result<()> {
        self.documents_mut()?.clear();
        self.indexes.clear();
        self.dirty.clear();
        Ok(())
    }

    /// Release all in-memory state; every later access fails
    pub fn close(&mut self) {
        self.docs = None;
        self.indexes.clear();
        self.dirty.clear();
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Fold the dirty set into every existing index, then clear it
    pub fn refresh_indexes(&mut self) -> Result<()> {
        let docs = self.docs.as_ref().ok_or(DoclineError::ClosedCollection)?;
        self.indexes.refresh(&self.dirty, docs);
        self.dirty.clear();
        Ok(())
    }

    /// (Re)build the index for `path` from every document in the table
    pub fn build_index(&mut self, path: &str) -> Result<()> {
        let docs = self.docs.as_ref().ok_or(DoclineError::ClosedCollection)?;
        self.indexes.build(path, docs);
        Ok(())
    }

    /// Up-to-date index for `path`.
    ///
    /// A missing index is built from the whole table when `build` is set and
    /// reported as `NoSuchIndex` otherwise. The primary key has no index.
    pub fn index(&mut self, path: &str, build: bool) -> Result<&Index> {
        self.documents()?;
        if path == self.primary_key {
            return Err(DoclineError::PrimaryKeyIndex(path.to_string()));
        }
        if !self.indexes.contains(path) {
            if !build {
                return Err(DoclineError::NoSuchIndex(path.to_string()));
            }
            self.build_index(path)?;
        }
        self.refresh_indexes()?;
        self.indexes
            .get(path)
            .ok_or_else(|| DoclineError::NoSuchIndex(path.to_string()))
    }

    pub fn has_index(&self, path: &str) -> bool {
        self.indexes.contains(path)
    }

    pub fn list_indexes(&self) -> Vec<String> {
        self.indexes.list_indexes()
    }
}
