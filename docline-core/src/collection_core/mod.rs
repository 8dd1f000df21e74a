// docline-core/src/collection_core/mod.rs
// Collection façade: CRUD, queries, indexes and lifecycle over one line store
//
// ├── Construction & lifecycle   new, from_documents, open, open_store,
// │                              with_open, flush, close, Drop
// ├── Table access               len, contains_id, ids, documents,
// │                              get, set, delete, insert_one, update_many, clear
// ├── Queries                    find, find_ids, find_one
// ├── Filtered mutation          replace_one, delete_one, delete_many
// └── Indexes & export           build_index, index, list_indexes, dump_to

mod cursor;

use std::fmt;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

pub use self::cursor::FindResults;

use crate::document::{canonical_document, canonicalize, Document, DocumentId};
use crate::error::{DoclineError, Result};
use crate::index::Index;
use crate::options::{CollectionOptions, OpenMode, MEMORY};
use crate::query::{is_primary_key_only, ParsedFilter};
use crate::resolver::resolve;
use crate::storage::{FileStore, LineStore, MemoryStore, Persistence};
use crate::table::DocumentTable;
use crate::{log_debug, log_error, logging};

/// An embedded document collection backed by a JSON-lines resource
///
/// The collection exclusively owns its documents, indexes and backing store.
/// Mutations stay in memory until [`Collection::flush`] (or `close`, or drop)
/// rewrites the store.
pub struct Collection {
    options: CollectionOptions,
    table: DocumentTable,
    persistence: Persistence,
}

impl Collection {
    // ========== CONSTRUCTION & LIFECYCLE ==========

    /// Empty in-memory collection
    pub fn new(options: CollectionOptions) -> Self {
        logging::init_from_env();
        let table = DocumentTable::new(options.primary_key.clone(), options.dotted_key_fallback);
        Collection {
            options,
            table,
            persistence: Persistence::new(Box::new(MemoryStore::new())),
        }
    }

    /// In-memory collection seeded with `docs`.
    ///
    /// Every document must carry its primary key. Seeding is not a mutation:
    /// the collection starts without pending changes.
    pub fn from_documents<I, D>(docs: I, options: CollectionOptions) -> Result<Self>
    where
        I: IntoIterator<Item = D>,
        D: Serialize,
    {
        let mut collection = Collection::new(options);
        for doc in docs {
            collection.table.load(canonical_document(&doc)?)?;
        }
        Ok(collection)
    }

    /// Open a collection file, or the in-memory collection for `":memory:"`.
    ///
    /// Errors opening the file surface; a file that opens but cannot be read
    /// yields an empty collection.
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode, options: CollectionOptions) -> Result<Self> {
        let path = path.as_ref();
        log_debug!("Open collection '{}'.", path.display());
        let store: Box<dyn LineStore> = if path.as_os_str() == MEMORY {
            Box::new(MemoryStore::new())
        } else {
            Box::new(FileStore::open(path, mode)?)
        };
        Self::open_store(store, options)
    }

    /// Open a collection over any line store
    pub fn open_store(store: Box<dyn LineStore>, options: CollectionOptions) -> Result<Self> {
        let mut collection = Collection::new(options);
        collection.persistence = Persistence::new(store);
        for doc in collection.persistence.load()? {
            collection.table.load(doc)?;
        }
        collection.table.refresh_indexes()?;
        Ok(collection)
    }

    /// Open `path`, run `f`, and close the collection on every exit path.
    ///
    /// An error from `f` wins over an error from closing.
    pub fn with_open<P, F, T>(path: P, mode: OpenMode, options: CollectionOptions, f: F) -> Result<T>
    where
        P: AsRef<Path>,
        F: FnOnce(&mut Collection) -> Result<T>,
    {
        let mut collection = Collection::open(path, mode, options)?;
        let outcome = f(&mut collection);
        let closed = collection.close();
        let value = outcome?;
        closed?;
        Ok(value)
    }

    pub fn options(&self) -> &CollectionOptions {
        &self.options
    }

    pub fn primary_key(&self) -> &str {
        &self.options.primary_key
    }

    pub fn is_closed(&self) -> bool {
        self.table.is_closed()
    }

    /// Whether mutations are waiting for a flush
    pub fn requires_flush(&self) -> bool {
        self.persistence.requires_flush()
    }

    /// Rewrite the backing store if anything changed since the last load or
    /// flush
    pub fn flush(&mut self) -> Result<()> {
        let docs = self.table.documents()?;
        self.persistence.flush(docs.values())
    }

    /// Flush, release the store and drop all in-memory state.
    ///
    /// Closing a closed collection does nothing. The store is released even
    /// when the flush fails; the flush error is returned.
    pub fn close(&mut self) -> Result<()> {
        if self.table.is_closed() {
            return Ok(());
        }
        let flushed = self.flush();
        if let Some(store) = self.persistence.detach() {
            log_debug!("Closed collection '{}'.", store.describe());
        }
        self.table.close();
        flushed
    }

    // ========== TABLE ACCESS ==========

    pub fn len(&self) -> Result<usize> {
        self.table.len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.table.is_empty()
    }

    pub fn contains_id(&self, id: &str) -> Result<bool> {
        self.table.contains(id)
    }

    /// Ids in table order
    pub fn ids(&self) -> Result<impl Iterator<Item = &DocumentId> + '_> {
        Ok(self.table.documents()?.keys())
    }

    /// Documents in table order
    pub fn documents(&self) -> Result<impl Iterator<Item = &Document> + '_> {
        Ok(self.table.documents()?.values())
    }

    /// Copy of the document stored under `id`
    pub fn get(&self, id: &str) -> Result<Document> {
        self.table.get(id)
    }

    /// Store `doc` under `id`, replacing any previous document
    pub fn set<D: Serialize + ?Sized>(&mut self, id: &str, doc: &D) -> Result<()> {
        let doc = canonical_document(doc)?;
        self.table.set(id, doc)?;
        self.persistence.mark_modified();
        Ok(())
    }

    /// Remove the document stored under `id`
    pub fn delete(&mut self, id: &str) -> Result<Document> {
        let doc = self.table.delete(id)?;
        self.persistence.mark_modified();
        Ok(doc)
    }

    /// Insert `doc`, generating a primary key when it has none
    pub fn insert_one<D: Serialize + ?Sized>(&mut self, doc: &D) -> Result<DocumentId> {
        let doc = canonical_document(doc)?;
        let id = self.table.insert_auto_key(doc)?;
        self.persistence.mark_modified();
        Ok(id)
    }

    /// Upsert every document by its own primary key (generated when absent)
    pub fn update_many<I, D>(&mut self, docs: I) -> Result<Vec<DocumentId>>
    where
        I: IntoIterator<Item = D>,
        D: Serialize,
    {
        docs.into_iter().map(|doc| self.insert_one(&doc)).collect()
    }

    /// Remove every document and index
    pub fn clear(&mut self) -> Result<()> {
        self.table.clear()?;
        self.persistence.mark_modified();
        Ok(())
    }

    // ========== QUERIES ==========

    /// Ids of documents matching `filter`, in table order.
    /// `limit == 0` returns every match.
    pub fn find_ids<F: Serialize + ?Sized>(&mut self, filter: &F, limit: usize) -> Result<Vec<DocumentId>> {
        self.table.documents()?;
        let filter = canonicalize(filter)?;
        let parsed = ParsedFilter::parse(&filter, &self.options.primary_key)?;
        resolve(&mut self.table, &parsed, limit, self.options.auto_build_indexes)
    }

    /// Lazy view over the documents matching `filter`
    pub fn find<F: Serialize + ?Sized>(&mut self, filter: &F, limit: usize) -> Result<FindResults<'_>> {
        let ids = self.find_ids(filter, limit)?;
        Ok(FindResults::new(self.table.documents()?, ids))
    }

    /// First matching document, if any
    pub fn find_one<F: Serialize + ?Sized>(&mut self, filter: &F) -> Result<Option<Document>> {
        Ok(self.find(filter, 1)?.first())
    }

    // ========== FILTERED MUTATION ==========

    /// Replace the first document matching `filter` with `replacement`.
    ///
    /// A filter that is exactly `{primary_key: id}` writes `id` directly,
    /// creating it when absent. Otherwise, with no match, `upsert` inserts the
    /// replacement as a new document. Returns the id written, if any.
    pub fn replace_one<F, D>(&mut self, filter: &F, replacement: &D, upsert: bool) -> Result<Option<DocumentId>>
    where
        F: Serialize + ?Sized,
        D: Serialize + ?Sized,
    {
        self.table.documents()?;
        let filter = canonicalize(filter)?;
        if is_primary_key_only(&filter, &self.options.primary_key) {
            let id = match &filter[&self.options.primary_key] {
                Value::String(id) => id.clone(),
                other => return Err(DoclineError::InvalidKeyType(other.to_string())),
            };
            self.set(&id, replacement)?;
            return Ok(Some(id));
        }

        match self.find_ids(&filter, 0)?.into_iter().next() {
            Some(id) => {
                self.set(&id, replacement)?;
                Ok(Some(id))
            }
            None if upsert => self.insert_one(replacement).map(Some),
            None => Ok(None),
        }
    }

    /// Delete the first document matching `filter`; returns the count deleted
    pub fn delete_one<F: Serialize + ?Sized>(&mut self, filter: &F) -> Result<u64> {
        let ids = self.find_ids(filter, 1)?;
        self.delete_ids(ids)
    }

    /// Delete every document matching `filter`; returns the count deleted
    pub fn delete_many<F: Serialize + ?Sized>(&mut self, filter: &F) -> Result<u64> {
        let ids = self.find_ids(filter, 0)?;
        self.delete_ids(ids)
    }

    fn delete_ids(&mut self, ids: Vec<DocumentId>) -> Result<u64> {
        let mut deleted = 0;
        for id in ids {
            self.delete(&id)?;
            deleted += 1;
        }
        Ok(deleted)
    }

    // ========== INDEXES & EXPORT ==========

    /// Build (or rebuild) the index for a dotted path from all documents
    pub fn build_index(&mut self, path: &str) -> Result<()> {
        if path == self.options.primary_key {
            return Err(DoclineError::PrimaryKeyIndex(path.to_string()));
        }
        self.table.build_index(path)
    }

    /// Raw, up-to-date index for `path`.
    ///
    /// A missing index is built when `build` is set and reported as
    /// `NoSuchIndex` otherwise.
    pub fn index(&mut self, path: &str, build: bool) -> Result<&Index> {
        self.table.index(path, build)
    }

    /// Paths that currently have an index
    pub fn list_indexes(&self) -> Vec<String> {
        self.table.list_indexes()
    }

    /// Write every document as one JSON line, in table order
    pub fn dump_to<W: Write>(&self, sink: &mut W) -> Result<()> {
        for doc in self.table.documents()?.values() {
            serde_json::to_writer(&mut *sink, doc)?;
            sink.write_all(b"\n")?;
        }
        Ok(())
    }
}

impl Default for Collection {
    fn default() -> Self {
        Collection::new(CollectionOptions::default())
    }
}

impl Drop for Collection {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log_error!("Failed to flush collection on drop: {}", err);
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Collection file={}>", self.persistence.describe())
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("store", &self.persistence.describe())
            .field("primary_key", &self.options.primary_key)
            .field("closed", &self.table.is_closed())
            .finish()
    }
}
