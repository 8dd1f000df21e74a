// src/index.rs
// Per-path equality indexes: encoded leaf value -> set of primary keys

use ahash::{AHashMap, AHashSet};
use indexmap::IndexMap;
use serde_json::Value;

use crate::document::{Document, DocumentId};
use crate::value_utils::{encode_json, lookup_path, path_segments, PATH_SEPARATOR};
use crate::{log_debug, log_trace, log_warn_once};

/// Index key - a leaf value in hashable form
///
/// Scalars are used as they are. Sequences (and mappings found at an indexed
/// path) are keyed by their canonical JSON text, in variants of their own so
/// they can never collide with a string that happens to look like JSON.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    Null,
    Bool(bool),
    Int(i64),
    /// Integers above `i64::MAX`
    UInt(u64),
    Float(OrderedFloat),
    String(String),
    Sequence(String),
    Mapping(String),
}

/// f64 wrapper with total equality and hashing (bitwise, NaN == NaN)
#[derive(Debug, Clone, Copy)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for OrderedFloat {}

impl std::hash::Hash for OrderedFloat {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl From<&Value> for IndexKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => IndexKey::Null,
            Value::Bool(b) => IndexKey::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    IndexKey::Int(i)
                } else if let Some(u) = n.as_u64() {
                    IndexKey::UInt(u)
                } else if let Some(f) = n.as_f64() {
                    // 1.0 and 1 must land in the same bucket
                    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                        IndexKey::Int(f as i64)
                    } else if f.fract() == 0.0 && f >= 0.0 && f < u64::MAX as f64 {
                        IndexKey::UInt(f as u64)
                    } else {
                        // -0.0 and 0.0 already normalised above
                        IndexKey::Float(OrderedFloat(f))
                    }
                } else {
                    IndexKey::Null
                }
            }
            Value::String(s) => IndexKey::String(s.clone()),
            Value::Array(_) => IndexKey::Sequence(encode_json(value)),
            Value::Object(_) => IndexKey::Mapping(encode_json(value)),
        }
    }
}

/// Keys under which `doc` belongs in the index for `segments`.
///
/// The value found by walking the path, plus (with `dotted_fallback`) the
/// value stored under the literal dotted key at top level. A document missing
/// the path contributes nothing.
pub fn document_keys(
    doc: &Document,
    path: &str,
    segments: &[&str],
    dotted_fallback: bool,
) -> Vec<IndexKey> {
    let mut keys = Vec::with_capacity(1);
    if let Some(value) = lookup_path(doc, segments) {
        keys.push(IndexKey::from(value));
    }
    if dotted_fallback && segments.len() > 1 {
        if let Some(value) = doc.get(path) {
            log_warn_once!(
                "dotted-key-fallback",
                "Using keys with dots ('{}') is deprecated and will stop being indexed",
                PATH_SEPARATOR
            );
            let key = IndexKey::from(value);
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }
    keys
}

/// Equality index over one dotted path
#[derive(Debug, Clone, Default)]
pub struct Index {
    path: String,
    buckets: AHashMap<IndexKey, AHashSet<DocumentId>>,
    /// Reverse map so removals only touch buckets that hold the id
    keys_by_id: AHashMap<DocumentId, Vec<IndexKey>>,
}

impl Index {
    pub fn new(path: impl Into<String>) -> Self {
        Index {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Build an index for `path` from a snapshot of `(id, document)` pairs
    pub fn build<'a, I>(docs: I, path: &str, dotted_fallback: bool) -> Self
    where
        I: IntoIterator<Item = (&'a DocumentId, &'a Document)>,
    {
        let mut index = Index::new(path);
        let segments = path_segments(path);
        for (id, doc) in docs {
            index.add_document(id, doc, &segments, dotted_fallback);
        }
        index
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Ids stored under `key`, if any
    pub fn bucket(&self, key: &IndexKey) -> Option<&AHashSet<DocumentId>> {
        self.buckets.get(key)
    }

    /// Ids stored under `key` (possibly empty)
    pub fn get(&self, key: &IndexKey) -> AHashSet<DocumentId> {
        self.buckets.get(key).cloned().unwrap_or_default()
    }

    /// Ids whose document holds `value` at this path
    pub fn lookup(&self, value: &Value) -> AHashSet<DocumentId> {
        self.get(&IndexKey::from(value))
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &IndexKey> {
        self.buckets.keys()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.keys_by_id.contains_key(id)
    }

    pub fn insert(&mut self, key: IndexKey, id: DocumentId) {
        let keys = self.keys_by_id.entry(id.clone()).or_default();
        if !keys.contains(&key) {
            keys.push(key.clone());
        }
        self.buckets.entry(key).or_default().insert(id);
    }

    /// Drop `id` from every bucket, deleting buckets left empty.
    /// Returns whether the id was present.
    pub fn remove_id(&mut self, id: &str) -> bool {
        let Some(keys) = self.keys_by_id.remove(id) else {
            return false;
        };
        for key in keys {
            if let Some(bucket) = self.buckets.get_mut(&key) {
                bucket.remove(id);
                if bucket.is_empty() {
                    self.buckets.remove(&key);
                }
            }
        }
        true
    }

    fn add_document(&mut self, id: &DocumentId, doc: &Document, segments: &[&str], fallback: bool) {
        for key in document_keys(doc, &self.path, segments, fallback) {
            self.insert(key, id.clone());
        }
    }
}

/// All indexes of one collection, keyed by dotted path
#[derive(Debug, Clone, Default)]
pub struct IndexManager {
    indexes: AHashMap<String, Index>,
    dotted_fallback: bool,
}

impl IndexManager {
    pub fn new(dotted_fallback: bool) -> Self {
        IndexManager {
            indexes: AHashMap::new(),
            dotted_fallback,
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.indexes.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&Index> {
        self.indexes.get(path)
    }

    /// Build (or rebuild) the index for `path` from the whole table
    pub fn build(&mut self, path: &str, docs: &IndexMap<DocumentId, Document>) {
        log_debug!("Building index for key '{}'...", path);
        let index = Index::build(docs, path, self.dotted_fallback);
        log_debug!("Built index for key '{}' ({} keys).", path, index.len());
        self.indexes.insert(path.to_string(), index);
    }

    /// Reconcile every index with the table for the `dirty` ids.
    ///
    /// Each dirty id is removed from all buckets first, then whatever the
    /// current document contributes is merged back in. Ids no longer in the
    /// table simply stay removed.
    pub fn refresh(&mut self, dirty: &AHashSet<DocumentId>, docs: &IndexMap<DocumentId, Document>) {
        if dirty.is_empty() || self.indexes.is_empty() {
            return;
        }
        log_trace!(
            "Refreshing {} indexes for {} dirty documents",
            self.indexes.len(),
            dirty.len()
        );
        let fallback = self.dotted_fallback;
        for index in self.indexes.values_mut() {
            for id in dirty {
                index.remove_id(id);
            }
            let path = index.path.clone();
            let segments = path_segments(&path);
            for id in dirty {
                if let Some(doc) = docs.get(id) {
                    index.add_document(id, doc, &segments, fallback);
                }
            }
        }
    }

    /// Remove `id` from every index immediately
    pub fn purge(&mut self, id: &str) {
        for index in self.indexes.values_mut() {
            index.remove_id(id);
        }
    }

    pub fn clear(&mut self) {
        self.indexes.clear();
    }

    /// Indexed paths, sorted
    pub fn list_indexes(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.indexes.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn dotted_fallback(&self) -> bool {
        self.dotted_fallback
    }
}
