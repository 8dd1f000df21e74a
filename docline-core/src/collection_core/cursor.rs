// docline-core/src/collection_core/cursor.rs
use indexmap::IndexMap;

use crate::document::{Document, DocumentId};

/// Lazy view over the result of a `find`
///
/// Holds only the matching ids; documents are copied out of the table as
/// they are iterated. The view borrows the collection, so the table cannot
/// change underneath it.
pub struct FindResults<'a> {
    docs: &'a IndexMap<DocumentId, Document>,
    ids: Vec<DocumentId>,
    position: usize,
}

impl<'a> FindResults<'a> {
    pub(crate) fn new(docs: &'a IndexMap<DocumentId, Document>, ids: Vec<DocumentId>) -> Self {
        FindResults {
            docs,
            ids,
            position: 0,
        }
    }

    /// Number of matching documents
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn count(&self) -> usize {
        self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Matching ids in table order
    pub fn ids(&self) -> &[DocumentId] {
        &self.ids
    }

    pub fn into_ids(self) -> Vec<DocumentId> {
        self.ids
    }

    /// Copies of the matching documents
    pub fn iter(&self) -> impl Iterator<Item = Document> + '_ {
        self.ids.iter().filter_map(move |id| self.docs.get(id).cloned())
    }

    pub fn first(&self) -> Option<Document> {
        self.iter().next()
    }

    /// Fetch the next chunk of documents (up to `chunk_size`)
    pub fn next_chunk(&mut self, chunk_size: usize) -> Vec<Document> {
        let end = self.position.saturating_add(chunk_size).min(self.ids.len());
        let chunk = self.ids[self.position..end]
            .iter()
            .filter_map(|id| self.docs.get(id).cloned())
            .collect();
        self.position = end;
        chunk
    }

    /// Documents not yet returned by `next_chunk`
    pub fn remaining(&self) -> usize {
        self.ids.len().saturating_sub(self.position)
    }
}

impl std::fmt::Debug for FindResults<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FindResults").field("ids", &self.ids).finish()
    }
}
