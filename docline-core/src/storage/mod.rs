// src/storage/mod.rs
//! Persistence layer
//!
//! A collection is persisted as newline-delimited JSON: one complete document
//! per line, no header, no persisted indexes. [`Persistence`] owns the
//! [`LineStore`] and the "requires flush" flag; it loads the documents once at
//! open time and rewrites the whole resource on flush.

mod file_storage;
mod memory_storage;
mod traits;

pub use file_storage::FileStore;
pub use memory_storage::MemoryStore;
pub use traits::LineStore;

use crate::document::Document;
use crate::error::{DoclineError, Result};
use crate::{log_debug, log_warn};

pub struct Persistence {
    store: Option<Box<dyn LineStore>>,
    requires_flush: bool,
}

impl Persistence {
    pub fn new(store: Box<dyn LineStore>) -> Self {
        Persistence {
            store: Some(store),
            requires_flush: false,
        }
    }

    /// Read every document from the store.
    ///
    /// A store that cannot be read is treated as empty (logged, not an
    /// error). A line that is not valid UTF-8 or not a JSON document is
    /// corruption.
    pub fn load(&mut self) -> Result<Vec<Document>> {
        let Some(store) = self.store.as_mut() else {
            return Ok(Vec::new());
        };
        let lines = match store.read_lines() {
            Ok(lines) => lines,
            Err(err) => {
                log_warn!(
                    "Could not read '{}', starting empty: {}",
                    store.describe(),
                    err
                );
                return Ok(Vec::new());
            }
        };

        let mut docs = Vec::with_capacity(lines.len());
        for (number, line) in lines.iter().enumerate() {
            let text = std::str::from_utf8(line).map_err(|err| DoclineError::Corruption {
                line: number + 1,
                reason: err.to_string(),
            })?;
            if text.trim().is_empty() {
                continue;
            }
            let doc: Document =
                serde_json::from_str(text).map_err(|err| DoclineError::Corruption {
                    line: number + 1,
                    reason: err.to_string(),
                })?;
            if !doc.is_object() {
                return Err(DoclineError::Corruption {
                    line: number + 1,
                    reason: "line is not a JSON object".to_string(),
                });
            }
            docs.push(doc);
        }
        // Loading is not a mutation
        self.requires_flush = false;
        Ok(docs)
    }

    pub fn mark_modified(&mut self) {
        self.requires_flush = true;
    }

    pub fn requires_flush(&self) -> bool {
        self.requires_flush
    }

    pub fn is_attached(&self) -> bool {
        self.store.is_some()
    }

    pub fn describe(&self) -> String {
        self.store
            .as_ref()
            .map(|store| store.describe())
            .unwrap_or_else(|| "<closed>".to_string())
    }

    /// Rewrite the store with `docs` when anything changed since the last
    /// load or flush; otherwise do nothing.
    pub fn flush<'a, I>(&mut self, docs: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        if !self.requires_flush {
            log_debug!("Flushed collection (no changes).");
            return Ok(());
        }
        if let Some(store) = self.store.as_mut() {
            log_debug!("Flush collection to '{}'.", store.describe());
            store.truncate()?;
            for doc in docs {
                store.write_line(&serde_json::to_string(doc)?)?;
            }
            store.flush()?;
        }
        self.requires_flush = false;
        Ok(())
    }

    /// Release the store (dropping it closes any file handle)
    pub fn detach(&mut self) -> Option<Box<dyn LineStore>> {
        self.requires_flush = false;
        self.store.take()
    }
}
