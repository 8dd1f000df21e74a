// docline-core/src/lib.rs
//! Embedded, file-backed document collection
//!
//! Documents live in memory and persist as JSON lines. Queries are
//! MongoDB-style equality filters resolved through lazily built, lazily
//! refreshed per-path indexes.
//!
//! ```
//! use docline_core::{Collection, CollectionOptions};
//! use serde_json::json;
//!
//! let mut collection = Collection::new(CollectionOptions::default());
//! collection.insert_one(&json!({"_id": "a", "x": 1})).unwrap();
//! collection.insert_one(&json!({"_id": "b", "x": 2})).unwrap();
//!
//! let found = collection.find(&json!({"x": 1}), 0).unwrap();
//! assert_eq!(found.ids(), ["a"]);
//! ```

pub mod collection_core;
pub mod document;
pub mod error;
pub mod index;
pub mod logging;
pub mod options;
pub mod query;
pub mod resolver;
pub mod storage;
pub mod table;
pub mod value_utils;

// Public exports
pub use collection_core::{Collection, FindResults};
pub use document::{Document, DocumentId};
pub use error::{DoclineError, Result};
pub use index::{Index, IndexKey};
pub use logging::{get_log_level, set_log_level, LogLevel};
pub use options::{CollectionOptions, OpenMode, MEMORY};
pub use query::ParsedFilter;
pub use storage::{FileStore, LineStore, MemoryStore};
