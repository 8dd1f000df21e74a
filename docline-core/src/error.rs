// docline-core/src/error.rs
use thiserror::Error;

use crate::document::DocumentId;

/// Every failure a collection can surface to its caller
#[derive(Error, Debug)]
pub enum DoclineError {
    #[error("Trying to access closed collection")]
    ClosedCollection,

    #[error("The primary key must be of type string, got: {0}")]
    InvalidKeyType(String),

    #[error("Primary key mismatch: expected '{expected}', document has {found}")]
    PrimaryKeyMismatch { expected: DocumentId, found: String },

    #[error("Invalid filter: {0}")]
    Validation(String),

    #[error("No index for key '{0}'")]
    NoSuchIndex(String),

    #[error("Can't access index for primary key '{0}' via index()")]
    PrimaryKeyIndex(String),

    #[error("Document not found: {0}")]
    NotFound(DocumentId),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Document is missing primary key field '{0}'")]
    MissingPrimaryKey(String),

    #[error("Corrupted collection data at line {line}: {reason}")]
    Corruption { line: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DoclineError>;
