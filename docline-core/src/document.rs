// docline-core/src/document.rs
//! Documents, primary keys and canonicalisation
//!
//! A document is a JSON object held as [`serde_json::Value`]. Whatever the
//! caller hands in (a struct, a map, a tuple-bearing value) is passed through
//! `serde_json::to_value` first, so structurally equal inputs are stored in
//! one canonical form.

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{DoclineError, Result};

/// Primary key of a stored document
pub type DocumentId = String;

/// A stored document (always a JSON object)
pub type Document = Value;

/// Generate a fresh random primary key (UUID v4 text)
pub fn new_document_id() -> DocumentId {
    Uuid::new_v4().to_string()
}

/// Convert any serializable input into its canonical JSON value
pub fn canonicalize<T: Serialize + ?Sized>(input: &T) -> Result<Value> {
    Ok(serde_json::to_value(input)?)
}

/// Canonicalize and require a top-level mapping
pub fn canonical_document<T: Serialize + ?Sized>(input: &T) -> Result<Document> {
    let value = canonicalize(input)?;
    if !value.is_object() {
        return Err(DoclineError::InvalidDocument(format!(
            "expected a mapping, got {}",
            kind_of(&value)
        )));
    }
    Ok(value)
}

/// Read the primary key of a document.
///
/// `Ok(None)` when the field is absent, `InvalidKeyType` when it holds
/// anything other than a string.
pub fn primary_key_of(doc: &Document, primary_key: &str) -> Result<Option<DocumentId>> {
    match doc.get(primary_key) {
        None => Ok(None),
        Some(Value::String(id)) => Ok(Some(id.clone())),
        Some(other) => Err(DoclineError::InvalidKeyType(other.to_string())),
    }
}

/// Make `doc` carry `id` under the primary-key field.
///
/// A missing key is filled in; a present key must already equal `id`.
pub fn bind_primary_key(doc: &mut Document, primary_key: &str, id: &str) -> Result<()> {
    let map = doc
        .as_object_mut()
        .ok_or_else(|| DoclineError::InvalidDocument("expected a mapping".to_string()))?;

    match map.get(primary_key) {
        None => {
            map.insert(primary_key.to_string(), Value::String(id.to_string()));
            Ok(())
        }
        Some(Value::String(existing)) if existing == id => Ok(()),
        Some(other) => Err(DoclineError::PrimaryKeyMismatch {
            expected: id.to_string(),
            found: other.to_string(),
        }),
    }
}

/// Return the document's key, generating and storing one when absent
pub fn ensure_primary_key(doc: &mut Document, primary_key: &str) -> Result<DocumentId> {
    if let Some(id) = primary_key_of(doc, primary_key)? {
        return Ok(id);
    }
    let id = new_document_id();
    bind_primary_key(doc, primary_key, &id)?;
    Ok(id)
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
