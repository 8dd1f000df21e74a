// src/query.rs
//! Filter documents
//!
//! A filter is a (possibly nested) mapping of equality constraints:
//! `{"a": {"b": 1}, "c": "x"}` means `a.b == 1 AND c == "x"`. Before it can be
//! resolved against indexes it is validated, the primary-key term is split
//! off, and the rest is flattened into one `(dotted path, key)` term per leaf.

use serde_json::{Map, Value};

use crate::document::{kind_of, DocumentId};
use crate::error::{DoclineError, Result};
use crate::index::IndexKey;
use crate::value_utils::walk_leaves;

/// One flattened equality constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterTerm {
    /// Dotted path naming the index to consult
    pub path: String,
    /// Encoded leaf value to look up
    pub key: IndexKey,
}

/// Constraint a filter places on the primary key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyConstraint {
    /// No primary-key term
    Any,
    /// Direct equality on a string id
    Id(DocumentId),
    /// A primary-key term whose value is not a string (never a stored id)
    Never,
}

/// A validated, decomposed filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFilter {
    pub key: KeyConstraint,
    pub terms: Vec<FilterTerm>,
}

impl ParsedFilter {
    /// Filter that matches every document
    pub fn match_all() -> Self {
        ParsedFilter {
            key: KeyConstraint::Any,
            terms: Vec::new(),
        }
    }

    /// Parse a canonical filter value.
    ///
    /// `null` and `{}` match everything. Anything that is not a mapping, and
    /// any mapping with a sequence directly under its top level, is rejected
    /// with `Validation`.
    pub fn parse(filter: &Value, primary_key: &str) -> Result<Self> {
        let map = match filter {
            Value::Null => return Ok(Self::match_all()),
            Value::Object(map) => map,
            other => {
                return Err(DoclineError::Validation(format!(
                    "filter must be a mapping, got {}",
                    kind_of(other)
                )))
            }
        };
        validate_filter(map)?;

        let key = match map.get(primary_key) {
            None => KeyConstraint::Any,
            Some(Value::String(id)) => KeyConstraint::Id(id.clone()),
            Some(_) => KeyConstraint::Never,
        };

        let terms = flatten_filter(map)
            .into_iter()
            .filter(|(path, _)| path != primary_key)
            .map(|(path, value)| FilterTerm {
                key: IndexKey::from(value),
                path,
            })
            .collect();

        Ok(ParsedFilter { key, terms })
    }

    /// True when the filter places no constraint at all
    pub fn matches_all(&self) -> bool {
        self.key == KeyConstraint::Any && self.terms.is_empty()
    }
}

/// Reject sequences directly under the top level of a filter.
///
/// `{"x": [1, 2]}` is invalid; `{"x": {"y": [1, 2]}}` is valid and means
/// "`x.y` equals the sequence `[1, 2]`".
pub fn validate_filter(filter: &Map<String, Value>) -> Result<()> {
    for (field, value) in filter {
        if value.is_array() {
            return Err(DoclineError::Validation(format!(
                "top-level field '{}' must not be a sequence: {}",
                field, value
            )));
        }
    }
    Ok(())
}

/// Flatten a filter mapping into `(dotted path, leaf value)` pairs.
///
/// Mapping keys accumulate into the path; scalars and sequences end a branch.
/// Empty mappings contribute nothing.
pub fn flatten_filter(filter: &Map<String, Value>) -> Vec<(String, &Value)> {
    let mut pairs = Vec::new();
    for (field, value) in filter {
        for leaf in walk_leaves(value, true) {
            let path = if leaf.path.is_empty() {
                field.clone()
            } else {
                format!("{}.{}", field, leaf.dotted_path())
            };
            pairs.push((path, leaf.value));
        }
    }
    pairs
}

/// True when `filter` is exactly `{primary_key: <value>}`
pub fn is_primary_key_only(filter: &Value, primary_key: &str) -> bool {
    filter
        .as_object()
        .map(|map| map.len() == 1 && map.contains_key(primary_key))
        .unwrap_or(false)
}
