//! Traversal helpers over nested JSON values
//!
//! Pure functions: walking a dotted path into a document, enumerating the
//! leaves of a value tree, and the canonical text encoding that makes
//! composite values usable as index keys.

use serde_json::{Map, Value};

/// Separator between the segments of a dotted path
pub const PATH_SEPARATOR: char = '.';

/// Split a dotted path into its segments (`"a.b.c"` -> `["a", "b", "c"]`)
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split(PATH_SEPARATOR).collect()
}

/// Walk `segments` through nested mappings.
///
/// Returns `None` as soon as a segment is missing or the current value is not
/// a mapping. Sequences are not indexed into.
///
/// ```
/// use serde_json::json;
/// use docline_core::value_utils::lookup_path;
///
/// let doc = json!({"a": {"b": {"c": 7}}});
/// assert_eq!(lookup_path(&doc, &["a", "b", "c"]), Some(&json!(7)));
/// assert_eq!(lookup_path(&doc, &["a", "x"]), None);
/// ```
pub fn lookup_path<'a>(doc: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    let mut current = doc;
    for segment in segments {
        current = current.as_object()?.get(*segment)?;
    }
    Some(current)
}

/// Canonical text of a value, used where a composite must act as a key
pub fn encode_json(value: &Value) -> String {
    // Serializing a Value cannot fail: keys are always strings.
    serde_json::to_string(value).unwrap_or_default()
}

/// A terminal value reached while walking a tree, with the mapping keys that
/// led to it
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf<'a> {
    pub path: Vec<&'a str>,
    pub value: &'a Value,
}

impl Leaf<'_> {
    /// Joined dotted path of the leaf
    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }
}

/// Enumerate the leaves of a value tree.
///
/// Mapping keys extend the path. With `sequences_are_leaves` false, sequence
/// elements are walked in turn without adding a path segment; with it true,
/// a sequence terminates its branch like a scalar does.
pub fn walk_leaves(value: &Value, sequences_are_leaves: bool) -> Vec<Leaf<'_>> {
    let mut leaves = Vec::new();
    let mut path = Vec::new();
    collect_leaves(value, sequences_are_leaves, &mut path, &mut leaves);
    leaves
}

fn collect_leaves<'a>(
    value: &'a Value,
    sequences_are_leaves: bool,
    path: &mut Vec<&'a str>,
    out: &mut Vec<Leaf<'a>>,
) {
    match value {
        Value::Object(map) => collect_mapping(map, sequences_are_leaves, path, out),
        Value::Array(items) if !sequences_are_leaves => {
            for item in items {
                collect_leaves(item, sequences_are_leaves, path, out);
            }
        }
        _ => out.push(Leaf {
            path: path.clone(),
            value,
        }),
    }
}

fn collect_mapping<'a>(
    map: &'a Map<String, Value>,
    sequences_are_leaves: bool,
    path: &mut Vec<&'a str>,
    out: &mut Vec<Leaf<'a>>,
) {
    for (key, child) in map {
        path.push(key.as_str());
        collect_leaves(child, sequences_are_leaves, path, out);
        path.pop();
    }
}
