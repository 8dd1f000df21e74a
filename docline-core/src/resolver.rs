// docline-core/src/resolver.rs
//! Filter resolution: parsed filter -> matching primary keys
//!
//! Resolution seeds a candidate set from the primary-key term (when the filter
//! names one) and then intersects it with one index lookup per filter term.
//! Results come back in table order.
//!
//! Short-circuits:
//! - an empty candidate set ends resolution immediately;
//! - once a limit is set and the candidates fit within it, the remaining
//!   terms are checked against those few documents directly instead of
//!   building or scanning further indexes.

use ahash::AHashSet;

use crate::document::DocumentId;
use crate::error::{DoclineError, Result};
use crate::index::document_keys;
use crate::log_trace;
use crate::query::{FilterTerm, KeyConstraint, ParsedFilter};
use crate::table::DocumentTable;
use crate::value_utils::path_segments;

/// Resolve `filter` against `table`.
///
/// `limit == 0` means unlimited. With `auto_build` unset, a term on a path
/// without an index fails with `NoSuchIndex`.
pub fn resolve(
    table: &mut DocumentTable,
    filter: &ParsedFilter,
    limit: usize,
    auto_build: bool,
) -> Result<Vec<DocumentId>> {
    let docs = table.documents()?;

    if filter.matches_all() {
        let take = if limit == 0 { docs.len() } else { limit };
        return Ok(docs.keys().take(take).cloned().collect());
    }

    // A key term naming a stored id seeds the candidates; any other key term
    // leaves them unconstrained for the remaining terms to narrow.
    let mut candidates: Option<AHashSet<DocumentId>> = match &filter.key {
        KeyConstraint::Id(id) if docs.contains_key(id.as_str()) => {
            Some(AHashSet::from_iter([id.clone()]))
        }
        KeyConstraint::Id(_) | KeyConstraint::Never if filter.terms.is_empty() => {
            return Ok(Vec::new())
        }
        _ => None,
    };

    for (position, term) in filter.terms.iter().enumerate() {
        if let Some(current) = &candidates {
            if current.is_empty() {
                break;
            }
            if limit != 0 && current.len() <= limit {
                let remaining = &filter.terms[position..];
                if !auto_build {
                    if let Some(term) = remaining.iter().find(|term| !table.has_index(&term.path)) {
                        return Err(DoclineError::NoSuchIndex(term.path.clone()));
                    }
                }
                log_trace!(
                    "Checking {} remaining terms against {} candidates directly",
                    remaining.len(),
                    current.len()
                );
                let kept = verify_terms(table, current, remaining)?;
                candidates = Some(kept);
                break;
            }
        }

        let index = table.index(&term.path, auto_build)?;
        let bucket = index.bucket(&term.key);
        candidates = Some(match candidates.take() {
            None => bucket.cloned().unwrap_or_default(),
            Some(mut current) => {
                match bucket {
                    Some(bucket) => current.retain(|id| bucket.contains(id)),
                    None => current.clear(),
                }
                current
            }
        });
    }

    let matched = candidates.unwrap_or_default();
    Ok(in_table_order(table, matched, limit))
}

/// Keep only candidates whose documents satisfy every term
fn verify_terms(
    table: &DocumentTable,
    candidates: &AHashSet<DocumentId>,
    terms: &[FilterTerm],
) -> Result<AHashSet<DocumentId>> {
    let docs = table.documents()?;
    let fallback = table.dotted_fallback();
    let segments: Vec<Vec<&str>> = terms.iter().map(|term| path_segments(&term.path)).collect();

    Ok(candidates
        .iter()
        .filter(|id| {
            docs.get(id.as_str()).is_some_and(|doc| {
                terms.iter().zip(&segments).all(|(term, segments)| {
                    document_keys(doc, &term.path, segments, fallback).contains(&term.key)
                })
            })
        })
        .cloned()
        .collect())
}

fn in_table_order(table: &DocumentTable, ids: AHashSet<DocumentId>, limit: usize) -> Vec<DocumentId> {
    let mut ordered: Vec<(usize, DocumentId)> = ids
        .into_iter()
        .filter_map(|id| table.position(&id).map(|position| (position, id)))
        .collect();
    ordered.sort_unstable_by_key(|(position, _)| *position);
    if limit != 0 {
        ordered.truncate(limit);
    }
    ordered.into_iter().map(|(_, id)| id).collect()
}
