//! Integration tests for the Collection façade
//!
//! CRUD, filter resolution, filtered mutation and index access.

use docline_core::{Collection, CollectionOptions, DoclineError};
use serde::Serialize;
use serde_json::{json, Value};

fn collection_with(docs: Vec<Value>) -> Collection {
    Collection::from_documents(docs, CollectionOptions::default()).unwrap()
}

fn abc() -> Collection {
    collection_with(vec![
        json!({"_id": "a", "x": 1}),
        json!({"_id": "b", "x": 2}),
        json!({"_id": "c", "x": 1}),
    ])
}

fn sorted(mut ids: Vec<String>) -> Vec<String> {
    ids.sort();
    ids
}

// ========== SCENARIOS ==========

#[test]
fn test_find_delete_replace_scenario() {
    let mut collection = abc();

    assert_eq!(collection.find_ids(&json!({"x": 1}), 0).unwrap(), vec!["a", "c"]);

    collection.delete("a").unwrap();
    assert_eq!(collection.find_ids(&json!({"x": 1}), 0).unwrap(), vec!["c"]);

    collection
        .replace_one(&json!({"_id": "b"}), &json!({"x": 9}), false)
        .unwrap();
    assert_eq!(collection.find_ids(&json!({"x": 9}), 0).unwrap(), vec!["b"]);
    assert_eq!(collection.get("b").unwrap(), json!({"x": 9, "_id": "b"}));
}

#[test]
fn test_top_level_sequence_filter_is_rejected() {
    let mut collection = abc();
    let err = collection.find_ids(&json!({"x": [1, 2]}), 0).unwrap_err();
    assert!(matches!(err, DoclineError::Validation(_)));
}

#[test]
fn test_nested_sequence_filter_matches_equal_arrays() {
    let mut collection = collection_with(vec![
        json!({"_id": "a", "x": {"y": [1, 2]}}),
        json!({"_id": "b", "x": {"y": [2, 1]}}),
        json!({"_id": "c", "x": {"y": 1}}),
    ]);
    assert_eq!(collection.find_ids(&json!({"x": {"y": [1, 2]}}), 0).unwrap(), vec!["a"]);
}

// ========== INSERT / SET / GET ==========

#[test]
fn test_insert_one_generates_id() {
    let mut collection = Collection::default();
    let id = collection.insert_one(&json!({"name": "Alice"})).unwrap();
    assert_eq!(id.len(), 36);
    assert_eq!(collection.get(&id).unwrap()["_id"], json!(id.clone()));
    assert!(collection.requires_flush());
}

#[test]
fn test_insert_one_keeps_given_id() {
    let mut collection = Collection::default();
    let id = collection.insert_one(&json!({"_id": "custom", "v": 1})).unwrap();
    assert_eq!(id, "custom");
    assert!(collection.contains_id("custom").unwrap());
}

#[test]
fn test_insert_one_rejects_non_string_key() {
    let mut collection = Collection::default();
    let err = collection.insert_one(&json!({"_id": 42})).unwrap_err();
    assert!(matches!(err, DoclineError::InvalidKeyType(_)));
    assert_eq!(collection.len().unwrap(), 0);
}

#[test]
fn test_insert_non_mapping_is_invalid() {
    let mut collection = Collection::default();
    let err = collection.insert_one(&json!([1, 2])).unwrap_err();
    assert!(matches!(err, DoclineError::InvalidDocument(_)));
}

#[test]
fn test_set_primary_key_mismatch() {
    let mut collection = Collection::default();
    let err = collection.set("a", &json!({"_id": "b"})).unwrap_err();
    assert!(matches!(err, DoclineError::PrimaryKeyMismatch { .. }));
}

#[test]
fn test_set_accepts_structs() {
    #[derive(Serialize)]
    struct Job {
        name: &'static str,
        params: (u32, f64),
    }

    let mut collection = Collection::default();
    collection
        .set("job-1", &Job { name: "relax", params: (3, 0.5) })
        .unwrap();
    assert_eq!(
        collection.get("job-1").unwrap(),
        json!({"name": "relax", "params": [3, 0.5], "_id": "job-1"})
    );
    assert_eq!(
        collection.find_ids(&json!({"params": {"never": 1}}), 0).unwrap(),
        Vec::<String>::new()
    );
}

#[test]
fn test_get_returns_isolated_copy() {
    let mut collection = abc();
    let mut doc = collection.get("a").unwrap();
    doc["x"] = json!(100);
    assert_eq!(collection.get("a").unwrap()["x"], 1);
    assert_eq!(collection.find_ids(&json!({"x": 100}), 0).unwrap(), Vec::<String>::new());
}

#[test]
fn test_get_and_delete_missing_are_errors() {
    let mut collection = abc();
    assert!(matches!(collection.get("zz"), Err(DoclineError::NotFound(_))));
    assert!(matches!(collection.delete("zz"), Err(DoclineError::NotFound(_))));
}

#[test]
fn test_update_many_upserts_by_key() {
    let mut collection = abc();
    let ids = collection
        .update_many(vec![json!({"_id": "a", "x": 5}), json!({"x": 6})])
        .unwrap();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], "a");
    assert_eq!(collection.len().unwrap(), 4);
    assert_eq!(collection.get("a").unwrap()["x"], 5);
    assert_eq!(collection.find_ids(&json!({"x": 6}), 0).unwrap(), vec![ids[1].clone()]);
}

#[test]
fn test_ids_and_documents_in_table_order() {
    let collection = abc();
    let ids: Vec<&String> = collection.ids().unwrap().collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    let xs: Vec<i64> = collection
        .documents()
        .unwrap()
        .map(|doc| doc["x"].as_i64().unwrap())
        .collect();
    assert_eq!(xs, vec![1, 2, 1]);
}

#[test]
fn test_clear() {
    let mut collection = abc();
    collection.find_ids(&json!({"x": 1}), 0).unwrap();
    collection.clear().unwrap();
    assert!(collection.is_empty().unwrap());
    assert!(collection.list_indexes().is_empty());
    assert!(collection.find_ids(&json!({"x": 1}), 0).unwrap().is_empty());
}

// ========== FIND ==========

#[test]
fn test_find_view() {
    let mut collection = abc();
    let results = collection.find(&json!({"x": 1}), 0).unwrap();
    assert_eq!(results.len(), 2);
    let ids: Vec<Value> = results.iter().map(|doc| doc["_id"].clone()).collect();
    assert_eq!(ids, vec![json!("a"), json!("c")]);
}

#[test]
fn test_find_empty_filter_and_limit() {
    let mut collection = abc();
    assert_eq!(collection.find(&json!({}), 0).unwrap().len(), 3);
    assert_eq!(collection.find(&Value::Null, 2).unwrap().ids(), ["a", "b"]);
}

#[test]
fn test_find_one() {
    let mut collection = abc();
    assert_eq!(collection.find_one(&json!({"x": 2})).unwrap().unwrap()["_id"], "b");
    assert!(collection.find_one(&json!({"x": 3})).unwrap().is_none());
    assert!(Collection::default().find_one(&json!({})).unwrap().is_none());
}

#[test]
fn test_find_integral_float_matches_int() {
    let mut collection = abc();
    assert_eq!(collection.find_ids(&json!({"x": 1.0}), 0).unwrap(), vec!["a", "c"]);
}

#[test]
fn test_find_nested_path_and_dotted_filter_key() {
    let mut collection = collection_with(vec![
        json!({"_id": "a", "p": {"q": {"r": "deep"}}}),
        json!({"_id": "b", "p": {"q": "shallow"}}),
    ]);
    assert_eq!(collection.find_ids(&json!({"p": {"q": {"r": "deep"}}}), 0).unwrap(), vec!["a"]);
    assert_eq!(collection.find_ids(&json!({"p.q.r": "deep"}), 0).unwrap(), vec!["a"]);
    assert_eq!(collection.find_ids(&json!({"p.q": "shallow"}), 0).unwrap(), vec!["b"]);
}

#[test]
fn test_find_sees_mutations_after_first_query() {
    let mut collection = abc();
    assert_eq!(collection.find_ids(&json!({"x": 2}), 0).unwrap(), vec!["b"]);

    collection.set("b", &json!({"x": 1})).unwrap();
    collection.insert_one(&json!({"_id": "d", "x": 2})).unwrap();

    assert_eq!(collection.find_ids(&json!({"x": 2}), 0).unwrap(), vec!["d"]);
    assert_eq!(collection.find_ids(&json!({"x": 1}), 0).unwrap(), vec!["a", "b", "c"]);
}

#[test]
fn test_find_primary_key_terms() {
    let mut collection = abc();
    assert_eq!(collection.find_ids(&json!({"_id": "c"}), 0).unwrap(), vec!["c"]);
    assert_eq!(collection.find_ids(&json!({"_id": "c", "x": 1}), 0).unwrap(), vec!["c"]);
    assert!(collection.find_ids(&json!({"_id": "c", "x": 2}), 0).unwrap().is_empty());
    assert!(collection.find_ids(&json!({"_id": "missing"}), 0).unwrap().is_empty());
}

#[test]
fn test_find_unknown_primary_key_with_other_terms() {
    let mut collection = abc();
    assert_eq!(
        sorted(collection.find_ids(&json!({"_id": "zz", "x": 1}), 0).unwrap()),
        vec!["a", "c"]
    );
}

#[test]
fn test_find_without_auto_build_fails_for_any_limit() {
    let options = CollectionOptions::new().with_auto_build_indexes(false);
    let mut collection = Collection::from_documents(
        vec![json!({"_id": "a", "x": 1, "y": 2}), json!({"_id": "b", "x": 2, "y": 2})],
        options,
    )
    .unwrap();
    collection.build_index("x").unwrap();
    for limit in [0, 5] {
        let err = collection.find_ids(&json!({"x": 1, "y": 2}), limit).unwrap_err();
        assert!(matches!(err, DoclineError::NoSuchIndex(_)));
    }
}

#[test]
fn test_custom_primary_key() {
    let options = CollectionOptions::new().with_primary_key("name");
    let mut collection = Collection::new(options);
    let id = collection.insert_one(&json!({"name": "n1", "_id": 5})).unwrap();
    assert_eq!(id, "n1");
    assert_eq!(collection.find_ids(&json!({"_id": 5}), 0).unwrap(), vec!["n1"]);
    assert_eq!(collection.find_ids(&json!({"name": "n1"}), 0).unwrap(), vec!["n1"]);
}

#[test]
fn test_auto_build_disabled_requires_explicit_index() {
    let options = CollectionOptions::new().with_auto_build_indexes(false);
    let mut collection =
        Collection::from_documents(vec![json!({"_id": "a", "x": 1})], options).unwrap();

    let err = collection.find_ids(&json!({"x": 1}), 0).unwrap_err();
    assert!(matches!(err, DoclineError::NoSuchIndex(_)));

    collection.build_index("x").unwrap();
    assert_eq!(collection.find_ids(&json!({"x": 1}), 0).unwrap(), vec!["a"]);
}

#[test]
fn test_dotted_key_fallback_toggle() {
    let docs = vec![json!({"_id": "lit", "a.b": 1}), json!({"_id": "nested", "a": {"b": 1}})];

    let mut legacy = Collection::from_documents(docs.clone(), CollectionOptions::default()).unwrap();
    assert_eq!(
        sorted(legacy.find_ids(&json!({"a": {"b": 1}}), 0).unwrap()),
        vec!["lit", "nested"]
    );

    let options = CollectionOptions::new().with_dotted_key_fallback(false);
    let mut strict = Collection::from_documents(docs, options).unwrap();
    assert_eq!(strict.find_ids(&json!({"a": {"b": 1}}), 0).unwrap(), vec!["nested"]);
}

// ========== REPLACE / DELETE ==========

#[test]
fn test_replace_one_primary_key_creates_missing() {
    let mut collection = abc();
    let id = collection
        .replace_one(&json!({"_id": "new"}), &json!({"x": 3}), false)
        .unwrap();
    assert_eq!(id.as_deref(), Some("new"));
    assert_eq!(collection.get("new").unwrap()["x"], 3);
}

#[test]
fn test_replace_one_by_filter_keeps_id() {
    let mut collection = abc();
    let id = collection
        .replace_one(&json!({"x": 2}), &json!({"x": 20, "tag": "t"}), false)
        .unwrap();
    assert_eq!(id.as_deref(), Some("b"));
    assert_eq!(collection.get("b").unwrap(), json!({"x": 20, "tag": "t", "_id": "b"}));
    assert_eq!(collection.len().unwrap(), 3);
}

#[test]
fn test_replace_one_replaces_only_first_match() {
    let mut collection = abc();
    collection.replace_one(&json!({"x": 1}), &json!({"x": 7}), false).unwrap();
    assert_eq!(collection.find_ids(&json!({"x": 7}), 0).unwrap(), vec!["a"]);
    assert_eq!(collection.find_ids(&json!({"x": 1}), 0).unwrap(), vec!["c"]);
}

#[test]
fn test_replace_one_upsert() {
    let mut collection = abc();
    assert_eq!(
        collection.replace_one(&json!({"x": 42}), &json!({"x": 42}), false).unwrap(),
        None
    );
    assert_eq!(collection.len().unwrap(), 3);

    let id = collection
        .replace_one(&json!({"x": 42}), &json!({"x": 42}), true)
        .unwrap()
        .unwrap();
    assert_eq!(collection.len().unwrap(), 4);
    assert_eq!(collection.find_ids(&json!({"x": 42}), 0).unwrap(), vec![id]);
}

#[test]
fn test_replace_one_empty_filter_upsert_on_empty_collection() {
    let mut collection = Collection::default();
    let id = collection.replace_one(&json!({}), &json!({"v": 1}), true).unwrap();
    assert!(id.is_some());
    assert_eq!(collection.len().unwrap(), 1);
}

#[test]
fn test_replace_one_non_string_primary_key() {
    let mut collection = abc();
    let err = collection.replace_one(&json!({"_id": 1}), &json!({}), false).unwrap_err();
    assert!(matches!(err, DoclineError::InvalidKeyType(_)));
}

#[test]
fn test_delete_one_and_many() {
    let mut collection = abc();
    assert_eq!(collection.delete_one(&json!({"x": 1})).unwrap(), 1);
    assert_eq!(collection.len().unwrap(), 2);

    assert_eq!(collection.delete_many(&json!({"x": 9})).unwrap(), 0);
    assert_eq!(collection.delete_many(&json!({})).unwrap(), 2);
    assert!(collection.is_empty().unwrap());
}

#[test]
fn test_delete_is_visible_without_refresh() {
    let mut collection = abc();
    collection.find_ids(&json!({"x": 1}), 0).unwrap();
    collection.set("b", &json!({"x": 1})).unwrap();
    collection.delete("a").unwrap();

    let index = collection.index("x", false).unwrap();
    let mut ids: Vec<String> = index.lookup(&json!(1)).into_iter().collect();
    ids.sort();
    assert_eq!(ids, vec!["b", "c"]);
    assert_eq!(collection.find_ids(&json!({}), 0).unwrap(), vec!["b", "c"]);
}

// ========== INDEX ACCESS ==========

#[test]
fn test_index_accessor() {
    let mut collection = abc();
    assert!(matches!(collection.index("x", false), Err(DoclineError::NoSuchIndex(_))));
    assert!(matches!(collection.index("_id", true), Err(DoclineError::PrimaryKeyIndex(_))));
    assert!(matches!(collection.build_index("_id"), Err(DoclineError::PrimaryKeyIndex(_))));

    let index = collection.index("x", true).unwrap();
    assert_eq!(index.path(), "x");
    assert_eq!(index.len(), 2);
    assert_eq!(collection.list_indexes(), vec!["x"]);
}

// ========== CLOSED ==========

#[test]
fn test_closed_collection_rejects_access() {
    let mut collection = abc();
    collection.close().unwrap();
    assert!(collection.is_closed());

    assert!(matches!(collection.len(), Err(DoclineError::ClosedCollection)));
    assert!(matches!(collection.get("a"), Err(DoclineError::ClosedCollection)));
    assert!(matches!(collection.contains_id("a"), Err(DoclineError::ClosedCollection)));
    assert!(matches!(
        collection.insert_one(&json!({})),
        Err(DoclineError::ClosedCollection)
    ));
    assert!(matches!(
        collection.find_ids(&json!({"x": 1}), 0),
        Err(DoclineError::ClosedCollection)
    ));
    assert!(matches!(
        collection.replace_one(&json!({"_id": "a"}), &json!({}), true),
        Err(DoclineError::ClosedCollection)
    ));
    assert!(matches!(collection.flush(), Err(DoclineError::ClosedCollection)));

    // Closing again is a no-op
    collection.close().unwrap();
}

#[test]
fn test_display() {
    let collection = Collection::default();
    assert_eq!(collection.to_string(), "<Collection file=:memory:>");
}
