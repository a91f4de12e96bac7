use super::*;
use serde_json::json;

fn doc(id: &str) -> Document {
    Document::new(id)
}

fn ids(collection: &Collection) -> Vec<&str> {
    collection
        .documents
        .as_ref()
        .expect("fetched")
        .iter()
        .map(|doc| doc.id.as_str())
        .collect()
}

fn fetched(ids: &[&str]) -> Collection {
    Collection::from_documents(ids.iter().map(|id| doc(id)).collect())
}

#[test]
fn insert_places_new_document_in_sort_order() {
    let collection = fetched(&["a", "d", "g"]);
    let next = insert(&collection, doc("c"), "id", false);
    assert_eq!(ids(&next), vec!["a", "c", "d", "g"]);
}

#[test]
fn insert_reverse_sorts_descending() {
    let collection = Collection::from_documents(vec![
        doc("a").with("created_at", "2024-01-01"),
        doc("b").with("created_at", "2024-03-01"),
    ]);
    let next = insert(
        &collection,
        doc("c").with("created_at", "2024-02-01"),
        "created_at",
        true,
    );
    assert_eq!(ids(&next), vec!["b", "c", "a"]);
}

#[test]
fn insert_into_unset_collection_yields_singleton() {
    let next = insert(&Collection::default(), doc("x"), "id", false);
    assert_eq!(ids(&next), vec!["x"]);
}

#[test]
fn insert_existing_id_replaces_without_duplicating() {
    let collection = Collection::from_documents(vec![
        doc("a").with("name", "Alpha"),
        doc("b").with("name", "Beta"),
    ]);
    let next = insert(&collection, doc("a").with("name", "Gamma"), "name", false);
    assert_eq!(ids(&next), vec!["b", "a"]);
    assert_eq!(
        next.get(&DocumentId::from("a")).and_then(|d| d.field("name")),
        Some(&json!("Gamma"))
    );
}

#[test]
fn insert_keeps_ids_unique_across_repeated_inserts() {
    let mut collection = fetched(&["a", "b"]);
    for id in ["b", "c", "a", "c"] {
        collection = insert(&collection, doc(id), "id", false);
    }
    let mut seen = ids(&collection);
    let total = seen.len();
    seen.dedup();
    assert_eq!(seen.len(), total);
    assert_eq!(ids(&collection), vec!["a", "b", "c"]);
}

#[test]
fn insert_is_stable_for_equal_keys() {
    let collection = Collection::from_documents(vec![
        doc("first").with("name", "same"),
        doc("second").with("name", "same"),
    ]);
    let next = insert(&collection, doc("third").with("name", "same"), "name", false);
    assert_eq!(ids(&next), vec!["first", "second", "third"]);
}

#[test]
fn insert_preserves_paging_metadata() {
    let mut collection = fetched(&["a"]);
    collection.page = 2;
    collection.page_count = 4;
    let next = insert(&collection, doc("b"), "id", false);
    assert_eq!((next.page, next.page_count), (2, 4));
}

#[test]
fn remove_drops_listed_ids_in_order() {
    let collection = fetched(&["foo", "test", "bar"]);
    let next = remove(&collection, &["foo".into(), "bar".into()]);
    assert_eq!(ids(&next), vec!["test"]);
}

#[test]
fn remove_is_idempotent() {
    let collection = fetched(&["a", "b", "c", "d"]);
    let removed: Vec<DocumentId> = vec!["b".into(), "d".into(), "zz".into()];
    let once = remove(&collection, &removed);
    let twice = remove(&once, &removed);
    assert_eq!(once, twice);
    assert_eq!(ids(&once), vec!["a", "c"]);
}

#[test]
fn update_and_remove_ignore_unset_collection() {
    let unset = Collection::default();
    assert_eq!(update(&unset, doc("a")), unset);
    assert_eq!(remove(&unset, &["a".into()]), unset);
    assert!(!unset.is_fetched());
}

#[test]
fn update_replaces_matching_document_verbatim() {
    let collection = Collection::from_documents(vec![doc("test").with("name", "bar")]);
    let next = update(&collection, doc("test").with("name", "baz"));
    assert_eq!(
        next.documents,
        Some(vec![doc("test").with("name", "baz")])
    );
}

#[test]
fn update_with_unknown_id_leaves_collection_unchanged() {
    let collection = fetched(&["x"]);
    let next = update(&collection, doc("y"));
    assert_eq!(next, collection);
}

#[test]
fn update_keeps_position() {
    let collection = fetched(&["a", "b", "c"]);
    let next = update(&collection, doc("b").with("ready", true));
    assert_eq!(ids(&next), vec!["a", "b", "c"]);
    assert_eq!(next.documents.as_ref().expect("fetched")[1].field("ready"), Some(&json!(true)));
}

#[test]
fn first_page_discards_previous_documents() {
    let mut collection = fetched(&["old1", "old2"]);
    collection.page = 3;
    collection.page_count = 3;

    let next = replace_page(
        &collection,
        Page::new(vec![doc("z"), doc("m"), doc("a")], 1, 5),
    );
    assert_eq!(ids(&next), vec!["z", "m", "a"]);
    assert_eq!((next.page, next.page_count), (1, 5));
}

#[test]
fn first_page_into_unset_collection() {
    let next = replace_page(&Collection::default(), Page::new(Vec::new(), 1, 0));
    assert!(next.is_fetched());
    assert!(next.is_empty());
}

#[test]
fn later_page_appends_and_merges_by_id() {
    let collection = Collection::from_documents(vec![
        doc("a"),
        doc("b").with("name", "stale"),
    ]);
    let next = replace_page(
        &collection,
        Page::new(vec![doc("c"), doc("b").with("name", "fresh"), doc("d")], 2, 3),
    );
    assert_eq!(ids(&next), vec!["a", "b", "c", "d"]);
    assert_eq!(
        next.get(&"b".into()).and_then(|d| d.field("name")),
        Some(&json!("fresh"))
    );
    assert_eq!((next.page, next.page_count), (2, 3));
    assert!(next.has_more_pages());
}

#[test]
fn page_counts_overwrite_only_when_reported() {
    let mut collection = fetched(&["a"]);
    collection.total_count = Some(40);
    collection.found_count = Some(12);

    let mut page = Page::new(vec![doc("b")], 2, 2);
    page.found_count = Some(11);
    let next = replace_page(&collection, page);

    assert_eq!(next.found_count, Some(11));
    assert_eq!(next.total_count, Some(40));
    assert!(!next.has_more_pages());
}
