mod common;

use assert2::{check, let_assert};
use common::{TempWorkspace, corpus, doc, index, options};
use radix_search::{
    Document, ExternalId, IndexConfig, IndexOptions, IndexSnapshot, SearchError, SearchIndex,
    SearchOptions,
};
use rstest::rstest;
use serde_json::json;

const QUERIES: &[&str] = &["zen", "zen art", "the sky", "moby dick", "motorc", "colour"];

fn broad() -> SearchOptions {
    SearchOptions::default()
        .prefix(true)
        .fuzzy(Some(radix_search::FuzzyBudget::DEFAULT))
}

#[rstest]
fn restored_index_answers_identically(index: SearchIndex, options: IndexOptions) {
    let json = index.to_json().unwrap();
    let restored = SearchIndex::load_json(&json, Some(options)).unwrap();

    for query in QUERIES {
        check!(restored.search(query) == index.search(query), "query {:?}", query);
        check!(
            restored.search_with(query, &broad()) == index.search_with(query, &broad()),
            "query {:?}",
            query
        );
        check!(restored.auto_suggest(query) == index.auto_suggest(query));
    }
}

#[rstest]
fn snapshot_file_round_trip(index: SearchIndex, options: IndexOptions) {
    let workspace = TempWorkspace::new();
    workspace.create_file("index.json", &index.to_json().unwrap());

    let snapshot = IndexSnapshot::from_json(&workspace.read_file("index.json")).unwrap();
    check!(snapshot == index.export());

    let restored = SearchIndex::restore(snapshot, Some(options)).unwrap();
    check!(restored.document_count() == 4);
    check!(restored.stored_fields(&ExternalId::from(3)).unwrap()["title"] == json!("Neuromancer"));
}

#[rstest]
fn restored_index_keeps_accepting_changes(
    index: SearchIndex,
    options: IndexOptions,
    corpus: Vec<Document>,
) {
    let mut restored = SearchIndex::restore(index.export(), Some(options)).unwrap();

    restored
        .add(&doc(json!({"id": 5, "title": "Snow Crash", "text": "The Deliverator belongs"})))
        .unwrap();
    check!(restored.export().document_ids.get(&4) == Some(&ExternalId::from(5)));
    check!(restored.search("deliverator").len() == 1);

    let report = restored.remove(&corpus[0]).unwrap();
    check!(report.is_clean());
    check!(restored.search("ishmael").is_empty());
    check!(restored.document_count() == 4);

    let_assert!(Err(SearchError::DuplicateId { .. }) = restored.add(&corpus[1]));
}

#[rstest]
fn restore_without_options_fails(index: SearchIndex) {
    let json = index.to_json().unwrap();
    let_assert!(Err(error) = SearchIndex::load_json(&json, None));
    check!(matches!(error, SearchError::MissingConfig));
    check!(error.is_configuration());
}

#[rstest]
fn restore_with_different_fields_fails(index: SearchIndex) {
    let reordered = IndexOptions::builder()
        .fields(["text", "title"])
        .build()
        .unwrap();
    let_assert!(
        Err(SearchError::FieldMismatch { .. }) = SearchIndex::restore(index.export(), Some(reordered))
    );
}

#[rstest]
fn config_file_drives_options(index: SearchIndex) {
    let workspace = TempWorkspace::new();
    let path = workspace.create_file(
        "search.toml",
        r#"
fields = ["title", "text"]
store_fields = ["title", "category"]

[search]
prefix = true
"#,
    );

    let options = IndexConfig::load(&path).unwrap().into_options().unwrap();
    let restored = SearchIndex::load_json(&index.to_json().unwrap(), Some(options)).unwrap();

    // The restored index takes its default search options from the config
    check!(index.search("neuroman").is_empty());
    check!(restored.search("neuroman").len() == 1);
}
