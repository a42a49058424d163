use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use docchat_core::data_processor::ChunkingConfig;
use docchat_core::traits::{doc_ids_for_file, Ingestor, Retriever};
use docchat_core::types::ScopeFilter;
use docchat_text::TantivyStore;

fn write(dir: &TempDir, name: &str, body: &str) -> (String, PathBuf) {
    let path = dir.path().join(name);
    fs::write(&path, body).unwrap();
    (name.to_string(), path)
}

fn open(dir: &TempDir) -> TantivyStore {
    TantivyStore::open(&dir.path().join("index"), ChunkingConfig::default()).expect("open store")
}

#[test]
fn ingest_list_search_delete() {
    let data = TempDir::new().unwrap();
    let store = open(&data);
    let files = vec![
        write(&data, "fire.txt", "How to build a campfire with dry tinder.\u{0c}Keep the firecraft kit dry."),
        write(&data, "net.txt", "Computer networking basics: routers and switches."),
    ];
    let ingested = store.bulk_ingest(&files).expect("ingest");
    assert_eq!(ingested.len(), 3, "two pages plus one page");

    let listed = store.list_ingested().expect("list");
    assert_eq!(listed.len(), 3);
    let names: Vec<&str> = listed.iter().filter_map(|d| d.file_name()).collect();
    assert_eq!(names, vec!["fire.txt", "fire.txt", "net.txt"], "ingestion order is preserved");
    assert_eq!(listed[1].page_label(), Some("2"));

    let hits = store.retrieve_relevant("firecraft", 4, 0, None).expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document.file_name(), Some("fire.txt"));
    assert_eq!(hits[0].document.page_label(), Some("2"));
    assert!(hits[0].text.contains("firecraft"));

    for id in doc_ids_for_file(&listed, "fire.txt") {
        store.delete(&id).expect("delete");
    }
    let listed = store.list_ingested().expect("list");
    assert_eq!(listed.len(), 1);
    assert!(store.retrieve_relevant("firecraft", 4, 0, None).expect("search").is_empty());
}

#[test]
fn scope_filter_restricts_and_empty_filter_starves() {
    let data = TempDir::new().unwrap();
    let store = open(&data);
    let files = vec![
        write(&data, "a.txt", "solar panels charge batteries"),
        write(&data, "b.txt", "solar ovens cook food"),
    ];
    store.bulk_ingest(&files).expect("ingest");
    let listed = store.list_ingested().expect("list");

    let only_b = ScopeFilter::new(doc_ids_for_file(&listed, "b.txt"));
    let hits = store.retrieve_relevant("solar", 4, 0, Some(&only_b)).expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document.file_name(), Some("b.txt"));

    let unrestricted = store.retrieve_relevant("solar", 4, 0, None).expect("search");
    assert_eq!(unrestricted.len(), 2);

    let nothing = ScopeFilter::default();
    assert!(store.retrieve_relevant("solar", 4, 0, Some(&nothing)).expect("search").is_empty());
}

#[test]
fn adjacent_chunks_widen_passage_text() {
    let data = TempDir::new().unwrap();
    let store = open(&data);
    let files = vec![write(&data, "guide.txt", "intro paragraph\n\nwater filtration steps\n\nclosing notes")];
    store.bulk_ingest(&files).expect("ingest");

    let narrow = store.retrieve_relevant("filtration", 1, 0, None).expect("search");
    assert_eq!(narrow[0].text, "water filtration steps");

    let wide = store.retrieve_relevant("filtration", 1, 1, None).expect("search");
    assert_eq!(wide[0].text, "intro paragraph\n\nwater filtration steps\n\nclosing notes");
}

#[test]
fn reopening_keeps_ingested_documents() {
    let data = TempDir::new().unwrap();
    {
        let store = open(&data);
        store.bulk_ingest(&[write(&data, "keep.txt", "persistent text")]).expect("ingest");
    }
    let store = open(&data);
    let listed = store.list_ingested().expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].file_name(), Some("keep.txt"));
}
