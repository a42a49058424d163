mod common;

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::oneshot;

use common::*;
use docchat_chat::history::SOURCES_SEPARATOR;
use docchat_chat::mode::{SEARCH_LIMIT, SEARCH_PREV_NEXT_CHUNKS};
use docchat_chat::{ChatEngine, Mode};
use docchat_core::error::Error;
use docchat_core::types::{Message, ScopeFilter, Turn};

#[tokio::test]
async fn streaming_snapshots_grow_and_end_with_citations() {
    let generator = ScriptedGenerator::new(
        vec![Step::Text("Hel"), Step::Chunk(Some("lo")), Step::Chunk(None), Step::Text("!")],
        vec![passage("a.pdf", "1", "x"), passage("a.pdf", "1", "y"), passage("b.pdf", "2", "z")],
    );
    let engine = engine(FakeIngestor::default(), generator, FakeRetriever::default());

    let stream = engine.chat(&session(), "hi", &[], Mode::QueryFiles).await.unwrap();
    let snaps = snapshots(stream).await;

    assert_eq!(&snaps[..4], ["Hel", "Hello", "Hello", "Hello!"]);
    for pair in snaps.windows(2) {
        assert!(pair[1].starts_with(&pair[0]), "{:?} does not extend {:?}", pair[1], pair[0]);
    }
    let last = snaps.last().unwrap();
    assert_eq!(last, &format!("Hello!{}\n\n\n1. a.pdf (page 1) \n\n2. b.pdf (page 2) \n\n", SOURCES_SEPARATOR));
    assert_eq!(last.matches(SOURCES_SEPARATOR).count(), 1);
}

#[tokio::test]
async fn no_sources_means_no_citation_block() {
    let generator = ScriptedGenerator::new(vec![Step::Text("plain")], vec![]);
    let engine = engine(FakeIngestor::default(), generator, FakeRetriever::default());
    let stream = engine.chat(&session(), "hi", &[], Mode::LlmChat).await.unwrap();
    assert_eq!(snapshots(stream).await, vec!["plain".to_string()]);
}

#[tokio::test]
async fn query_mode_sends_compacted_history_with_system_prompt() {
    let generator = ScriptedGenerator::new(vec![Step::Text("ok")], vec![]);
    let engine = engine(FakeIngestor::default(), generator, FakeRetriever::default());
    let history = vec![Turn::new("Hi", format!("Hello!{}\n\n\n1. a.pdf (page 1) \n\n", SOURCES_SEPARATOR))];

    engine.chat(&session(), "Tell me more", &history, Mode::QueryFiles).await.unwrap();

    let calls = engine_calls(&engine);
    let (messages, use_context, filter) = &calls[0];
    assert_eq!(
        messages,
        &vec![Message::system("query prompt"), Message::user("Hi"), Message::assistant("Hello!"), Message::user("Tell me more")]
    );
    assert!(use_context);
    assert_eq!(filter, &None, "no selection means unrestricted retrieval");
}

fn engine_calls(engine: &TestEngine) -> Vec<(Vec<Message>, bool, Option<ScopeFilter>)> {
    engine.generator().calls.lock().unwrap().clone()
}

#[tokio::test]
async fn selected_file_scopes_to_all_its_pages() {
    let ingestor = FakeIngestor::with_docs(vec![unit("1", "a.pdf", "1"), unit("2", "b.pdf", "1"), unit("3", "a.pdf", "2")]);
    let engine = engine(ingestor, ScriptedGenerator::new(vec![], vec![]), FakeRetriever::default());
    let mut session = session();
    session.select_file("a.pdf");

    engine.chat(&session, "q", &[], Mode::QueryFiles).await.unwrap();
    let calls = engine_calls(&engine);
    assert_eq!(calls[0].2, Some(ScopeFilter::new(["1", "3"])));
}

#[tokio::test]
async fn vanished_selection_filters_to_nothing() {
    let ingestor = FakeIngestor::with_docs(vec![unit("1", "a.pdf", "1")]);
    let engine = engine(ingestor, ScriptedGenerator::new(vec![], vec![]), FakeRetriever::default());
    let mut session = session();
    session.select_file("deleted.pdf");

    let scope = engine.resolve_scope(&session).unwrap();
    assert_eq!(scope, Some(ScopeFilter::default()), "empty filter, not \"no filter\"");
}

#[tokio::test]
async fn llm_chat_never_touches_retrieval() {
    let generator = ScriptedGenerator::new(vec![Step::Text("x")], vec![]);
    let ingestor = FakeIngestor::with_docs(vec![unit("1", "a.pdf", "1")]);
    let engine = engine(ingestor, generator, FakeRetriever::default());
    let mut session = session();
    session.select_file("a.pdf");
    session.set_mode(Mode::LlmChat);

    engine.chat(&session, "q", &[], Mode::LlmChat).await.unwrap();

    assert!(engine.retriever().calls.lock().unwrap().is_empty());
    let calls = engine_calls(&engine);
    assert!(!calls[0].1);
    assert_eq!(calls[0].2, None);
    assert_eq!(calls[0].0[0], Message::system("chat prompt"));
}

#[tokio::test]
async fn search_mode_renders_sources_as_one_snapshot() {
    let retriever = FakeRetriever {
        passages: vec![passage("a.pdf", "3", "X is a thing."), passage("a.pdf", "3", "dup"), passage("c.txt", "1", "More on X.")],
        ..FakeRetriever::default()
    };
    let engine = engine(FakeIngestor::default(), ScriptedGenerator::new(vec![], vec![]), retriever)
        .with_pacing(Duration::from_secs(3600));

    let stream = engine.chat(&session(), "What is X?", &[], Mode::SearchFiles).await.unwrap();
    let snaps = snapshots(stream).await;

    assert_eq!(snaps, vec!["1. **a.pdf (page 3)**\n X is a thing.\n\n\n2. **c.txt (page 1)**\n More on X.".to_string()]);
    assert!(!snaps[0].contains(SOURCES_SEPARATOR));
    assert_eq!(engine.retriever().calls.lock().unwrap()[0], ("What is X?".to_string(), SEARCH_LIMIT, SEARCH_PREV_NEXT_CHUNKS));
    assert!(engine_calls(&engine).is_empty(), "search mode does not generate");
}

#[tokio::test]
async fn unknown_mode_tag_is_rejected() {
    let engine = engine(FakeIngestor::default(), ScriptedGenerator::new(vec![], vec![]), FakeRetriever::default());
    let err = engine.chat_tagged(&session(), "q", &[], "query files").await.err().expect("must fail");
    assert!(matches!(err, Error::InvalidMode(tag) if tag == "query files"));
    assert!(engine_calls(&engine).is_empty());

    for mode in Mode::ALL {
        assert_eq!(mode.as_str().parse::<Mode>().unwrap(), mode);
    }
}

#[tokio::test]
async fn generation_failures_propagate() {
    let refusing = ScriptedGenerator { refuse: true, ..ScriptedGenerator::default() };
    let engine = engine(FakeIngestor::default(), refusing, FakeRetriever::default());
    let err = engine.chat(&session(), "q", &[], Mode::LlmChat).await.err().expect("must fail");
    assert!(matches!(err, Error::Generation(_)));

    let midway = ScriptedGenerator::new(vec![Step::Text("part"), Step::Fail("provider hung up"), Step::Text("never")], vec![passage("a", "1", "t")]);
    let engine = engine_with(midway);
    let mut stream = engine.chat(&session(), "q", &[], Mode::QueryFiles).await.unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap(), "part");
    assert!(matches!(stream.next().await, Some(Err(Error::Generation(m))) if m == "provider hung up"));
    assert!(stream.next().await.is_none());
    assert!(stream.is_done());
}

fn engine_with(generator: ScriptedGenerator) -> TestEngine {
    engine(FakeIngestor::default(), generator, FakeRetriever::default())
}

#[tokio::test]
async fn retrieval_failure_in_search_mode_propagates() {
    let retriever = FakeRetriever { fail: true, ..FakeRetriever::default() };
    let engine = engine(FakeIngestor::default(), ScriptedGenerator::default(), retriever);
    let err = engine.chat(&session(), "q", &[], Mode::SearchFiles).await.err().expect("must fail");
    assert!(matches!(err, Error::Retrieval(_)));
}

#[tokio::test]
async fn dropping_the_stream_releases_the_generator() {
    let (tx, rx) = oneshot::channel();
    let generator = EndlessGenerator { released: Mutex::new(Some(tx)) };
    let engine = ChatEngine::new(FakeIngestor::default(), generator, FakeRetriever::default()).with_pacing(Duration::ZERO);

    let mut stream = engine.chat(&session(), "q", &[], Mode::LlmChat).await.unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap(), "tick ");
    assert_eq!(stream.next().await.unwrap().unwrap(), "tick tick ");
    stream.close();

    let sent = tokio::time::timeout(Duration::from_secs(5), rx).await.expect("producer stopped").unwrap();
    assert!(sent >= 2);
}

#[tokio::test(start_paused = true)]
async fn snapshots_are_paced() {
    let generator = ScriptedGenerator::new(vec![Step::Text("a"), Step::Text("b"), Step::Text("c")], vec![]);
    let engine = engine_with(generator).with_pacing(Duration::from_millis(20));

    let start = tokio::time::Instant::now();
    let stream = engine.chat(&session(), "q", &[], Mode::LlmChat).await.unwrap();
    let all: Vec<String> = stream.into_stream().map(|s| s.unwrap()).collect().await;

    assert_eq!(all, vec!["a", "ab", "abc"]);
    assert!(start.elapsed() >= Duration::from_millis(40), "two gaps between three snapshots");
}

#[tokio::test]
async fn empty_generation_still_renders_once() {
    let engine = engine_with(ScriptedGenerator::new(vec![], vec![]));
    let stream = engine.chat(&session(), "q", &[], Mode::LlmChat).await.unwrap();
    assert_eq!(stream.final_text().await.unwrap(), "");
}

#[test]
fn upload_replaces_documents_with_the_same_name() {
    let ingestor = FakeIngestor::with_docs(vec![unit("1", "a.pdf", "1"), unit("2", "a.pdf", "2"), unit("3", "b.pdf", "1")]);
    let engine = engine(ingestor, ScriptedGenerator::default(), FakeRetriever::default());

    let count = engine.upload(&[PathBuf::from("/tmp/up/a.pdf"), PathBuf::from("/tmp/up/c.pdf")]).unwrap();
    assert_eq!(count, 2);
    assert_eq!(engine.list_ingested_files().unwrap(), vec!["a.pdf", "b.pdf", "c.pdf"]);
    let remaining: Vec<String> = engine.ingestor().docs.lock().unwrap().iter().map(|d| d.doc_id.clone()).collect();
    assert!(!remaining.contains(&"1".to_string()) && !remaining.contains(&"2".to_string()));
    assert_eq!(engine.ingestor().ingested.lock().unwrap()[0], ("a.pdf".to_string(), PathBuf::from("/tmp/up/a.pdf")));
}

#[test]
fn listing_skips_units_without_metadata() {
    let mut docs = vec![unit("1", "a.pdf", "1"), unit("2", "a.pdf", "2")];
    docs.push(docchat_core::types::IngestedDoc { doc_id: "3".into(), doc_metadata: None });
    docs.push(docchat_core::types::IngestedDoc { doc_id: "4".into(), doc_metadata: Some(Default::default()) });
    let engine = engine(FakeIngestor::with_docs(docs), ScriptedGenerator::default(), FakeRetriever::default());
    assert_eq!(engine.list_ingested_files().unwrap(), vec!["[FILE NAME MISSING]", "a.pdf"]);
}

#[test]
fn deleting_the_selected_file_removes_every_page_and_clears_selection() {
    let ingestor = FakeIngestor::with_docs(vec![unit("1", "a.pdf", "1"), unit("2", "b.pdf", "1"), unit("3", "a.pdf", "2")]);
    let engine = engine(ingestor, ScriptedGenerator::default(), FakeRetriever::default());
    let mut session = session();

    assert_eq!(engine.delete_selected_file(&mut session).unwrap(), 0, "nothing selected");

    session.select_file("a.pdf");
    assert_eq!(engine.delete_selected_file(&mut session).unwrap(), 2);
    assert_eq!(session.selected_file(), None);
    assert_eq!(session.selected_label(), "All files");
    assert_eq!(engine.list_ingested_files().unwrap(), vec!["b.pdf"]);

    session.select_file("b.pdf");
    assert_eq!(engine.delete_all_files(&mut session).unwrap(), 1);
    assert!(engine.list_ingested_files().unwrap().is_empty());
    assert_eq!(session.selected_file(), None);
}

#[test]
fn session_defaults_follow_the_mode() {
    let mut session = session();
    assert_eq!(session.mode(), Mode::QueryFiles);
    assert_eq!(session.system_prompt(), "query prompt");

    session.set_mode(Mode::SearchFiles);
    assert_eq!(session.system_prompt(), "");
    session.set_mode(Mode::LlmChat);
    assert_eq!(session.system_prompt(), "chat prompt");

    session.set_system_prompt("custom");
    assert_eq!(session.system_prompt(), "custom");
    assert_eq!(session.mode(), Mode::LlmChat);
}
