#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use docchat_chat::{ChatEngine, Session};
use docchat_core::config::UiSettings;
use docchat_core::error::{Error, Result};
use docchat_core::traits::{Generator, Ingestor, Retriever};
use docchat_core::types::{Completion, Delta, IngestedDoc, Message, Meta, RetrievedPassage, ScopeFilter};

pub fn meta(file: &str, page: &str) -> Meta {
    let mut m = Meta::new();
    m.insert("file_name".to_string(), file.to_string());
    m.insert("page_label".to_string(), page.to_string());
    m
}

pub fn unit(id: &str, file: &str, page: &str) -> IngestedDoc {
    IngestedDoc { doc_id: id.to_string(), doc_metadata: Some(meta(file, page)) }
}

pub fn passage(file: &str, page: &str, text: &str) -> RetrievedPassage {
    RetrievedPassage { document: unit("x", file, page), text: text.to_string(), score: 1.0 }
}

pub fn session() -> Session {
    let ui = UiSettings {
        default_query_system_prompt: "query prompt".to_string(),
        default_chat_system_prompt: "chat prompt".to_string(),
        ..UiSettings::default()
    };
    Session::new(ui)
}

#[derive(Default)]
pub struct FakeIngestor {
    pub docs: Mutex<Vec<IngestedDoc>>,
    pub ingested: Mutex<Vec<(String, PathBuf)>>,
    next_id: AtomicUsize,
}

impl FakeIngestor {
    pub fn with_docs(docs: Vec<IngestedDoc>) -> Self {
        let next_id = AtomicUsize::new(docs.len());
        Self { docs: Mutex::new(docs), next_id, ..Self::default() }
    }
}

impl Ingestor for FakeIngestor {
    fn list_ingested(&self) -> Result<Vec<IngestedDoc>> {
        Ok(self.docs.lock().unwrap().clone())
    }

    fn delete(&self, doc_id: &str) -> Result<()> {
        self.docs.lock().unwrap().retain(|d| d.doc_id != doc_id);
        Ok(())
    }

    fn bulk_ingest(&self, files: &[(String, PathBuf)]) -> Result<Vec<IngestedDoc>> {
        let mut out = Vec::new();
        for (name, path) in files {
            let id = format!("doc-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
            let doc = unit(&id, name, "1");
            self.docs.lock().unwrap().push(doc.clone());
            self.ingested.lock().unwrap().push((name.clone(), path.clone()));
            out.push(doc);
        }
        Ok(out)
    }
}

#[derive(Default)]
pub struct FakeRetriever {
    pub passages: Vec<RetrievedPassage>,
    pub calls: Mutex<Vec<(String, usize, usize)>>,
    pub fail: bool,
}

impl Retriever for FakeRetriever {
    fn retrieve_relevant(&self, text: &str, limit: usize, prev_next_chunks: usize, _filter: Option<&ScopeFilter>) -> Result<Vec<RetrievedPassage>> {
        self.calls.lock().unwrap().push((text.to_string(), limit, prev_next_chunks));
        if self.fail {
            return Err(Error::Retrieval("index unavailable".to_string()));
        }
        Ok(self.passages.iter().take(limit).cloned().collect())
    }
}

#[derive(Clone)]
pub enum Step {
    Text(&'static str),
    Chunk(Option<&'static str>),
    Fail(&'static str),
}

/// Replays a fixed script of deltas and records every call it receives.
#[derive(Default)]
pub struct ScriptedGenerator {
    pub script: Vec<Step>,
    pub sources: Vec<RetrievedPassage>,
    pub calls: Mutex<Vec<(Vec<Message>, bool, Option<ScopeFilter>)>>,
    pub refuse: bool,
}

impl ScriptedGenerator {
    pub fn new(script: Vec<Step>, sources: Vec<RetrievedPassage>) -> Self {
        Self { script, sources, ..Self::default() }
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn stream_chat(&self, messages: Vec<Message>, use_context: bool, filter: Option<ScopeFilter>) -> Result<Completion> {
        self.calls.lock().unwrap().push((messages, use_context, filter));
        if self.refuse {
            return Err(Error::Generation("connection refused".to_string()));
        }
        let (tx, rx) = mpsc::channel(self.script.len() + 1);
        for step in &self.script {
            let item = match step {
                Step::Text(t) => Ok(Delta::Text(t.to_string())),
                Step::Chunk(c) => Ok(Delta::Chunk { delta: c.map(str::to_string) }),
                Step::Fail(m) => Err(Error::Generation(m.to_string())),
            };
            tx.try_send(item).expect("script fits the channel");
        }
        Ok(Completion { deltas: rx, sources: self.sources.clone() })
    }
}

/// Produces deltas until the consumer goes away, then reports it.
pub struct EndlessGenerator {
    pub released: Mutex<Option<oneshot::Sender<usize>>>,
}

#[async_trait]
impl Generator for EndlessGenerator {
    async fn stream_chat(&self, _messages: Vec<Message>, _use_context: bool, _filter: Option<ScopeFilter>) -> Result<Completion> {
        let (tx, rx) = mpsc::channel(1);
        let report = self.released.lock().unwrap().take();
        tokio::spawn(async move {
            let mut sent = 0;
            while tx.send(Ok(Delta::Text("tick ".to_string()))).await.is_ok() {
                sent += 1;
            }
            if let Some(report) = report {
                let _ = report.send(sent);
            }
        });
        Ok(Completion { deltas: rx, sources: vec![] })
    }
}

pub type TestEngine = ChatEngine<FakeIngestor, ScriptedGenerator, FakeRetriever>;

pub fn engine(ingestor: FakeIngestor, generator: ScriptedGenerator, retriever: FakeRetriever) -> TestEngine {
    ChatEngine::new(ingestor, generator, retriever).with_pacing(std::time::Duration::ZERO)
}

pub async fn snapshots(mut stream: docchat_chat::ResponseStream) -> Vec<String> {
    let mut out = Vec::new();
    while let Some(s) = stream.next().await {
        out.push(s.expect("snapshot"));
    }
    out
}
