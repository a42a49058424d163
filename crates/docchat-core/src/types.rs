//! Domain types shared by the store, the generation service and the chat engine.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::mpsc;

use crate::error::Result;

pub type DocId = String;
pub type Meta = HashMap<String, String>;

pub const FILE_NAME_KEY: &str = "file_name";
pub const PAGE_LABEL_KEY: &str = "page_label";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry of the generation input. Built once, never edited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// A stored exchange: what the user said and what was rendered back,
/// possibly including a trailing citation block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub user: String,
    pub assistant: String,
}

impl Turn {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self { user: user.into(), assistant: assistant.into() }
    }
}

/// Restricts retrieval to an explicit set of ingested units.
///
/// `None` at the call site means unrestricted retrieval. A filter with an
/// empty id set matches nothing; it never widens to "everything".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeFilter {
    pub doc_ids: BTreeSet<DocId>,
}

impl ScopeFilter {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<DocId>,
    {
        Self { doc_ids: ids.into_iter().map(Into::into).collect() }
    }

    pub fn matches(&self, doc_id: &str) -> bool {
        self.doc_ids.contains(doc_id)
    }

    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }
}

/// An ingested unit (one page of a file) as reported by the ingestion side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestedDoc {
    pub doc_id: DocId,
    pub doc_metadata: Option<Meta>,
}

impl IngestedDoc {
    pub fn file_name(&self) -> Option<&str> {
        self.meta(FILE_NAME_KEY)
    }

    pub fn page_label(&self) -> Option<&str> {
        self.meta(PAGE_LABEL_KEY)
    }

    fn meta(&self, key: &str) -> Option<&str> {
        self.doc_metadata.as_ref().and_then(|m| m.get(key)).map(String::as_str)
    }
}

/// A passage returned by retrieval, read-only to the chat engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedPassage {
    pub document: IngestedDoc,
    pub text: String,
    pub score: f32,
}

/// One incremental unit produced by a generation backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta {
    /// Plain text appended verbatim.
    Text(String),
    /// Structured chunk whose fragment may be absent (role-only or keep-alive chunks).
    Chunk { delta: Option<String> },
}

impl Delta {
    pub fn fragment(&self) -> &str {
        match self {
            Delta::Text(text) => text,
            Delta::Chunk { delta } => delta.as_deref().unwrap_or(""),
        }
    }
}

pub type DeltaReceiver = mpsc::Receiver<Result<Delta>>;

/// An in-flight generation: deltas in arrival order plus the passages the
/// answer was grounded on. Dropping `deltas` tells the producer to stop.
#[derive(Debug)]
pub struct Completion {
    pub deltas: DeltaReceiver,
    pub sources: Vec<RetrievedPassage>,
}
