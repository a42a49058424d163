use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::Result;
use crate::types::{Completion, DocId, IngestedDoc, Message, RetrievedPassage, ScopeFilter};

pub trait Ingestor: Send + Sync {
    fn list_ingested(&self) -> Result<Vec<IngestedDoc>>;
    fn delete(&self, doc_id: &str) -> Result<()>;
    fn bulk_ingest(&self, files: &[(String, PathBuf)]) -> Result<Vec<IngestedDoc>>;
}

pub trait Retriever: Send + Sync {
    /// Top `limit` passages for `text`. `prev_next_chunks` widens each passage
    /// with that many neighbouring chunks on either side.
    fn retrieve_relevant(
        &self,
        text: &str,
        limit: usize,
        prev_next_chunks: usize,
        filter: Option<&ScopeFilter>,
    ) -> Result<Vec<RetrievedPassage>>;
}

#[async_trait]
pub trait Generator: Send + Sync {
    /// Start a streamed completion. Each call yields a fresh, single-use completion.
    async fn stream_chat(
        &self,
        messages: Vec<Message>,
        use_context: bool,
        filter: Option<ScopeFilter>,
    ) -> Result<Completion>;
}

impl<T: Ingestor + ?Sized> Ingestor for std::sync::Arc<T> {
    fn list_ingested(&self) -> Result<Vec<IngestedDoc>> { (**self).list_ingested() }
    fn delete(&self, doc_id: &str) -> Result<()> { (**self).delete(doc_id) }
    fn bulk_ingest(&self, files: &[(String, PathBuf)]) -> Result<Vec<IngestedDoc>> { (**self).bulk_ingest(files) }
}

impl<T: Retriever + ?Sized> Retriever for std::sync::Arc<T> {
    fn retrieve_relevant(&self, text: &str, limit: usize, prev_next_chunks: usize, filter: Option<&ScopeFilter>) -> Result<Vec<RetrievedPassage>> {
        (**self).retrieve_relevant(text, limit, prev_next_chunks, filter)
    }
}

/// Ids of every ingested unit whose file name equals `file_name`.
pub fn doc_ids_for_file(docs: &[IngestedDoc], file_name: &str) -> Vec<DocId> {
    docs.iter()
        .filter(|d| d.file_name() == Some(file_name))
        .map(|d| d.doc_id.clone())
        .collect()
}
