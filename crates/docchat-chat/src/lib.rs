#![deny(warnings)]
#![deny(unused_imports)]

//! docchat-chat
//!
//! Chat orchestration over a retrieval-augmented backend: compacts history,
//! dispatches on the interaction mode, streams the answer as growing
//! snapshots and appends deduplicated citations.

pub mod history;
pub mod mode;
pub mod session;
pub mod sources;
pub mod stream;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, warn};

use docchat_core::error::{Error, Result};
use docchat_core::traits::{doc_ids_for_file, Generator, Ingestor, Retriever};
use docchat_core::types::{ScopeFilter, Turn};

pub use mode::{Dispatch, Mode};
pub use session::Session;
pub use stream::ResponseStream;

/// Shown for ingested units whose metadata has no file name.
pub const FILE_NAME_MISSING: &str = "[FILE NAME MISSING]";

pub struct ChatEngine<I, G, R> {
    ingestor: I,
    generator: G,
    retriever: R,
    pacing: Duration,
}

impl<I, G, R> ChatEngine<I, G, R>
where
    I: Ingestor,
    G: Generator,
    R: Retriever,
{
    pub fn new(ingestor: I, generator: G, retriever: R) -> Self {
        Self { ingestor, generator, retriever, pacing: stream::DEFAULT_PACING }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn ingestor(&self) -> &I {
        &self.ingestor
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn retriever(&self) -> &R {
        &self.retriever
    }

    /// Filter for the contextual mode: every unit sharing the selected file
    /// name, or no filter without a selection. A selection that no longer
    /// resolves gives an empty filter, so retrieval finds nothing.
    pub fn resolve_scope(&self, session: &Session) -> Result<Option<ScopeFilter>> {
        let Some(selected) = session.selected_file() else {
            return Ok(None);
        };
        let ids = doc_ids_for_file(&self.ingestor.list_ingested()?, selected);
        if ids.is_empty() {
            warn!(file = selected, "selected file has no ingested documents; retrieval will find nothing");
        }
        Ok(Some(ScopeFilter::new(ids)))
    }

    /// Answer `message` in `mode`. Errors raised while starting the call are
    /// returned here; errors during generation arrive through the stream.
    pub async fn chat(&self, session: &Session, message: &str, history: &[Turn], mode: Mode) -> Result<ResponseStream> {
        let dispatch = Dispatch::for_mode(mode, || self.resolve_scope(session))?;
        debug!(%mode, history = history.len(), "dispatching chat");
        match dispatch {
            Dispatch::Generate { use_context, filter } => {
                let messages = history::build_messages(history, session.system_prompt(), message);
                let completion = self.generator.stream_chat(messages, use_context, filter).await?;
                Ok(ResponseStream::streaming(completion, self.pacing))
            }
            Dispatch::Search { limit, prev_next_chunks } => {
                let passages = self.retriever.retrieve_relevant(message, limit, prev_next_chunks, None)?;
                let curated = sources::curate_sources(&passages);
                Ok(ResponseStream::single(sources::search_results(&curated)))
            }
        }
    }

    /// [`ChatEngine::chat`] for a raw mode tag; unknown tags are an error.
    pub async fn chat_tagged(&self, session: &Session, message: &str, history: &[Turn], tag: &str) -> Result<ResponseStream> {
        let mode: Mode = tag.parse()?;
        self.chat(session, message, history, mode).await
    }

    /// Distinct file names of ingested units, sorted.
    pub fn list_ingested_files(&self) -> Result<Vec<String>> {
        let files: BTreeSet<String> = self
            .ingestor
            .list_ingested()?
            .into_iter()
            .filter(|doc| doc.doc_metadata.is_some())
            .map(|doc| doc.file_name().unwrap_or(FILE_NAME_MISSING).to_string())
            .collect();
        Ok(files.into_iter().collect())
    }

    /// Ingest `paths`, replacing any documents already ingested under the same file names.
    pub fn upload(&self, paths: &[PathBuf]) -> Result<usize> {
        debug!(count = paths.len(), "Loading files");
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| Error::Ingestion(format!("not a file path: {}", path.display())))?;
            files.push((name, path.clone()));
        }

        let to_replace: Vec<String> = self
            .ingestor
            .list_ingested()?
            .into_iter()
            .filter(|doc| doc.file_name().is_some_and(|f| files.iter().any(|(name, _)| name == f)))
            .map(|doc| doc.doc_id)
            .collect();
        if !to_replace.is_empty() {
            info!(
                replaced = to_replace.len(),
                "Uploading file(s) which were already ingested: document(s) will be replaced"
            );
            for doc_id in &to_replace {
                self.ingestor.delete(doc_id)?;
            }
        }
        Ok(self.ingestor.bulk_ingest(&files)?.len())
    }

    /// Delete every page of the selected file and clear the selection.
    pub fn delete_selected_file(&self, session: &mut Session) -> Result<usize> {
        let Some(selected) = session.selected_file().map(str::to_string) else {
            return Ok(0);
        };
        debug!(file = %selected, "Deleting selected file");
        let ids = doc_ids_for_file(&self.ingestor.list_ingested()?, &selected);
        for doc_id in &ids {
            self.ingestor.delete(doc_id)?;
        }
        session.deselect_file();
        Ok(ids.len())
    }

    pub fn delete_all_files(&self, session: &mut Session) -> Result<usize> {
        let docs = self.ingestor.list_ingested()?;
        debug!(count = docs.len(), "Deleting all files");
        for doc in &docs {
            self.ingestor.delete(&doc.doc_id)?;
        }
        session.deselect_file();
        Ok(docs.len())
    }
}
