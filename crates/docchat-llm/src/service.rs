use async_trait::async_trait;
use tracing::debug;

use docchat_core::config::RagSettings;
use docchat_core::error::Result;
use docchat_core::traits::{Generator, Retriever};
use docchat_core::types::{Completion, Message, RetrievedPassage, Role, ScopeFilter};

use crate::provider::LlmClient;

const CONTEXT_RULE: &str = "--------------------";

/// Generation collaborator that optionally grounds the conversation in
/// retrieved passages before streaming from an [`LlmClient`].
pub struct ContextChatService<R, L> {
    retriever: R,
    llm: L,
    rag: RagSettings,
}

impl<R: Retriever, L: LlmClient> ContextChatService<R, L> {
    pub fn new(retriever: R, llm: L, rag: RagSettings) -> Self {
        Self { retriever, llm, rag }
    }

    pub fn llm(&self) -> &L {
        &self.llm
    }
}

/// Render passages as the context block placed in the system message.
pub fn context_block(passages: &[RetrievedPassage]) -> String {
    let body = passages.iter().map(|p| p.text.as_str()).collect::<Vec<_>>().join("\n\n");
    format!("Context information is below.\n{CONTEXT_RULE}\n{body}\n{CONTEXT_RULE}\n")
}

/// Merge the context block into the leading system message, or add one.
pub fn with_context(mut messages: Vec<Message>, passages: &[RetrievedPassage]) -> Vec<Message> {
    let block = context_block(passages);
    if messages.first().is_some_and(|m| m.role == Role::System) {
        let merged = Message::system(format!("{}\n\n{}", messages[0].content, block));
        messages[0] = merged;
    } else {
        messages.insert(0, Message::system(block));
    }
    messages
}

#[async_trait]
impl<R: Retriever, L: LlmClient> Generator for ContextChatService<R, L> {
    async fn stream_chat(
        &self,
        messages: Vec<Message>,
        use_context: bool,
        filter: Option<ScopeFilter>,
    ) -> Result<Completion> {
        let (messages, sources) = if use_context {
            let query = messages.iter().rev().find(|m| m.role == Role::User).map(|m| m.content.clone()).unwrap_or_default();
            let passages = self.retriever.retrieve_relevant(
                &query,
                self.rag.similarity_top_k,
                self.rag.prev_next_chunks,
                filter.as_ref(),
            )?;
            debug!(passages = passages.len(), scoped = filter.is_some(), "grounding chat in retrieved context");
            (with_context(messages, &passages), passages)
        } else {
            (messages, Vec::new())
        };
        let deltas = self.llm.stream(messages).await?;
        Ok(Completion { deltas, sources })
    }
}
