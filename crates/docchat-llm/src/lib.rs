//! docchat-llm
//!
//! The generation side of the chat engine: LLM clients that stream deltas
//! over a channel, and [`ContextChatService`], which grounds a conversation
//! in retrieved passages before handing it to a client.

pub mod mock;
pub mod openai;
pub mod provider;
pub mod service;

pub use mock::MockLlmClient;
pub use openai::OpenAiCompatibleClient;
pub use provider::{build_llm_client, LlmClient};
pub use service::ContextChatService;
