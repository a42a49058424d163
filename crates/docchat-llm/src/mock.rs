use async_trait::async_trait;
use tokio::sync::mpsc;

use docchat_core::error::Result;
use docchat_core::types::{Delta, DeltaReceiver, Message, Role};

use crate::provider::LlmClient;

/// Offline client for `llm.mode = "mock"`: echoes the last user message back
/// one word at a time.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient;

impl MockLlmClient {
    pub fn new() -> Self {
        Self
    }

    pub fn reply_to(messages: &[Message]) -> String {
        let last = messages.iter().rev().find(|m| m.role == Role::User).map(|m| m.content.as_str()).unwrap_or("");
        format!("This is a mock response to: {}", last)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn model_name(&self) -> &str {
        "mock"
    }

    async fn stream(&self, messages: Vec<Message>) -> Result<DeltaReceiver> {
        let reply = Self::reply_to(&messages);
        let (tx, rx) = mpsc::channel(8);
        tokio::spawn(async move {
            for word in reply.split_inclusive(' ') {
                if tx.send(Ok(Delta::Text(word.to_string()))).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }
}
