use async_trait::async_trait;

use docchat_core::config::Settings;
use docchat_core::error::{Error, Result};
use docchat_core::types::{DeltaReceiver, Message};

use crate::mock::MockLlmClient;
use crate::openai::OpenAiCompatibleClient;

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// model identifier sent with each request
    fn model_name(&self) -> &str;

    /// streaming chat completion; dropping the receiver stops the producer
    async fn stream(&self, messages: Vec<Message>) -> Result<DeltaReceiver>;
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Box<T> {
    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    async fn stream(&self, messages: Vec<Message>) -> Result<DeltaReceiver> {
        (**self).stream(messages).await
    }
}

/// Pick the client for `llm.mode`.
pub fn build_llm_client(settings: &Settings) -> Result<Box<dyn LlmClient>> {
    let client: Box<dyn LlmClient> = match settings.llm.mode.as_str() {
        "mock" => Box::new(MockLlmClient::new()),
        "openai" | "openailike" => Box::new(
            OpenAiCompatibleClient::new(settings.openai.api_base.clone(), settings.openai.model.clone())
                .with_api_key(settings.openai.api_key.clone())
                .with_sampling(settings.llm.temperature, settings.llm.max_tokens),
        ),
        "ollama" => Box::new(
            OpenAiCompatibleClient::new(settings.ollama.api_base.clone(), settings.ollama.llm_model.clone())
                .with_sampling(settings.llm.temperature, settings.llm.max_tokens),
        ),
        other => return Err(Error::InvalidConfig(format!("unsupported llm.mode '{}'", other))),
    };
    Ok(client)
}
