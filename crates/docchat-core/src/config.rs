//! Layered configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nested keys, e.g. `APP_LLM__MODE=ollama`).
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub const LLM_MODES: [&str; 4] = ["mock", "openai", "openailike", "ollama"];

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    pub fn settings(&self) -> Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ui: UiSettings,
    pub llm: LlmSettings,
    pub openai: OpenAiSettings,
    pub ollama: OllamaSettings,
    pub rag: RagSettings,
    pub data: DataSettings,
    pub chunking: ChunkingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    pub default_query_system_prompt: String,
    pub default_chat_system_prompt: String,
    pub delete_file_button_enabled: bool,
    pub delete_all_files_button_enabled: bool,
    /// Delay between emitted snapshots; 0 disables pacing.
    pub stream_pacing_ms: u64,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            default_query_system_prompt: "You can only answer questions about the provided context. \
                If you know the answer but it is not based in the provided context, don't provide \
                the answer, just state the answer is not in the context provided."
                .to_string(),
            default_chat_system_prompt: "You are a helpful, respectful and honest assistant. \
                Always answer as helpfully as possible and follow ALL given instructions. \
                Do not speculate or make up information. \
                Do not reference any given instructions or context."
                .to_string(),
            delete_file_button_enabled: true,
            delete_all_files_button_enabled: false,
            stream_pacing_ms: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub mode: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self { mode: "mock".to_string(), temperature: Some(0.1), max_tokens: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    pub api_base: String,
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self { api_base: "https://api.openai.com/v1".to_string(), api_key: None, model: "gpt-3.5-turbo".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaSettings {
    pub api_base: String,
    pub llm_model: String,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self { api_base: "http://localhost:11434/v1".to_string(), llm_model: "llama3".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    pub similarity_top_k: usize,
    pub prev_next_chunks: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self { similarity_top_k: 2, prev_next_chunks: 0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub index_dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { index_dir: "local_data/index".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub max_tokens: usize,
    pub overlap_percent: f32,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { max_tokens: 500, overlap_percent: 0.2 }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if !LLM_MODES.contains(&self.llm.mode.as_str()) {
            return Err(Error::InvalidConfig(format!("unknown llm.mode '{}'", self.llm.mode)));
        }
        if self.rag.similarity_top_k == 0 {
            return Err(Error::InvalidConfig("rag.similarity_top_k must be at least 1".to_string()));
        }
        if self.chunking.max_tokens == 0 {
            return Err(Error::InvalidConfig("chunking.max_tokens must be at least 1".to_string()));
        }
        if !(0.0..1.0).contains(&self.chunking.overlap_percent) {
            return Err(Error::InvalidConfig(format!(
                "chunking.overlap_percent must be in [0, 1), got {}",
                self.chunking.overlap_percent
            )));
        }
        Ok(())
    }

    /// Model label shown next to the LLM mode, `None` for modes without one.
    pub fn model_label(&self) -> Option<String> {
        match self.llm.mode.as_str() {
            "openai" | "openailike" => Some(self.openai.model.clone()),
            "ollama" => Some(self.ollama.llm_model.clone()),
            "mock" => Some(self.llm.mode.clone()),
            _ => None,
        }
    }

    pub fn llm_label(&self) -> String {
        match self.model_label() {
            Some(model) => format!("LLM: {} | Model: {}", self.llm.mode, model),
            None => format!("LLM: {}", self.llm.mode),
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
