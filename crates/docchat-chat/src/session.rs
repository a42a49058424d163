//! Per-front-end chat state, passed explicitly into each chat call.

use tracing::info;

use docchat_core::config::UiSettings;

use crate::mode::Mode;

pub const ALL_FILES_LABEL: &str = "All files";

/// Mode, system prompt and document scope of one UI instance. The owner is
/// the only writer; each chat call reads a consistent view of it.
#[derive(Debug, Clone)]
pub struct Session {
    mode: Mode,
    system_prompt: String,
    selected_file: Option<String>,
    defaults: UiSettings,
}

impl Session {
    pub fn new(defaults: UiSettings) -> Self {
        let mode = Mode::QueryFiles;
        let system_prompt = default_system_prompt(&defaults, mode);
        Self { mode, system_prompt, selected_file: None, defaults }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn selected_file(&self) -> Option<&str> {
        self.selected_file.as_deref()
    }

    /// Label for the scope selector.
    pub fn selected_label(&self) -> &str {
        self.selected_file().unwrap_or(ALL_FILES_LABEL)
    }

    /// Switch mode and reset the system prompt to that mode's default.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        let prompt = default_system_prompt(&self.defaults, mode);
        self.set_system_prompt(prompt);
    }

    pub fn set_system_prompt(&mut self, system_prompt: impl Into<String>) {
        self.system_prompt = system_prompt.into();
        info!(system_prompt = %self.system_prompt, "Setting system prompt");
    }

    pub fn select_file(&mut self, file_name: impl Into<String>) {
        self.selected_file = Some(file_name.into());
    }

    pub fn deselect_file(&mut self) {
        self.selected_file = None;
    }
}

/// Search mode has no generation and therefore no prompt.
pub fn default_system_prompt(defaults: &UiSettings, mode: Mode) -> String {
    match mode {
        Mode::QueryFiles => defaults.default_query_system_prompt.clone(),
        Mode::LlmChat => defaults.default_chat_system_prompt.clone(),
        Mode::SearchFiles => String::new(),
    }
}
