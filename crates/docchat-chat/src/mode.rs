//! Interaction modes and what each one asks of the collaborators.

use std::fmt;
use std::str::FromStr;

use docchat_core::error::Error;
use docchat_core::types::ScopeFilter;

/// Passages shown by the search mode.
pub const SEARCH_LIMIT: usize = 4;
/// Search results are never widened with neighbouring chunks.
pub const SEARCH_PREV_NEXT_CHUNKS: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    QueryFiles,
    SearchFiles,
    LlmChat,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::QueryFiles, Mode::SearchFiles, Mode::LlmChat];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::QueryFiles => "Query Files",
            Mode::SearchFiles => "Search Files",
            Mode::LlmChat => "LLM Chat (no context from files)",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    /// Exact, case-sensitive tags only.
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|m| m.as_str() == tag)
            .ok_or_else(|| Error::InvalidMode(tag.to_string()))
    }
}

/// The collaborator call a mode resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Generate { use_context: bool, filter: Option<ScopeFilter> },
    Search { limit: usize, prev_next_chunks: usize },
}

impl Dispatch {
    /// `scope` is only consulted for the contextual mode.
    pub fn for_mode(mode: Mode, scope: impl FnOnce() -> docchat_core::error::Result<Option<ScopeFilter>>) -> docchat_core::error::Result<Self> {
        Ok(match mode {
            Mode::QueryFiles => Dispatch::Generate { use_context: true, filter: scope()? },
            Mode::LlmChat => Dispatch::Generate { use_context: false, filter: None },
            Mode::SearchFiles => Dispatch::Search { limit: SEARCH_LIMIT, prev_next_chunks: SEARCH_PREV_NEXT_CHUNKS },
        })
    }
}
