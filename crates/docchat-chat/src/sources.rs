//! Citation curation shared by the streamed answer and the search view.

use std::collections::HashSet;

use docchat_core::types::RetrievedPassage;

/// Stand-in for missing file name or page label metadata.
pub const MISSING: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub file: String,
    pub page: String,
    pub text: String,
}

impl Source {
    pub fn from_passage(passage: &RetrievedPassage) -> Self {
        Self {
            file: passage.document.file_name().unwrap_or(MISSING).to_string(),
            page: passage.document.page_label().unwrap_or(MISSING).to_string(),
            text: passage.text.clone(),
        }
    }

    fn key(&self) -> (&str, &str) {
        (&self.file, &self.page)
    }
}

/// Stable dedup on `(file, page)`: first occurrence wins and keeps its text.
pub fn curate_sources(passages: &[RetrievedPassage]) -> Vec<Source> {
    let mut seen = HashSet::new();
    let mut curated = Vec::new();
    for source in passages.iter().map(Source::from_passage) {
        if seen.insert((source.file.clone(), source.page.clone())) {
            curated.push(source);
        }
    }
    curated
}

/// Numbered citation lines appended after [`crate::history::SOURCES_SEPARATOR`].
pub fn citation_block(sources: &[Source]) -> String {
    let mut out = String::from("\n\n\n");
    let mut used = HashSet::new();
    for (index, source) in sources.iter().enumerate() {
        if used.insert(source.key()) {
            out.push_str(&format!("{}. {} (page {}) \n\n", index + 1, source.file, source.page));
        }
    }
    out
}

/// The whole response of the search mode.
pub fn search_results(sources: &[Source]) -> String {
    sources
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. **{} (page {})**\n {}", i + 1, s.file, s.page, s.text))
        .collect::<Vec<_>>()
        .join("\n\n\n")
}
