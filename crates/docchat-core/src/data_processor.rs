use std::fs;
use std::path::Path;

use crate::config::ChunkingSettings;
use crate::error::Result;

/// Page separator emitted by most text extractors (`pdftotext` and friends).
pub const PAGE_BREAK: char = '\u{0c}';

/// One page of a source file, already split into indexable chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageChunks {
    /// 1-based page number rendered as text.
    pub page_label: String,
    pub chunks: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub max_tokens: usize,
    pub overlap_percent: f32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_tokens: 500, overlap_percent: 0.2 }
    }
}

impl From<&ChunkingSettings> for ChunkingConfig {
    fn from(s: &ChunkingSettings) -> Self {
        Self { max_tokens: s.max_tokens, overlap_percent: s.overlap_percent }
    }
}

#[derive(Default)]
pub struct DataProcessor {
    chunking_config: ChunkingConfig,
}

impl DataProcessor {
    pub fn new() -> Self { Self::default() }

    pub fn with_config(chunking_config: ChunkingConfig) -> Self { Self { chunking_config } }

    pub fn process_file(&self, file_path: &Path) -> Result<Vec<PageChunks>> {
        let content = self.read_file_content(file_path)?;
        Ok(self.process_text(&content))
    }

    /// Split `content` into pages and each page into chunks. Blank pages are
    /// skipped but still consume a page number.
    pub fn process_text(&self, content: &str) -> Vec<PageChunks> {
        let mut pages = Vec::new();
        for (page_index, page) in content.split(PAGE_BREAK).enumerate() {
            let chunks = self.chunk_content(page);
            if chunks.is_empty() { continue; }
            pages.push(PageChunks { page_label: (page_index + 1).to_string(), chunks });
        }
        pages
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
        }
    }

    fn chunk_content(&self, content: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        for paragraph in content.split("\n\n") {
            let paragraph = paragraph.trim(); if paragraph.is_empty() { continue; }
            if self.count_tokens(paragraph) <= self.chunking_config.max_tokens {
                chunks.push(paragraph.to_string());
            } else {
                chunks.extend(self.split_paragraph_with_overlap(paragraph));
            }
        }
        chunks
    }

    fn count_tokens(&self, text: &str) -> usize { let word_count = text.split_whitespace().count(); (word_count as f32 / 0.75) as usize }

    fn split_paragraph_with_overlap(&self, paragraph: &str) -> Vec<String> {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        let words_per_chunk = ((self.chunking_config.max_tokens as f32 * 0.75) as usize).max(1);
        let overlap_words = ((words_per_chunk as f32 * self.chunking_config.overlap_percent) as usize).min(words_per_chunk - 1);
        let mut chunks = Vec::new(); let mut start = 0;
        while start < words.len() {
            let end = (start + words_per_chunk).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end >= words.len() { break; }
            start = end - overlap_words;
        }
        chunks
    }
}
