//! Turns raw `(user, assistant)` history into bounded generation input.

use docchat_core::types::{Message, Turn};

/// Appended between an answer and its citation list.
pub const SOURCES_SEPARATOR: &str = "\n\n Sources: \n";

/// The part of [`SOURCES_SEPARATOR`] that survives renderers collapsing the
/// leading blank lines. History stripping keys on this.
pub const SOURCES_MARKER: &str = " Sources: \n";

/// Most recent turn-derived messages kept; the system prompt and the new
/// message are added on top.
pub const MAX_HISTORY_MESSAGES: usize = 20;

/// Drop a trailing citation block from a rendered answer.
///
/// Matching uses [`SOURCES_MARKER`] rather than the full separator so answers
/// whose blank lines were collapsed still lose their citations. An answer
/// that itself contains `" Sources: \n"` (e.g. "Primary Sources: \n") is cut
/// there too.
pub fn strip_sources(answer: &str) -> &str {
    match answer.find(SOURCES_MARKER) {
        Some(pos) => answer[..pos].trim_end(),
        None => answer,
    }
}

/// User/assistant messages for `history`, oldest dropped beyond the cap.
pub fn compact_history(history: &[Turn]) -> Vec<Message> {
    let mut messages: Vec<Message> = history
        .iter()
        .flat_map(|turn| [Message::user(turn.user.as_str()), Message::assistant(strip_sources(&turn.assistant))])
        .collect();
    if messages.len() > MAX_HISTORY_MESSAGES {
        messages.drain(..messages.len() - MAX_HISTORY_MESSAGES);
    }
    messages
}

/// Full generation input: optional system prompt, compacted history, new message.
pub fn build_messages(history: &[Turn], system_prompt: &str, message: &str) -> Vec<Message> {
    let compacted = compact_history(history);
    let mut all = Vec::with_capacity(compacted.len() + 2);
    if !system_prompt.is_empty() {
        all.push(Message::system(system_prompt));
    }
    all.extend(compacted);
    all.push(Message::user(message));
    all
}

/// Re-pair compacted messages into turns, the shape a UI stores them in.
pub fn turns_from_messages(messages: &[Message]) -> Vec<Turn> {
    messages
        .chunks_exact(2)
        .map(|pair| Turn::new(pair[0].content.as_str(), pair[1].content.as_str()))
        .collect()
}
