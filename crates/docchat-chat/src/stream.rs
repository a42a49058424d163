//! Incremental rendering of a response as full-text snapshots.

use std::time::Duration;

use futures::Stream;
use tracing::debug;

use docchat_core::error::Result;
use docchat_core::types::{Completion, DeltaReceiver, RetrievedPassage};

use crate::history::SOURCES_SEPARATOR;
use crate::sources::{citation_block, curate_sources};

/// Default gap between consecutive snapshots.
pub const DEFAULT_PACING: Duration = Duration::from_millis(20);

enum State {
    Streaming {
        text: String,
        deltas: DeltaReceiver,
        sources: Vec<RetrievedPassage>,
    },
    Single(String),
    Done,
}

/// Pull-based sequence of snapshots for one chat call.
///
/// Every item is the whole response so far; callers replace what they
/// rendered with it. While streaming, each snapshot extends the previous one.
/// When generation finishes with sources, one last snapshot appends the
/// separator and the citation list. Dropping the stream (or calling
/// [`ResponseStream::close`]) drops the delta channel, which stops the
/// producer.
pub struct ResponseStream {
    state: State,
    pacing: Duration,
    emitted: bool,
}

impl ResponseStream {
    pub fn streaming(completion: Completion, pacing: Duration) -> Self {
        let state = State::Streaming { text: String::new(), deltas: completion.deltas, sources: completion.sources };
        Self { state, pacing, emitted: false }
    }

    /// A response that is complete up front and emitted exactly once.
    pub fn single(text: String) -> Self {
        Self { state: State::Single(text), pacing: Duration::ZERO, emitted: false }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, State::Done)
    }

    /// Stop early and release the generation side.
    pub fn close(&mut self) {
        if !self.is_done() {
            debug!("response stream closed by consumer");
        }
        self.state = State::Done;
    }

    /// Next snapshot, `None` once the response is complete. A generation error
    /// is returned once and ends the stream.
    pub async fn next(&mut self) -> Option<Result<String>> {
        match std::mem::replace(&mut self.state, State::Done) {
            State::Done => None,
            State::Single(text) => {
                self.emitted = true;
                Some(Ok(text))
            }
            State::Streaming { mut text, mut deltas, sources } => {
                if self.emitted && !self.pacing.is_zero() {
                    tokio::time::sleep(self.pacing).await;
                }
                match deltas.recv().await {
                    Some(Ok(delta)) => {
                        text.push_str(delta.fragment());
                        let snapshot = text.clone();
                        self.state = State::Streaming { text, deltas, sources };
                        self.emitted = true;
                        Some(Ok(snapshot))
                    }
                    Some(Err(e)) => Some(Err(e)),
                    None if !sources.is_empty() => {
                        text.push_str(SOURCES_SEPARATOR);
                        text.push_str(&citation_block(&curate_sources(&sources)));
                        self.emitted = true;
                        Some(Ok(text))
                    }
                    // a generation without deltas still renders once
                    None if !self.emitted => {
                        self.emitted = true;
                        Some(Ok(text))
                    }
                    None => None,
                }
            }
        }
    }

    /// Drain the stream and return the final snapshot.
    pub async fn final_text(mut self) -> Result<String> {
        let mut last = String::new();
        while let Some(snapshot) = self.next().await {
            last = snapshot?;
        }
        Ok(last)
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<String>> {
        futures::stream::unfold(self, |mut s| async move { s.next().await.map(|item| (item, s)) })
    }
}
