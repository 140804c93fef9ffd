//! Chunk streams over a runner's output and the transforms that compose on
//! top of them.
//!
//! Every operator takes a stream and returns a new one; nothing runs until the
//! result is polled. Chunks from one runner arrive in production order.

pub mod analyze;
pub mod batch;
pub mod split;

#[cfg(test)]
mod tests;

pub use analyze::{AnalyzeConfig, Analyzed, Metrics};
pub use batch::Batch;
pub use split::SplitStream;

use crate::runner::{ProcessRunner, Signal};
use chrono::{DateTime, Utc};
use futures_core::Stream;
use futures_util::StreamExt;
use futures_util::future::ready;
use futures_util::stream::{self, select_all};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkKind {
    Stdout,
    Stderr,
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkKind::Stdout => f.write_str("stdout"),
            ChunkKind::Stderr => f.write_str("stderr"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamChunk {
    pub kind: ChunkKind,
    pub data: Vec<u8>,
    pub timestamp: DateTime<Utc>,
}

impl StreamChunk {
    pub fn new(kind: ChunkKind, data: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            data: data.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn stdout(data: impl Into<Vec<u8>>) -> Self {
        Self::new(ChunkKind::Stdout, data)
    }

    pub fn stderr(data: impl Into<Vec<u8>>) -> Self {
        Self::new(ChunkKind::Stderr, data)
    }

    /// Lossy UTF-8 view of the data.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    pub fn is_stdout(&self) -> bool {
        self.kind == ChunkKind::Stdout
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Live output of one runner. Dropping it before the end kills the runner.
pub struct ChunkStream {
    replay: VecDeque<StreamChunk>,
    rx: mpsc::Receiver<StreamChunk>,
    runner: Option<ProcessRunner>,
    ended: bool,
}

impl ChunkStream {
    pub(crate) fn new(
        replay: Vec<StreamChunk>,
        rx: mpsc::Receiver<StreamChunk>,
        runner: ProcessRunner,
    ) -> Self {
        Self {
            replay: replay.into(),
            rx,
            runner: Some(runner),
            ended: false,
        }
    }

    /// A stream over fixed chunks, not tied to any runner.
    pub fn from_chunks(chunks: Vec<StreamChunk>) -> Self {
        // The sender is dropped right away, so the stream ends after `chunks`.
        let (_, rx) = mpsc::channel(1);
        Self {
            replay: chunks.into(),
            rx,
            runner: None,
            ended: false,
        }
    }
}

impl Stream for ChunkStream {
    type Item = StreamChunk;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StreamChunk>> {
        if self.ended {
            return Poll::Ready(None);
        }
        if let Some(chunk) = self.replay.pop_front() {
            return Poll::Ready(Some(chunk));
        }
        match self.rx.poll_recv(cx) {
            Poll::Ready(None) => {
                self.ended = true;
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

impl Drop for ChunkStream {
    fn drop(&mut self) {
        if self.ended {
            return;
        }
        if let Some(runner) = self.runner.take() {
            if !runner.is_finished() {
                log::debug!("stream dropped early, killing runner {}", runner.id());
                runner.kill(Signal::Term);
            }
        }
    }
}

impl fmt::Debug for ChunkStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkStream")
            .field("runner", &self.runner.as_ref().map(ProcessRunner::id))
            .field("ended", &self.ended)
            .finish()
    }
}

/// A chunk tagged with the index of the runner it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedChunk {
    pub source: usize,
    pub chunk: StreamChunk,
}

/// Interleaves the output of several runners by arrival time.
pub fn merge(runners: &[ProcessRunner]) -> impl Stream<Item = TaggedChunk> + Send + Unpin + use<> {
    select_all(runners.iter().enumerate().map(|(source, runner)| {
        runner
            .stream()
            .map(move |chunk| TaggedChunk { source, chunk })
    }))
}

/// Transform stages over any stream of chunks.
pub trait ChunkStreamExt: Stream<Item = StreamChunk> + Sized {
    /// Rewrites each chunk's text; kind and timestamp are kept.
    fn map_text<F>(self, mut f: F) -> impl Stream<Item = StreamChunk>
    where
        F: FnMut(&str) -> String,
    {
        self.map(move |chunk| StreamChunk {
            data: f(&chunk.text()).into_bytes(),
            ..chunk
        })
    }

    fn filter_text<F>(self, mut predicate: F) -> impl Stream<Item = StreamChunk>
    where
        F: FnMut(&str) -> bool,
    {
        self.filter(move |chunk| ready(predicate(&chunk.text())))
    }

    /// Folds the decoded text of every chunk into one value.
    fn reduce_text<T, F>(self, seed: T, mut f: F) -> impl Future<Output = T>
    where
        F: FnMut(T, &str) -> T,
    {
        self.fold(seed, move |acc, chunk| ready(f(acc, &chunk.text())))
    }

    /// Groups chunks until `size` is reached or, if given, `timeout` has
    /// passed since the first chunk of the batch.
    fn batch(self, size: usize, timeout: Option<Duration>) -> impl Stream<Item = Batch> {
        batch::batch(self, size, timeout)
    }

    /// Overlapping windows of the last `n` chunks.
    fn sliding_window(self, n: usize) -> impl Stream<Item = Vec<StreamChunk>> {
        batch::sliding_window(self, n)
    }

    /// Routes chunks to `(matched, unmatched)`. Routing starts when either
    /// side is first polled.
    fn split<F>(self, predicate: F) -> (SplitStream, SplitStream)
    where
        Self: Send + 'static,
        F: FnMut(&StreamChunk) -> bool + Send + 'static,
    {
        split::split(self, predicate)
    }

    fn analyze(self, config: AnalyzeConfig) -> impl Stream<Item = Analyzed> {
        analyze::analyze(self, config)
    }

    /// Concatenated stdout text.
    fn collect_text(self) -> impl Future<Output = String> {
        self.fold(String::new(), |mut acc, chunk| {
            if chunk.is_stdout() {
                acc.push_str(&chunk.text());
            }
            ready(acc)
        })
    }

    /// Stdout split into lines, without the trailing newline.
    fn lines(self) -> impl Stream<Item = String> {
        let chunks = Box::pin(self.filter(|c| ready(c.is_stdout())));
        stream::unfold(
            (chunks, String::new(), false),
            |(mut chunks, mut pending, mut done)| async move {
                loop {
                    if let Some(pos) = pending.find('\n') {
                        let line = pending[..pos].trim_end_matches('\r').to_string();
                        pending.drain(..=pos);
                        return Some((line, (chunks, pending, done)));
                    }
                    if done {
                        if pending.is_empty() {
                            return None;
                        }
                        let line = std::mem::take(&mut pending);
                        return Some((line, (chunks, pending, done)));
                    }
                    match chunks.next().await {
                        Some(chunk) => pending.push_str(&chunk.text()),
                        None => done = true,
                    }
                }
            },
        )
    }
}

impl<S> ChunkStreamExt for S where S: Stream<Item = StreamChunk> + Sized {}
