use crate::stream::StreamChunk;
use chrono::{DateTime, Utc};
use futures_core::Stream;
use futures_util::StreamExt;
use futures_util::stream;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub data: Vec<StreamChunk>,
    pub size: usize,
    /// When the batch was emitted.
    pub timestamp: DateTime<Utc>,
}

impl Batch {
    fn new(data: Vec<StreamChunk>) -> Self {
        Self {
            size: data.len(),
            data,
            timestamp: Utc::now(),
        }
    }

    pub fn text(&self) -> String {
        self.data.iter().map(StreamChunk::text).collect()
    }
}

pub(crate) fn batch<S>(source: S, size: usize, timeout: Option<Duration>) -> impl Stream<Item = Batch>
where
    S: Stream<Item = StreamChunk>,
{
    let size = size.max(1);
    stream::unfold(
        (Box::pin(source), false),
        move |(mut source, mut done)| async move {
            if done {
                return None;
            }
            let mut data = Vec::with_capacity(size);
            let mut deadline: Option<Instant> = None;

            while data.len() < size {
                let next = match deadline {
                    Some(at) => match tokio::time::timeout_at(at, source.next()).await {
                        Ok(next) => next,
                        // timer fired with a partial batch
                        Err(_) => break,
                    },
                    None => source.next().await,
                };
                match next {
                    Some(chunk) => {
                        if data.is_empty() {
                            deadline = timeout.map(|t| Instant::now() + t);
                        }
                        data.push(chunk);
                    }
                    None => {
                        done = true;
                        break;
                    }
                }
            }

            if data.is_empty() {
                None
            } else {
                Some((Batch::new(data), (source, done)))
            }
        },
    )
}

pub(crate) fn sliding_window<S>(source: S, n: usize) -> impl Stream<Item = Vec<StreamChunk>>
where
    S: Stream<Item = StreamChunk>,
{
    let n = n.max(1);
    stream::unfold(
        (Box::pin(source), VecDeque::with_capacity(n), false),
        move |(mut source, mut window, mut emitted)| async move {
            loop {
                match source.next().await {
                    Some(chunk) => {
                        window.push_back(chunk);
                        if window.len() > n {
                            window.pop_front();
                        }
                        if window.len() == n {
                            emitted = true;
                            let out: Vec<StreamChunk> = window.iter().cloned().collect();
                            return Some((out, (source, window, emitted)));
                        }
                    }
                    None => {
                        // Shorter than one window: hand out what there is, once.
                        if !emitted && !window.is_empty() {
                            emitted = true;
                            let out: Vec<StreamChunk> = window.drain(..).collect();
                            return Some((out, (source, window, emitted)));
                        }
                        return None;
                    }
                }
            }
        },
    )
}
