use crate::stream::{ChunkKind, StreamChunk};
use futures_core::Stream;
use futures_util::StreamExt;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

type Extractor = Arc<dyn Fn(&StreamChunk) -> Option<f64> + Send + Sync>;

/// What [`analyze`](crate::stream::ChunkStreamExt::analyze) should count.
#[derive(Clone, Default)]
pub struct AnalyzeConfig {
    /// Stdout chunks matching this count as errors too. Stderr chunks always do.
    pub error_pattern: Option<Regex>,
    custom: Vec<(String, Extractor)>,
}

impl AnalyzeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error_pattern(mut self, pattern: Regex) -> Self {
        self.error_pattern = Some(pattern);
        self
    }

    /// Adds a named metric. Values returned by `extract` are summed.
    pub fn custom<F>(mut self, name: &str, extract: F) -> Self
    where
        F: Fn(&StreamChunk) -> Option<f64> + Send + Sync + 'static,
    {
        self.custom.push((name.to_string(), Arc::new(extract)));
        self
    }
}

impl fmt::Debug for AnalyzeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzeConfig")
            .field("error_pattern", &self.error_pattern.as_ref().map(Regex::as_str))
            .field("custom", &self.custom.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .finish()
    }
}

/// Running totals, as of the chunk they are attached to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    pub chunks: usize,
    pub bytes: usize,
    pub errors: usize,
    pub error_rate: f64,
    /// Bytes per second since the first chunk.
    pub throughput: f64,
    pub custom: HashMap<String, f64>,
}

#[derive(Debug, Clone)]
pub struct Analyzed {
    pub chunk: StreamChunk,
    pub metrics: Metrics,
}

pub(crate) fn analyze<S>(source: S, config: AnalyzeConfig) -> impl Stream<Item = Analyzed>
where
    S: Stream<Item = StreamChunk>,
{
    let mut metrics = Metrics::default();
    let mut started: Option<Instant> = None;

    source.map(move |chunk| {
        let start = *started.get_or_insert_with(Instant::now);
        metrics.chunks += 1;
        metrics.bytes += chunk.len();

        let is_error = chunk.kind == ChunkKind::Stderr
            || config
                .error_pattern
                .as_ref()
                .is_some_and(|re| re.is_match(&chunk.text()));
        if is_error {
            metrics.errors += 1;
        }
        metrics.error_rate = metrics.errors as f64 / metrics.chunks as f64;

        let elapsed = start.elapsed().as_secs_f64();
        metrics.throughput = if elapsed > 0.0 {
            metrics.bytes as f64 / elapsed
        } else {
            metrics.bytes as f64
        };

        for (name, extract) in &config.custom {
            if let Some(value) = extract(&chunk) {
                *metrics.custom.entry(name.clone()).or_insert(0.0) += value;
            }
        }

        Analyzed {
            chunk,
            metrics: metrics.clone(),
        }
    })
}
