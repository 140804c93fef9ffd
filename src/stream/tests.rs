use super::*;
use regex::Regex;
use std::time::Duration;

fn numbered(n: usize) -> ChunkStream {
    ChunkStream::from_chunks((0..n).map(|i| StreamChunk::stdout(i.to_string())).collect())
}

fn texts(chunks: &[StreamChunk]) -> Vec<String> {
    chunks.iter().map(StreamChunk::text).collect()
}

#[tokio::test]
async fn test_batch_by_size() {
    let batches: Vec<Batch> = numbered(10).batch(3, None).collect().await;
    let sizes: Vec<usize> = batches.iter().map(|b| b.size).collect();
    assert_eq!(sizes, vec![3, 3, 3, 1]);
    assert_eq!(batches[1].text(), "345");
    assert_eq!(batches[3].text(), "9");
}

#[tokio::test]
async fn test_batch_flushes_on_timeout() {
    // two quick chunks, a pause longer than the timeout, then one more
    let source = stream::unfold(0u32, |i| async move {
        match i {
            0 | 1 => Some((StreamChunk::stdout("x"), i + 1)),
            2 => {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Some((StreamChunk::stdout("y"), i + 1))
            }
            _ => None,
        }
    });

    let batches: Vec<Batch> = source
        .batch(10, Some(Duration::from_millis(50)))
        .collect()
        .await;
    let sizes: Vec<usize> = batches.iter().map(|b| b.size).collect();
    assert_eq!(sizes, vec![2, 1]);
}

#[tokio::test]
async fn test_batch_size_zero_behaves_like_one() {
    let batches: Vec<Batch> = numbered(2).batch(0, None).collect().await;
    assert_eq!(batches.len(), 2);
}

#[tokio::test]
async fn test_sliding_window() {
    let windows: Vec<Vec<StreamChunk>> = numbered(5).sliding_window(3).collect().await;
    let windows: Vec<Vec<String>> = windows.iter().map(|w| texts(w)).collect();
    assert_eq!(
        windows,
        vec![
            vec!["0", "1", "2"],
            vec!["1", "2", "3"],
            vec!["2", "3", "4"]
        ]
    );

    let short: Vec<Vec<StreamChunk>> = numbered(2).sliding_window(3).collect().await;
    assert_eq!(short.len(), 1);
    assert_eq!(texts(&short[0]), vec!["0", "1"]);
}

#[tokio::test]
async fn test_map_filter_reduce_compose() {
    let total = numbered(6)
        .filter_text(|t| t.parse::<u32>().unwrap() % 2 == 0)
        .map_text(|t| format!("<{}>", t))
        .reduce_text(String::new(), |acc, t| acc + t)
        .await;
    assert_eq!(total, "<0><2><4>");
}

#[tokio::test]
async fn test_map_text_keeps_kind() {
    let mapped: Vec<StreamChunk> = ChunkStream::from_chunks(vec![StreamChunk::stderr("warn")])
        .map_text(|t| t.to_uppercase())
        .collect()
        .await;
    assert_eq!(mapped[0].kind, ChunkKind::Stderr);
    assert_eq!(mapped[0].text(), "WARN");
}

#[tokio::test]
async fn test_split_by_predicate() {
    let source = ChunkStream::from_chunks(vec![
        StreamChunk::stdout("a"),
        StreamChunk::stderr("b"),
        StreamChunk::stdout("c"),
    ]);
    let (out, err) = source.split(|c| c.is_stdout());

    let (out, err): (Vec<StreamChunk>, Vec<StreamChunk>) = tokio::join!(out.collect(), err.collect());
    assert_eq!(texts(&out), vec!["a", "c"]);
    assert_eq!(texts(&err), vec!["b"]);
}

#[tokio::test]
async fn test_split_one_side_dropped() {
    let (out, err) = numbered(4).split(|c| c.text() != "2");
    drop(err);
    let out: Vec<StreamChunk> = out.collect().await;
    assert_eq!(texts(&out), vec!["0", "1", "3"]);
}

#[tokio::test]
async fn test_analyze_counts_errors_and_custom_metrics() {
    let source = ChunkStream::from_chunks(vec![
        StreamChunk::stdout("ok 1\n"),
        StreamChunk::stdout("ERROR disk\n"),
        StreamChunk::stderr("warning\n"),
        StreamChunk::stdout("ok 2\n"),
    ]);
    let config = AnalyzeConfig::new()
        .error_pattern(Regex::new("ERROR").unwrap())
        .custom("oks", |c| c.text().starts_with("ok").then_some(1.0));

    let analyzed: Vec<Analyzed> = source.analyze(config).collect().await;
    let last = &analyzed.last().unwrap().metrics;
    assert_eq!(last.chunks, 4);
    assert_eq!(last.errors, 2);
    assert!((last.error_rate - 0.5).abs() < f64::EPSILON);
    assert_eq!(last.bytes, 5 + 11 + 8 + 5);
    assert_eq!(last.custom.get("oks"), Some(&2.0));
    assert!(last.throughput > 0.0);

    assert_eq!(analyzed[0].metrics.errors, 0);
    assert_eq!(analyzed[1].metrics.errors, 1);
}

#[tokio::test]
async fn test_lines_across_chunk_boundaries() {
    let source = ChunkStream::from_chunks(vec![
        StreamChunk::stdout("a\nb"),
        StreamChunk::stderr("noise\n"),
        StreamChunk::stdout("c\r\n"),
        StreamChunk::stdout("d"),
    ]);
    let lines: Vec<String> = source.lines().collect().await;
    assert_eq!(lines, vec!["a", "bc", "d"]);
}

#[tokio::test]
async fn test_collect_text_is_stdout_only() {
    let source = ChunkStream::from_chunks(vec![
        StreamChunk::stdout("out "),
        StreamChunk::stderr("err "),
        StreamChunk::stdout("more"),
    ]);
    assert_eq!(source.collect_text().await, "out more");
}
