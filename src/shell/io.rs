use crate::stream::{ChunkKind, StreamChunk};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, mpsc};

/// Where a command's input comes from.
#[derive(Debug, Default)]
pub enum Source {
    /// `/dev/null` for real processes, empty text for virtual ones.
    #[default]
    Empty,
    /// The parent's stdin. Virtual commands see it as empty.
    Inherit,
    Bytes(Vec<u8>),
    /// Upstream pipeline stage or a runner's stdin writer. Ends when every
    /// sender is gone.
    Pipe(mpsc::Receiver<Vec<u8>>),
}

impl Source {
    /// Drains the source completely. Virtual commands get their stdin this way.
    pub async fn read_all(self) -> Vec<u8> {
        match self {
            Source::Empty | Source::Inherit => Vec::new(),
            Source::Bytes(bytes) => bytes,
            Source::Pipe(mut rx) => {
                let mut out = Vec::new();
                while let Some(chunk) = rx.recv().await {
                    out.extend_from_slice(&chunk);
                }
                out
            }
        }
    }

    /// Reads until at least `n` lines arrived, then hangs up on the writer.
    /// An upstream that never ends (`yes`) sees its pipe close and stops.
    pub async fn read_lines(self, n: usize) -> Vec<u8> {
        match self {
            Source::Pipe(mut rx) => {
                let mut out = Vec::new();
                let mut seen = 0;
                while seen < n {
                    let Some(chunk) = rx.recv().await else {
                        break;
                    };
                    seen += chunk.iter().filter(|&&b| b == b'\n').count();
                    out.extend_from_slice(&chunk);
                }
                out
            }
            other => other.read_all().await,
        }
    }
}

/// Where a command's output goes. Cheap to clone; sequences hand the same
/// sink to every command in turn.
#[derive(Debug, Clone)]
pub enum Sink {
    Runner {
        tx: mpsc::Sender<StreamChunk>,
        kind: ChunkKind,
    },
    Pipe(mpsc::Sender<Vec<u8>>),
    File(Arc<Mutex<File>>),
    Null,
}

impl Sink {
    pub fn file(file: File) -> Self {
        Sink::File(Arc::new(Mutex::new(file)))
    }

    /// Delivers one chunk. `false` means the reader is gone and the writer
    /// should stop producing.
    pub async fn write(&self, data: Vec<u8>) -> bool {
        if data.is_empty() {
            return true;
        }
        match self {
            Sink::Runner { tx, kind } => tx.send(StreamChunk::new(*kind, data)).await.is_ok(),
            Sink::Pipe(tx) => tx.send(data).await.is_ok(),
            Sink::File(file) => {
                let mut file = file.lock().await;
                file.write_all(&data).await.is_ok() && file.flush().await.is_ok()
            }
            Sink::Null => true,
        }
    }

    pub async fn write_str(&self, text: &str) -> bool {
        self.write(text.as_bytes().to_vec()).await
    }

    pub fn is_closed(&self) -> bool {
        match self {
            Sink::Runner { tx, .. } => tx.is_closed(),
            Sink::Pipe(tx) => tx.is_closed(),
            Sink::File(_) | Sink::Null => false,
        }
    }
}

/// The three standard streams of one command.
#[derive(Debug)]
pub struct Io {
    pub stdin: Source,
    pub stdout: Sink,
    pub stderr: Sink,
}

impl Io {
    pub fn null() -> Self {
        Self {
            stdin: Source::Empty,
            stdout: Sink::Null,
            stderr: Sink::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pipe_source_reads_until_senders_drop() {
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            tx.send(b"ab".to_vec()).await.unwrap();
            tx.send(b"cd".to_vec()).await.unwrap();
        });
        assert_eq!(Source::Pipe(rx).read_all().await, b"abcd");
    }

    #[tokio::test]
    async fn test_read_lines_hangs_up_early() {
        let (tx, rx) = mpsc::channel(1);
        let writer = tokio::spawn(async move {
            let mut sent = 0;
            while tx.send(b"y\n".to_vec()).await.is_ok() {
                sent += 1;
            }
            sent
        });
        assert_eq!(Source::Pipe(rx).read_lines(3).await, b"y\ny\ny\n");
        assert!(writer.await.unwrap() >= 3);

        assert_eq!(Source::Bytes(b"a\nb\n".to_vec()).read_lines(1).await, b"a\nb\n");
        let (_tx, rx) = mpsc::channel::<Vec<u8>>(1);
        assert!(Source::Pipe(rx).read_lines(0).await.is_empty());
    }

    #[tokio::test]
    async fn test_sink_reports_closed_reader() {
        let (tx, rx) = mpsc::channel(1);
        let sink = Sink::Pipe(tx);
        drop(rx);
        assert!(!sink.write(b"x".to_vec()).await);
        assert!(sink.is_closed());
    }

    #[tokio::test]
    async fn test_runner_sink_tags_chunks() {
        let (tx, mut rx) = mpsc::channel(1);
        let sink = Sink::Runner {
            tx,
            kind: ChunkKind::Stderr,
        };
        assert!(sink.write_str("oops").await);
        let chunk = rx.recv().await.unwrap();
        assert_eq!(chunk.kind, ChunkKind::Stderr);
        assert_eq!(chunk.text(), "oops");
    }
}
