use crate::error::Error;
use crate::runner::CommandResult;
use crate::stream::{ChunkKind, StreamChunk};
use std::fmt;
use std::sync::Arc;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type BytesCallback = Arc<dyn Fn(&[u8]) + Send + Sync>;
type CodeCallback = Arc<dyn Fn(i32) + Send + Sync>;

/// One typed slot list per event. Cleared when the runner finishes.
#[derive(Clone, Default)]
pub struct Listeners {
    data: Vec<Callback<StreamChunk>>,
    stdout: Vec<BytesCallback>,
    stderr: Vec<BytesCallback>,
    end: Vec<Callback<CommandResult>>,
    exit: Vec<CodeCallback>,
    error: Vec<Callback<Error>>,
    close: Vec<CodeCallback>,
}

impl Listeners {
    pub fn on_data(&mut self, f: impl Fn(&StreamChunk) + Send + Sync + 'static) {
        self.data.push(Arc::new(f));
    }

    pub fn on_stdout(&mut self, f: impl Fn(&[u8]) + Send + Sync + 'static) {
        self.stdout.push(Arc::new(f));
    }

    pub fn on_stderr(&mut self, f: impl Fn(&[u8]) + Send + Sync + 'static) {
        self.stderr.push(Arc::new(f));
    }

    pub fn on_end(&mut self, f: impl Fn(&CommandResult) + Send + Sync + 'static) {
        self.end.push(Arc::new(f));
    }

    pub fn on_exit(&mut self, f: impl Fn(i32) + Send + Sync + 'static) {
        self.exit.push(Arc::new(f));
    }

    pub fn on_error(&mut self, f: impl Fn(&Error) + Send + Sync + 'static) {
        self.error.push(Arc::new(f));
    }

    pub fn on_close(&mut self, f: impl Fn(i32) + Send + Sync + 'static) {
        self.close.push(Arc::new(f));
    }

    pub fn len(&self) -> usize {
        self.data.len()
            + self.stdout.len()
            + self.stderr.len()
            + self.end.len()
            + self.exit.len()
            + self.error.len()
            + self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn has_chunk_listeners(&self) -> bool {
        !(self.data.is_empty() && self.stdout.is_empty() && self.stderr.is_empty())
    }

    /// `data` first, then the per-stream event.
    pub(crate) fn emit_chunk(&self, chunk: &StreamChunk) {
        for f in &self.data {
            f(chunk);
        }
        let per_kind = match chunk.kind {
            ChunkKind::Stdout => &self.stdout,
            ChunkKind::Stderr => &self.stderr,
        };
        for f in per_kind {
            f(&chunk.data);
        }
    }

    pub(crate) fn emit_error(&self, error: &Error) {
        for f in &self.error {
            f(error);
        }
    }

    /// `end`, `exit`, then `close`.
    pub(crate) fn emit_finish(&self, result: &CommandResult) {
        for f in &self.end {
            f(result);
        }
        for f in &self.exit {
            f(result.code);
        }
        for f in &self.close {
            f(result.code);
        }
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("data", &self.data.len())
            .field("stdout", &self.stdout.len())
            .field("stderr", &self.stderr.len())
            .field("end", &self.end.len())
            .field("exit", &self.exit.len())
            .field("error", &self.error.len())
            .field("close", &self.close.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_chunk_routing_by_kind() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut listeners = Listeners::default();
        {
            let seen = seen.clone();
            listeners.on_data(move |c| seen.lock().unwrap().push(format!("data:{}", c.text())));
        }
        {
            let seen = seen.clone();
            listeners.on_stdout(move |d| {
                seen.lock().unwrap().push(format!("out:{}", String::from_utf8_lossy(d)))
            });
        }
        {
            let seen = seen.clone();
            listeners.on_stderr(move |d| {
                seen.lock().unwrap().push(format!("err:{}", String::from_utf8_lossy(d)))
            });
        }

        listeners.emit_chunk(&StreamChunk::stdout("a"));
        listeners.emit_chunk(&StreamChunk::stderr("b"));

        assert_eq!(*seen.lock().unwrap(), vec!["data:a", "out:a", "data:b", "err:b"]);
        assert_eq!(listeners.len(), 3);
    }

    #[test]
    fn test_finish_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut listeners = Listeners::default();
        let s = seen.clone();
        listeners.on_close(move |code| s.lock().unwrap().push(format!("close:{}", code)));
        let s = seen.clone();
        listeners.on_exit(move |code| s.lock().unwrap().push(format!("exit:{}", code)));
        let s = seen.clone();
        listeners.on_end(move |r| s.lock().unwrap().push(format!("end:{}", r.code)));

        listeners.emit_finish(&CommandResult::from_code(3));
        assert_eq!(*seen.lock().unwrap(), vec!["end:3", "exit:3", "close:3"]);
    }
}
