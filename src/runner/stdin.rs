use crate::error::{Error, Result};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

const STDIN_CAPACITY: usize = 16;

/// Writable stdin of a running command (`StdinOption::Pipe`). Clones share
/// one pipe; `close` on any of them ends the input.
#[derive(Debug, Clone)]
pub struct StdinWriter {
    tx: Arc<Mutex<Option<mpsc::Sender<Vec<u8>>>>>,
}

impl StdinWriter {
    pub(crate) fn channel() -> (Self, mpsc::Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel(STDIN_CAPACITY);
        (
            Self {
                tx: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// Waits while the command isn't reading. Fails once closed or once the
    /// command no longer reads its input.
    pub async fn write(&self, data: impl Into<Vec<u8>>) -> Result<()> {
        let tx = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| Error::Io("stdin is closed".into()))?;
        tx.send(data.into())
            .await
            .map_err(|_| Error::Io("stdin reader is gone".into()))
    }

    pub fn close(&self) {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    pub fn is_closed(&self) -> bool {
        match &*self.tx.lock().unwrap_or_else(PoisonError::into_inner) {
            Some(tx) => tx.is_closed(),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_close_ends_input() {
        let (writer, mut rx) = StdinWriter::channel();
        writer.write("hello").await.unwrap();
        writer.clone().close();

        assert_eq!(rx.recv().await.unwrap(), b"hello");
        assert!(rx.recv().await.is_none());
        assert!(writer.is_closed());
        assert!(writer.write("late").await.is_err());
    }
}
