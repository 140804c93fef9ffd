use crate::stream::StreamChunk;
use futures_core::Stream;
use futures_util::StreamExt;
use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::mpsc;

type Router = Pin<Box<dyn Future<Output = ()> + Send>>;

/// One side of [`split`]. Both sides share a router that is spawned the
/// first time either of them is polled.
pub struct SplitStream {
    rx: mpsc::UnboundedReceiver<StreamChunk>,
    router: Arc<Mutex<Option<Router>>>,
}

impl SplitStream {
    fn start_router(&self) {
        let router = self
            .router
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(router) = router {
            tokio::spawn(router);
        }
    }
}

impl Stream for SplitStream {
    type Item = StreamChunk;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StreamChunk>> {
        self.start_router();
        self.rx.poll_recv(cx)
    }
}

impl fmt::Debug for SplitStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitStream").finish_non_exhaustive()
    }
}

pub(crate) fn split<S, F>(source: S, mut predicate: F) -> (SplitStream, SplitStream)
where
    S: Stream<Item = StreamChunk> + Send + 'static,
    F: FnMut(&StreamChunk) -> bool + Send + 'static,
{
    let (matched_tx, matched_rx) = mpsc::unbounded_channel();
    let (unmatched_tx, unmatched_rx) = mpsc::unbounded_channel();

    let router: Router = Box::pin(async move {
        let mut source = Box::pin(source);
        let (mut matched_open, mut unmatched_open) = (true, true);
        while matched_open || unmatched_open {
            let Some(chunk) = source.next().await else {
                break;
            };
            if predicate(&chunk) {
                matched_open = matched_open && matched_tx.send(chunk).is_ok();
            } else {
                unmatched_open = unmatched_open && unmatched_tx.send(chunk).is_ok();
            }
        }
        // Both sides gone: dropping the source here releases (or kills) it.
    });

    let router = Arc::new(Mutex::new(Some(router)));
    (
        SplitStream {
            rx: matched_rx,
            router: router.clone(),
        },
        SplitStream {
            rx: unmatched_rx,
            router,
        },
    )
}
