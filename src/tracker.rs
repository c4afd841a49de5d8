use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::{FuturesUnordered, Stream};
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

type Closing = BoxFuture<'static, (PathBuf, io::Result<()>)>;

/// Keeps the file sinks whose close has not been confirmed yet.
///
/// The number of tracked closes is the pending count that holds back the
/// `End` event.
#[derive(Default)]
pub(crate) struct CompletionTracker {
    closing: FuturesUnordered<Closing>,
}

impl CompletionTracker {
    pub(crate) fn new() -> Self {
        CompletionTracker::default()
    }

    pub(crate) fn track(&mut self, path: PathBuf, close: BoxFuture<'static, io::Result<()>>) {
        self.closing.push(close.map(move |res| (path, res)).boxed());
    }

    pub(crate) fn pending(&self) -> usize {
        self.closing.len()
    }

    /// Polls for the next finished close. `Ready(None)` means nothing is pending.
    pub(crate) fn poll_closed(&mut self, cx: &mut Context<'_>) -> Poll<Option<(PathBuf, io::Result<()>)>> {
        if self.closing.is_empty() {
            return Poll::Ready(None);
        }

        Pin::new(&mut self.closing).poll_next(cx)
    }

    /// Forgets every outstanding close; the underlying files are left as they are.
    pub(crate) fn clear(&mut self) {
        self.closing = FuturesUnordered::new();
    }
}
