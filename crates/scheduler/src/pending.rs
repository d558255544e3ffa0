use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use thiserror::Error;
use tokio::sync::oneshot;

/// The producing side was dropped without a value (its task was cancelled
/// or never accepted by any backend).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("pending value abandoned before completion")]
pub struct Abandoned;

/// Create a linked completer/pending pair.
pub fn channel<T>() -> (Completer<T>, Pending<T>) {
    let (tx, rx) = oneshot::channel();
    (Completer { tx }, Pending { rx })
}

/// Resolves a [`Pending`] from whichever context ran the work.
#[derive(Debug)]
pub struct Completer<T> {
    tx: oneshot::Sender<T>,
}

impl<T> Completer<T> {
    /// Deliver the value. Returns it back if nobody is waiting any more.
    pub fn complete(self, value: T) -> Result<(), T> {
        self.tx.send(value)
    }

    /// Whether the receiving side has been dropped.
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

/// A value produced later on another context.
///
/// Await it from async code, [`wait`](Self::wait) for it from a plain
/// thread, or poll it with [`try_take`](Self::try_take). Blocking on it from
/// the context that must produce it deadlocks, as with any future.
#[derive(Debug)]
pub struct Pending<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Pending<T> {
    /// An already-resolved value.
    pub fn ready(value: T) -> Self {
        let (completer, pending) = channel();
        // The receiver is alive, so this cannot fail.
        let _ = completer.complete(value);
        pending
    }

    /// Block the current thread until the value arrives.
    ///
    /// Panics if called from within an async runtime; use `.await` there.
    pub fn wait(self) -> Result<T, Abandoned> {
        self.rx.blocking_recv().map_err(|_| Abandoned)
    }

    /// `Ok(Some(v))` once resolved, `Ok(None)` while still pending.
    pub fn try_take(&mut self) -> Result<Option<T>, Abandoned> {
        match self.rx.try_recv() {
            Ok(value) => Ok(Some(value)),
            Err(oneshot::error::TryRecvError::Empty) => Ok(None),
            Err(oneshot::error::TryRecvError::Closed) => Err(Abandoned),
        }
    }
}

impl<T> Future for Pending<T> {
    type Output = Result<T, Abandoned>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|res| res.map_err(|_| Abandoned))
    }
}
