//! Multi-consumer message sources.
//!
//! A pool drains a single [`MessageSource`] from every worker at once. Each
//! message must be delivered to exactly one worker, and a source that yields
//! `None` is treated as closed and fully drained.

use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// A concurrent queue that any number of workers can receive from.
///
/// # Cancel safety
///
/// Workers race [`recv`](Self::recv) against the pool's shutdown signal and
/// drop the receive future when shutdown wins. Implementations must therefore
/// be cancel-safe: dropping an unfinished `recv` future must not lose a
/// message.
pub trait MessageSource: Send + Sync + 'static {
    /// The message type handed to the processor.
    type Message: Send + 'static;

    /// Receives the next message, or `None` once the source is closed and
    /// drained.
    fn recv(&self) -> impl Future<Output = Option<Self::Message>> + Send;
}

impl<S: MessageSource> MessageSource for Arc<S> {
    type Message = S::Message;

    fn recv(&self) -> impl Future<Output = Option<Self::Message>> + Send {
        (**self).recv()
    }
}

/// A multi-consumer view of a bounded tokio [`mpsc`] channel.
///
/// Receivers queue on an async mutex and only the holder polls the channel,
/// so every message reaches exactly one worker. Both the lock and
/// [`mpsc::Receiver::recv`] are cancel-safe, which makes
/// [`recv`](MessageSource::recv) cancel-safe as well.
#[derive(Debug)]
pub struct SharedReceiver<M> {
    inner: Mutex<mpsc::Receiver<M>>,
}

impl<M> SharedReceiver<M> {
    /// Wraps a channel receiver for shared consumption.
    pub fn new(rx: mpsc::Receiver<M>) -> Self {
        Self {
            inner: Mutex::new(rx),
        }
    }

    /// Closes the underlying channel.
    ///
    /// Buffered messages remain receivable; senders fail from now on.
    pub async fn close(&self) {
        self.inner.lock().await.close();
    }
}

impl<M> From<mpsc::Receiver<M>> for SharedReceiver<M> {
    fn from(rx: mpsc::Receiver<M>) -> Self {
        Self::new(rx)
    }
}

impl<M: Send + 'static> MessageSource for SharedReceiver<M> {
    type Message = M;

    async fn recv(&self) -> Option<M> {
        self.inner.lock().await.recv().await
    }
}

/// Creates a bounded channel whose receiving half is ready to feed a pool.
///
/// The caller owns the [`mpsc::Sender`]; dropping every sender closes the
/// source.
///
/// # Panics
///
/// Panics if `capacity` is 0, like [`mpsc::channel`].
pub fn shared_channel<M>(capacity: usize) -> (mpsc::Sender<M>, SharedReceiver<M>) {
    let (tx, rx) = mpsc::channel(capacity);
    (tx, SharedReceiver::new(rx))
}
