//! The per-message processing capability handed to a pool.

use core::future::ready;

/// Applies domain logic to a single message.
///
/// A pool shares one processor between all of its workers and invokes it
/// concurrently without any locking, hence the `Send + Sync` bound. The
/// processor is awaited in-line by the worker that received the message; a
/// shutdown never interrupts a call that is already running.
pub trait Processor<M>: Send + Sync + 'static {
    /// Error returned for a rejected message. Surfaced to the caller verbatim
    /// when it is the first failure of the run.
    type Error: Send + 'static;

    /// Processes one message.
    fn process(&self, message: M) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// A [`Processor`] backed by an async closure. See [`processor_fn`].
#[derive(Clone, Copy, Debug)]
pub struct ProcessorFn<F> {
    f: F,
}

/// Builds a [`Processor`] from a closure returning a future.
///
/// ```ignore
/// let processor = processor_fn(|n: u64| async move {
///     if n == 7 { Err("unlucky") } else { Ok(()) }
/// });
/// ```
pub const fn processor_fn<F>(f: F) -> ProcessorFn<F> {
    ProcessorFn { f }
}

impl<M, F, Fut, E> Processor<M> for ProcessorFn<F>
where
    F: Fn(M) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send,
    E: Send + 'static,
{
    type Error = E;

    fn process(&self, message: M) -> impl Future<Output = Result<(), E>> + Send {
        (self.f)(message)
    }
}

/// A [`Processor`] backed by a synchronous closure. See [`sync_processor_fn`].
#[derive(Clone, Copy, Debug)]
pub struct SyncProcessorFn<F> {
    f: F,
}

/// Builds a [`Processor`] from a plain synchronous closure.
///
/// The closure runs directly on the worker task, so long CPU-bound work
/// occupies a runtime thread for its duration.
pub const fn sync_processor_fn<F>(f: F) -> SyncProcessorFn<F> {
    SyncProcessorFn { f }
}

impl<M, F, E> Processor<M> for SyncProcessorFn<F>
where
    F: Fn(M) -> Result<(), E> + Send + Sync + 'static,
    E: Send + 'static,
{
    type Error = E;

    fn process(&self, message: M) -> impl Future<Output = Result<(), E>> + Send {
        ready((self.f)(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portable_atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn async_closure_processor() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let processor = processor_fn(move |n: usize| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(n, Ordering::Relaxed);
                if n == 7 { Err("unlucky") } else { Ok(()) }
            }
        });

        assert_eq!(processor.process(3).await, Ok(()));
        assert_eq!(processor.process(7).await, Err("unlucky"));
        assert_eq!(seen.load(Ordering::Relaxed), 10);
    }

    #[tokio::test]
    async fn sync_closure_processor() {
        let processor = sync_processor_fn(|s: &'static str| {
            if s.is_empty() {
                Err("empty message".to_string())
            } else {
                Ok(())
            }
        });

        assert_eq!(processor.process("hello").await, Ok(()));
        assert_eq!(
            processor.process("").await,
            Err("empty message".to_string())
        );
    }
}
