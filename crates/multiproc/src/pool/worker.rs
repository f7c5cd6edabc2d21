use crate::{
    error::Error,
    pool::config::SourceClosed,
    processor::Processor,
    shutdown::ShutdownSignal,
    source::MessageSource,
};
use std::sync::Arc;

/// One concurrency slot of a pool.
///
/// Workers share the source, the processor and the shutdown signal with every
/// other worker of the same run. They own nothing else beyond their loop.
pub(crate) struct Worker<S, P> {
    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    pub(crate) worker_id: usize,
    pub(crate) source: Arc<S>,
    pub(crate) processor: Arc<P>,
    pub(crate) shutdown: ShutdownSignal,
    pub(crate) source_closed: SourceClosed,
}

impl<S, P> Worker<S, P>
where
    S: MessageSource,
    P: Processor<S::Message>,
{
    /// Drains messages from the source until something stops this worker.
    ///
    /// Each iteration races the next receive against the shutdown signal. The
    /// race is biased towards shutdown, so once the signal has fired this
    /// worker never starts another message. A message that has already been
    /// received is always processed to completion.
    ///
    /// # Returns
    ///
    /// - `None` when shutdown is observed, or when the source closes under
    ///   [`SourceClosed::Finish`].
    /// - [`Error::SourceClosedUnexpectedly`] when the source closes under
    ///   [`SourceClosed::Fail`].
    /// - [`Error::Processing`] with the first error the processor returns.
    pub(crate) async fn run(self) -> Option<Error<P::Error>> {
        #[cfg(feature = "tracing")]
        tracing::trace!("Worker {} started", self.worker_id);

        let outcome = loop {
            let message = tokio::select! {
                biased;
                () = self.shutdown.observed() => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Worker {} received shutdown signal", self.worker_id);
                    break None;
                }
                message = self.source.recv() => message,
            };

            let Some(message) = message else {
                break match self.source_closed {
                    SourceClosed::Fail => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("Worker {} found the source closed", self.worker_id);
                        Some(Error::SourceClosedUnexpectedly)
                    }
                    SourceClosed::Finish => {
                        #[cfg(feature = "tracing")]
                        tracing::debug!("Worker {} drained the source", self.worker_id);
                        None
                    }
                };
            };

            if let Err(e) = self.processor.process(message).await {
                #[cfg(feature = "tracing")]
                tracing::debug!("Worker {} failed to process a message", self.worker_id);
                break Some(Error::Processing(e));
            }
        };

        #[cfg(feature = "tracing")]
        tracing::trace!("Worker {} stopped", self.worker_id);

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{processor::sync_processor_fn, source::shared_channel};
    use core::time::Duration;
    use std::sync::Mutex;
    use tokio::time::timeout;

    fn worker<S, P>(
        source: &Arc<S>,
        processor: P,
        shutdown: &ShutdownSignal,
        on_closed: SourceClosed,
    ) -> Worker<S, P> {
        Worker {
            worker_id: 0,
            source: Arc::clone(source),
            processor: Arc::new(processor),
            shutdown: shutdown.clone(),
            source_closed: on_closed,
        }
    }

    /// Drains whatever is still queued once every sender is gone.
    async fn remaining<S: MessageSource>(source: &Arc<S>) -> Vec<S::Message> {
        let mut left = Vec::new();
        while let Some(message) = source.recv().await {
            left.push(message);
        }
        left
    }

    #[tokio::test]
    async fn processes_in_receive_order_until_drained() {
        let (tx, rx) = shared_channel(8);
        for i in 0..5 {
            tx.send(i).await.unwrap();
        }
        drop(tx);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let processor = sync_processor_fn(move |n: i32| {
            log.lock().unwrap().push(n);
            Ok::<_, String>(())
        });

        let shutdown = ShutdownSignal::new();
        let outcome = worker(&Arc::new(rx), processor, &shutdown, SourceClosed::Finish)
            .run()
            .await;

        assert!(outcome.is_none());
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn closed_source_is_an_error_by_default() {
        let (tx, rx) = shared_channel::<i32>(1);
        drop(tx);

        let processor = sync_processor_fn(|_: i32| Ok::<_, String>(()));
        let shutdown = ShutdownSignal::new();
        let outcome = worker(&Arc::new(rx), processor, &shutdown, SourceClosed::Fail)
            .run()
            .await;

        assert!(matches!(outcome, Some(Error::SourceClosedUnexpectedly)));
    }

    #[tokio::test]
    async fn stops_at_first_processing_error() {
        let (tx, rx) = shared_channel(8);
        for i in 0..5 {
            tx.send(i).await.unwrap();
        }

        drop(tx);
        let rx = Arc::new(rx);

        let processor = sync_processor_fn(|n: i32| if n == 2 { Err(n) } else { Ok(()) });
        let shutdown = ShutdownSignal::new();
        let outcome = worker(&rx, processor, &shutdown, SourceClosed::Fail).run().await;

        assert!(matches!(outcome, Some(Error::Processing(2))));
        // Messages after the failure stay in the queue.
        assert_eq!(remaining(&rx).await, vec![3, 4]);
    }

    #[tokio::test]
    async fn exits_quietly_on_shutdown_while_idle() {
        let (_tx, rx) = shared_channel::<i32>(1);
        let processor = sync_processor_fn(|_: i32| Ok::<_, String>(()));
        let shutdown = ShutdownSignal::new();

        let idle = worker(&Arc::new(rx), processor, &shutdown, SourceClosed::Fail);
        let handle = tokio::spawn(idle.run());
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.trigger();

        let outcome = timeout(Duration::from_secs(1), handle)
            .await
            .expect("worker did not observe shutdown")
            .unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn does_not_start_messages_after_shutdown() {
        let (tx, rx) = shared_channel(4);
        tx.send(1).await.unwrap();
        drop(tx);
        let rx = Arc::new(rx);

        let processor = sync_processor_fn(|_: i32| Err::<(), _>("should not run"));
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let outcome = worker(&rx, processor, &shutdown, SourceClosed::Fail).run().await;
        assert!(outcome.is_none());
        assert_eq!(remaining(&rx).await, vec![1]);
    }
}
