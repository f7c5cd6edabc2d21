//! Pool coordinator: worker fan-out, first-error-wins outcome and fully
//! drained shutdown.
//!
//! A run moves through three states:
//!
//! - `Running`: all workers are draining the source.
//! - `ShuttingDown`: a worker reported an error or the caller cancelled. The
//!   shared [`ShutdownSignal`] has fired and workers finish whatever they were
//!   processing, then exit.
//! - `Done`: the [`CompletionTracker`] certified that every worker exited.
//!
//! The only way out of a run is through `Done`, so a returned run never leaves
//! a worker behind.

use crate::{
    error::{Error, Result},
    pool::{config::PoolConfig, worker::Worker},
    processor::Processor,
    shutdown::ShutdownSignal,
    source::MessageSource,
    tracker::CompletionTracker,
};
use core::any::Any;
use futures::FutureExt;
use std::{panic::AssertUnwindSafe, sync::Arc};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum State {
    Running,
    ShuttingDown,
    Done,
}

impl State {
    /// Moves forward to `next`. States never move backwards.
    fn advance(&mut self, next: Self) {
        debug_assert!(next >= *self, "invalid transition {self:?} -> {next:?}");
        if next > *self {
            #[cfg(feature = "tracing")]
            tracing::debug!("Pool transition {:?} -> {:?}", self, next);
            *self = next;
        }
    }
}

/// The error slot of a run.
///
/// Only the first recorded error is kept. Once the slot is closed by an
/// external cancel, nothing more is recorded and the run succeeds.
struct Outcome<E> {
    first: Option<Error<E>>,
    closed: bool,
}

impl<E> Outcome<E> {
    const fn new() -> Self {
        Self {
            first: None,
            closed: false,
        }
    }

    fn record(&mut self, err: Error<E>) {
        if self.first.is_none() && !self.closed {
            self.first = Some(err);
        } else {
            #[cfg(feature = "tracing")]
            tracing::trace!("Discarding late worker error");
        }
    }

    /// Seals the outcome as it stands. An error already recorded is kept.
    fn close(&mut self) {
        self.closed = true;
    }

    fn into_result(self) -> Result<(), E> {
        self.first.map_or(Ok(()), Err)
    }
}

/// Runs a fixed pool of workers over one shared [`MessageSource`].
///
/// The coordinator owns the run: it spawns `concurrency` workers wired to the
/// same source, processor and [`ShutdownSignal`], then races three events
/// until the pool has fully drained:
///
/// 1. A worker reports an error. The signal is triggered and the error is
///    kept if it is the first one.
/// 2. The caller's [`CancellationToken`] fires. The signal is triggered; the
///    run succeeds unless an error was already recorded. Errors from
///    messages that were still in flight are discarded.
/// 3. Every worker has exited. The recorded outcome is returned.
///
/// Workers report through a channel buffered to `concurrency`. Each worker
/// reports at most once, so a report never waits on the coordinator, even
/// after the outcome has been decided.
pub struct Coordinator<S, P> {
    source: Arc<S>,
    processor: Arc<P>,
    config: PoolConfig,
}

impl<S, P> Coordinator<S, P>
where
    S: MessageSource,
    P: Processor<S::Message>,
{
    /// Creates a coordinator for one run over `source`.
    pub fn new(source: S, processor: P, config: PoolConfig) -> Self {
        Self {
            source: Arc::new(source),
            processor: Arc::new(processor),
            config,
        }
    }

    /// Runs the pool on the current tokio runtime in a background task.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<Result<(), P::Error>> {
        tokio::spawn(self.run(cancel))
    }

    /// Runs the pool to completion.
    ///
    /// Resolves only after every worker has exited. Dropping the returned
    /// future before then triggers shutdown so the workers still stop.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by any worker:
    /// - [`Error::Processing`] when the processor rejects a message.
    /// - [`Error::SourceClosedUnexpectedly`] when the source closes under
    ///   [`SourceClosed::Fail`](crate::SourceClosed::Fail).
    /// - [`Error::WorkerPanicked`] when the processor panics.
    ///
    /// Cancellation through `cancel` is not an error.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), P::Error> {
        let concurrency = self.config.concurrency();
        let shutdown = ShutdownSignal::new();
        let _abandoned = shutdown.trigger_on_drop();
        let tracker = CompletionTracker::new();
        let (report_tx, mut report_rx) = mpsc::channel::<Error<P::Error>>(concurrency);

        // === Phase 0: Fan out workers ===
        #[cfg(feature = "tracing")]
        tracing::info!("Starting pool with {} workers", concurrency);

        for worker_id in 0..concurrency {
            let worker = Worker {
                worker_id,
                source: Arc::clone(&self.source),
                processor: Arc::clone(&self.processor),
                shutdown: shutdown.clone(),
                source_closed: self.config.source_closed(),
            };
            let report_tx = report_tx.clone();

            tracker.spawn(async move {
                let report = match AssertUnwindSafe(worker.run()).catch_unwind().await {
                    Ok(None) => return,
                    Ok(Some(err)) => err,
                    Err(payload) => {
                        #[cfg(feature = "tracing")]
                        tracing::error!("Worker {worker_id} panicked");
                        Error::WorkerPanicked {
                            worker_id,
                            message: panic_message(&*payload),
                        }
                    }
                };

                if let Err(_e) = report_tx.try_send(report) {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Worker {worker_id} failed to report: {_e}");
                }
            });
        }

        // Only workers hold senders from here on.
        drop(report_tx);
        tracker.seal();

        // === Phase 1: Race reports, cancellation and completion ===
        let mut state = State::Running;
        let mut outcome = Outcome::new();
        let mut reports_open = true;
        let mut cancel_seen = false;

        let all_exited = tracker.all_exited();
        tokio::pin!(all_exited);

        loop {
            tokio::select! {
                biased;
                report = report_rx.recv(), if reports_open => match report {
                    Some(err) => {
                        #[cfg(feature = "tracing")]
                        tracing::debug!("Worker reported: {}", display_kind(&err));
                        state.advance(State::ShuttingDown);
                        shutdown.trigger();
                        outcome.record(err);
                    }
                    None => reports_open = false,
                },
                () = cancel.cancelled(), if !cancel_seen => {
                    #[cfg(feature = "tracing")]
                    tracing::info!("Cancellation requested, stopping workers");
                    cancel_seen = true;
                    outcome.close();
                    state.advance(State::ShuttingDown);
                    shutdown.trigger();
                }
                () = &mut all_exited => break,
            }
        }

        // === Phase 2: Collect reports that landed alongside completion ===
        while let Ok(err) = report_rx.try_recv() {
            outcome.record(err);
        }

        state.advance(State::Done);

        #[cfg(feature = "tracing")]
        tracing::info!("Pool stopped, all {} workers exited", concurrency);

        outcome.into_result()
    }
}

/// Drains `messages` with `concurrency` workers applying `processor`.
///
/// Uses the default [`PoolConfig`], under which a closed source is an error.
/// Build a [`Coordinator`] directly to pick another
/// [`SourceClosed`](crate::SourceClosed) policy.
///
/// # Errors
///
/// Returns [`Error::InvalidConcurrency`] if `concurrency` is 0, otherwise
/// whatever [`Coordinator::run`] returns.
pub async fn process_concurrent<S, P>(
    messages: S,
    processor: P,
    concurrency: usize,
    cancel: CancellationToken,
) -> Result<(), P::Error>
where
    S: MessageSource,
    P: Processor<S::Message>,
{
    let config = PoolConfig::new::<P::Error>(concurrency)?;
    Coordinator::new(messages, processor, config).run(cancel).await
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(feature = "tracing")]
const fn display_kind<E>(err: &Error<E>) -> &'static str {
    match err {
        Error::Processing(_) => "processing error",
        Error::SourceClosedUnexpectedly => "source closed",
        Error::WorkerPanicked { .. } => "panic",
        Error::InvalidConcurrency => "invalid concurrency",
    }
}
