//! Error types for the worker pool.
//!
//! [`Error`] is the single outcome type returned by a pool run. It is generic
//! over the processor's own error so that processing failures are surfaced to
//! the caller verbatim.
//!
//! ## Error Cases
//! - `Processing`: the processor rejected a message.
//! - `SourceClosedUnexpectedly`: the message source closed while the pool was
//!   still expected to run.
//! - `WorkerPanicked`: a worker task unwound while processing a message.
//! - `InvalidConcurrency`: the pool was configured with zero workers.
//!
//! Cancellation has no variant. A run stopped by the caller's cancel token is a
//! successful run.

/// Result alias for pool operations, parameterized by the processor error.
pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// Outcome error of a pool run.
#[derive(thiserror::Error, Debug)]
pub enum Error<E> {
    /// The processor returned an error for a message.
    #[error("message processing failed: {0}")]
    Processing(#[source] E),

    /// The message source was closed and drained while workers were still
    /// waiting for messages.
    #[error("message source closed unexpectedly")]
    SourceClosedUnexpectedly,

    /// A worker panicked inside the processor.
    #[error("worker {worker_id} panicked: {message}")]
    WorkerPanicked { worker_id: usize, message: String },

    /// The pool was asked to run with no workers.
    #[error("concurrency must be greater than 0")]
    InvalidConcurrency,
}

impl<E> Error<E> {
    /// Returns the processor's error if this outcome came from processing.
    pub fn into_processing(self) -> Option<E> {
        match self {
            Self::Processing(e) => Some(e),
            _ => None,
        }
    }

    /// Returns `true` if the message source closed while workers were running.
    pub const fn is_source_closed(&self) -> bool {
        matches!(self, Self::SourceClosedUnexpectedly)
    }
}
