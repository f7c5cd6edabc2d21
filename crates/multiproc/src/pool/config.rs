use crate::error::Error;
use core::num::NonZeroUsize;

/// What a worker does when the message source reports it is closed and
/// drained.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SourceClosed {
    /// The source is expected to outlive the run. Closing it is a caller
    /// contract violation and ends the run with
    /// [`Error::SourceClosedUnexpectedly`].
    #[default]
    Fail,
    /// Closing the source is the normal end of input. Each worker exits
    /// quietly once the source is drained, and the run succeeds if nothing
    /// else failed.
    Finish,
}

/// Validated settings for a pool run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    concurrency: NonZeroUsize,
    source_closed: SourceClosed,
}

impl PoolConfig {
    /// Creates a config for `concurrency` workers with the default
    /// [`SourceClosed::Fail`] policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConcurrency`] if `concurrency` is 0. A pool with
    /// no workers would otherwise wait forever.
    pub fn new<E>(concurrency: usize) -> Result<Self, Error<E>> {
        let concurrency = NonZeroUsize::new(concurrency).ok_or(Error::InvalidConcurrency)?;
        Ok(Self {
            concurrency,
            source_closed: SourceClosed::default(),
        })
    }

    /// Sets how workers react to a closed source.
    #[must_use]
    pub const fn with_source_closed(mut self, source_closed: SourceClosed) -> Self {
        self.source_closed = source_closed;
        self
    }

    /// Number of workers spawned for a run.
    pub const fn concurrency(&self) -> usize {
        self.concurrency.get()
    }

    /// Policy applied when the source closes.
    pub const fn source_closed(&self) -> SourceClosed {
        self.source_closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_workers() {
        let err = PoolConfig::new::<()>(0).unwrap_err();
        assert!(matches!(err, Error::InvalidConcurrency));
    }

    #[test]
    fn defaults_to_failing_on_close() {
        let config = PoolConfig::new::<()>(4).unwrap();
        assert_eq!(config.concurrency(), 4);
        assert_eq!(config.source_closed(), SourceClosed::Fail);

        let config = config.with_source_closed(SourceClosed::Finish);
        assert_eq!(config.source_closed(), SourceClosed::Finish);
        assert_eq!(config.concurrency(), 4);
    }
}
