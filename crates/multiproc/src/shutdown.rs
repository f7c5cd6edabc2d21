//! One-shot broadcast shutdown gate shared by every worker in a pool.

use portable_atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A "trigger once, observe many" shutdown signal.
///
/// Cloning a [`ShutdownSignal`] yields another handle to the same gate. The
/// first call to [`trigger`](Self::trigger) on any handle flips the gate and
/// wakes every task suspended in [`observed`](Self::observed); all later calls
/// are no-ops. Once triggered, the signal never reverts.
///
/// The trigger path is guarded by a compare-and-set on a shared flag so that
/// concurrent triggers (two failing workers, or a failure racing an external
/// cancel) resolve to exactly one transition.
#[derive(Clone, Debug, Default)]
pub struct ShutdownSignal {
    triggered: Arc<AtomicBool>,
    token: CancellationToken,
}

impl ShutdownSignal {
    /// Creates a new, untriggered signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Triggers the signal.
    ///
    /// Returns `true` for the call that performed the transition and `false`
    /// for every call after it.
    pub fn trigger(&self) -> bool {
        if self
            .triggered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        self.token.cancel();
        true
    }

    /// Returns `true` once the signal has been triggered.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// Resolves once the signal is triggered.
    ///
    /// Ready immediately if the signal has already fired. Safe to await from
    /// any number of tasks concurrently, and cancel-safe.
    pub async fn observed(&self) {
        self.token.cancelled().await;
    }

    /// Returns a guard that triggers this signal when dropped.
    ///
    /// Dropping a coordinator future mid-run would otherwise leave its workers
    /// draining the source with nobody listening.
    pub fn trigger_on_drop(&self) -> TriggerOnDrop {
        TriggerOnDrop {
            signal: self.clone(),
        }
    }
}

/// Triggers the wrapped [`ShutdownSignal`] on drop. See
/// [`ShutdownSignal::trigger_on_drop`].
#[derive(Debug)]
#[must_use = "the signal is triggered as soon as the guard is dropped"]
pub struct TriggerOnDrop {
    signal: ShutdownSignal,
}

impl Drop for TriggerOnDrop {
    fn drop(&mut self) {
        self.signal.trigger();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use futures::future::join_all;
    use tokio::time::timeout;

    #[test]
    fn only_first_trigger_transitions() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_triggered());

        assert!(signal.trigger());
        assert!(signal.is_triggered());
        assert!(!signal.trigger());
        assert!(!signal.clone().trigger());
        assert!(signal.is_triggered());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_triggers_transition_once() {
        let signal = ShutdownSignal::new();

        let tasks: Vec<_> = (0..64)
            .map(|_| {
                let signal = signal.clone();
                tokio::spawn(async move { signal.trigger() })
            })
            .collect();

        let transitions = join_all(tasks)
            .await
            .into_iter()
            .map(Result::unwrap)
            .filter(|won| *won)
            .count();

        assert_eq!(transitions, 1);
        assert!(signal.is_triggered());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn wakes_every_observer() {
        let signal = ShutdownSignal::new();

        let observers: Vec<_> = (0..16)
            .map(|_| {
                let signal = signal.clone();
                tokio::spawn(async move { signal.observed().await })
            })
            .collect();

        tokio::task::yield_now().await;
        signal.trigger();

        let joined = timeout(Duration::from_secs(1), join_all(observers))
            .await
            .expect("observers did not wake");
        assert!(joined.into_iter().all(|r| r.is_ok()));
    }

    #[tokio::test]
    async fn stays_ready_after_trigger() {
        let signal = ShutdownSignal::new();
        signal.trigger();

        for _ in 0..3 {
            timeout(Duration::from_millis(100), signal.observed())
                .await
                .expect("observed should be ready once triggered");
        }
    }

    #[test]
    fn guard_triggers_on_drop() {
        let signal = ShutdownSignal::new();
        let guard = signal.trigger_on_drop();
        assert!(!signal.is_triggered());

        drop(guard);
        assert!(signal.is_triggered());
    }

    #[tokio::test]
    async fn pending_until_triggered() {
        let signal = ShutdownSignal::new();
        let waited = timeout(Duration::from_millis(50), signal.observed()).await;
        assert!(waited.is_err());
    }
}
