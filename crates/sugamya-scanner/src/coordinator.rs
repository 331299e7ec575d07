//! Job admission and graceful shutdown.
//!
//! Every accepted job holds an [`InFlightGuard`] from admission until its scan
//! record reaches a terminal state. Once draining starts no new guard is
//! handed out, and [`ScanCoordinator::drain`] waits for the outstanding ones
//! up to a hard ceiling.

use crate::error::{Result, ScanError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Tracks in-flight jobs and the draining flag.
#[derive(Debug, Default)]
pub struct ScanCoordinator {
    in_flight: AtomicUsize,
    draining: CancellationToken,
    idle: Notify,
}

/// Outcome of a drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Jobs still running when the drain gave up; zero on a clean drain
    pub abandoned: usize,
    /// How long the drain waited
    pub elapsed: Duration,
}

impl DrainReport {
    /// Whether every in-flight job finished before the ceiling.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.abandoned == 0
    }
}

impl ScanCoordinator {
    /// Create a coordinator that is accepting work.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Admit one job, or refuse it when draining.
    pub fn admit(self: &Arc<Self>) -> Result<InFlightGuard> {
        if self.is_draining() {
            return Err(ScanError::ShutdownInProgress);
        }
        self.in_flight.fetch_add(1, Ordering::SeqCst);

        // A drain may have started between the check and the increment.
        if self.is_draining() {
            self.release();
            return Err(ScanError::ShutdownInProgress);
        }

        Ok(InFlightGuard {
            coordinator: Arc::clone(self),
        })
    }

    /// Whether the process is shutting down.
    #[must_use]
    pub fn is_draining(&self) -> bool {
        self.draining.is_cancelled()
    }

    /// Resolves once draining starts.
    pub async fn draining(&self) {
        self.draining.cancelled().await;
    }

    /// Number of admitted jobs not yet terminal.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Resolves once nothing is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stop admitting work. Idempotent.
    pub fn begin_drain(&self) {
        if !self.is_draining() {
            tracing::info!(in_flight = self.in_flight(), "Draining, new scans are refused");
        }
        self.draining.cancel();
    }

    /// Stop admitting work and wait for in-flight jobs.
    ///
    /// Re-checks the counter every `poll_interval` and whenever a job
    /// finishes. Gives up after `ceiling` and reports what was abandoned.
    pub async fn drain(&self, poll_interval: Duration, ceiling: Duration) -> DrainReport {
        self.begin_drain();
        let started = Instant::now();

        loop {
            let remaining = self.in_flight();
            let elapsed = started.elapsed();

            if remaining == 0 {
                tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "Drain complete");
                return DrainReport {
                    abandoned: 0,
                    elapsed,
                };
            }
            if elapsed >= ceiling {
                tracing::warn!(
                    abandoned = remaining,
                    ceiling_secs = ceiling.as_secs(),
                    "Drain ceiling reached, abandoning in-flight scans"
                );
                return DrainReport {
                    abandoned: remaining,
                    elapsed,
                };
            }

            tracing::debug!(in_flight = remaining, "Waiting for in-flight scans");
            let wait = poll_interval.min(ceiling - elapsed);
            tokio::select! {
                () = self.idle.notified() => {}
                () = tokio::time::sleep(wait) => {}
            }
        }
    }

    fn release(&self) {
        let previous = self.in_flight.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "in-flight counter underflow");
        self.idle.notify_waiters();
    }
}

/// Held while a job is in flight. Dropping it releases the slot.
#[derive(Debug)]
pub struct InFlightGuard {
    coordinator: Arc<ScanCoordinator>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.coordinator.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_admit_and_release() {
        let coordinator = ScanCoordinator::new();
        let first = assert_ok!(coordinator.admit());
        let second = assert_ok!(coordinator.admit());
        assert_eq!(coordinator.in_flight(), 2);

        drop(first);
        assert_eq!(coordinator.in_flight(), 1);
        drop(second);
        assert_eq!(coordinator.in_flight(), 0);
    }

    #[test]
    fn test_admission_refused_while_draining() {
        let coordinator = ScanCoordinator::new();
        coordinator.begin_drain();
        coordinator.begin_drain();

        assert!(coordinator.is_draining());
        let err = assert_err!(coordinator.admit());
        assert!(matches!(err, ScanError::ShutdownInProgress));
        assert_eq!(coordinator.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_with_nothing_in_flight() {
        let coordinator = ScanCoordinator::new();
        let report = coordinator
            .drain(Duration::from_millis(500), Duration::from_secs(30))
            .await;
        assert!(report.is_clean());
        assert_eq!(report.elapsed, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_waits_for_slowest_job() {
        let coordinator = ScanCoordinator::new();
        for secs in [1, 3] {
            let guard = coordinator.admit().unwrap();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(secs)).await;
                drop(guard);
            });
        }

        let report = coordinator
            .drain(Duration::from_millis(500), Duration::from_secs(30))
            .await;

        assert!(report.is_clean());
        assert!(report.elapsed >= Duration::from_secs(3));
        assert!(report.elapsed < Duration::from_millis(3500));
        assert!(matches!(coordinator.admit(), Err(ScanError::ShutdownInProgress)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_gives_up_at_ceiling() {
        let coordinator = ScanCoordinator::new();
        let _stuck = coordinator.admit().unwrap();

        let report = coordinator
            .drain(Duration::from_millis(300), Duration::from_secs(2))
            .await;

        assert_eq!(report.abandoned, 1);
        assert!(report.elapsed >= Duration::from_secs(2));
        assert!(report.elapsed < Duration::from_millis(2300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_idle() {
        let coordinator = ScanCoordinator::new();
        coordinator.wait_idle().await;

        let guard = coordinator.admit().unwrap();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            drop(guard);
        });
        coordinator.wait_idle().await;
        assert_eq!(coordinator.in_flight(), 0);
        assert!(!coordinator.is_draining());
    }

    #[tokio::test]
    async fn test_draining_future_resolves() {
        let coordinator = ScanCoordinator::new();
        let waiter = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.draining().await })
        };
        coordinator.begin_drain();
        waiter.await.unwrap();
    }
}
