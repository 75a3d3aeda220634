// src/walk/fan_in.rs

//! Completion tracking for one traversal.
//!
//! [`FanIn`] is a wait-group: every unit of outstanding work holds a
//! [`Release`] token, and the group finishes the moment the last token is
//! dropped. Because retirement happens in `Drop`, an error path that bails
//! out early still retires its branch.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tracing::trace;

use super::WalkError;

#[derive(Debug, Default)]
struct FanInState {
    outstanding: AtomicUsize,
    retired: AtomicUsize,
    finished: AtomicBool,
    done: Notify,
    failures: Mutex<Vec<WalkError>>,
}

impl FanInState {
    fn retire(&self) {
        self.retired.fetch_add(1, Ordering::AcqRel);
        let prev = self.outstanding.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "fan-in counter underflow");

        if prev == 1 && !self.finished.swap(true, Ordering::AcqRel) {
            trace!(
                retired = self.retired.load(Ordering::Acquire),
                "fan-in reached zero"
            );
            self.done.notify_waiters();
        }
    }

    fn record(&self, error: WalkError) {
        let mut failures = self
            .failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        failures.push(error);
    }
}

/// Outstanding-work counter shared by every branch of a single walk.
#[derive(Debug, Clone, Default)]
pub struct FanIn {
    inner: Arc<FanInState>,
}

impl FanIn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new branch.
    ///
    /// Must be called before the asynchronous operation the branch stands
    /// for is started, and while the caller still holds its own token, so
    /// the counter can never touch zero in between.
    pub fn enter(&self) -> Release {
        let prev = self.inner.outstanding.fetch_add(1, Ordering::AcqRel);
        debug_assert!(
            prev > 0 || !self.inner.finished.load(Ordering::Acquire),
            "entered a fan-in that already finished"
        );
        Release {
            state: Arc::clone(&self.inner),
        }
    }

    /// Number of branches still open.
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::Acquire)
    }

    /// Number of branches retired so far.
    pub fn retired(&self) -> usize {
        self.inner.retired.load(Ordering::Acquire)
    }

    pub fn is_finished(&self) -> bool {
        self.inner.finished.load(Ordering::Acquire)
    }

    /// Record a failure without retiring anything.
    pub fn record_failure(&self, error: WalkError) {
        self.inner.record(error);
    }

    /// Failures recorded so far, in the order they were reported.
    pub fn failures(&self) -> Vec<WalkError> {
        self.inner
            .failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Resolve once every branch has been retired.
    ///
    /// Resolves immediately if the group already finished.
    pub async fn wait(&self) {
        loop {
            // Register interest before checking the flag so a concurrent
            // `notify_waiters` between the check and the await is not lost.
            let notified = self.inner.done.notified();
            if self.is_finished() {
                return;
            }
            notified.await;
        }
    }
}

/// Token for one open branch of a walk.
///
/// Dropping it, or calling [`Release::release`], retires the branch.
/// [`Release::fail`] records an error first. A `Release` can be moved into a
/// spawned task so a file callback may finish its work asynchronously.
pub struct Release {
    state: Arc<FanInState>,
}

impl Release {
    /// Retire this branch.
    pub fn release(self) {}

    /// Record `error` against the walk, then retire this branch.
    pub fn fail(self, error: WalkError) {
        self.state.record(error);
    }
}

impl Drop for Release {
    fn drop(&mut self) {
        self.state.retire();
    }
}

impl fmt::Debug for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Release")
            .field("outstanding", &self.state.outstanding.load(Ordering::Acquire))
            .finish()
    }
}
