//! Process-wide table of runners, keyed by opaque numeric handle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use bf_core::RunnerId;

use crate::runner::Runner;

/// Maps [`RunnerId`] handles to live runners.
///
/// Handles come from an atomic counter starting at 1 and are never reused,
/// even after the runner they named has been evicted.
#[derive(Debug)]
pub struct RunnerRegistry {
    next_id: AtomicU64,
    runners: DashMap<RunnerId, Arc<Runner>>,
}

impl Default for RunnerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RunnerRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            runners: DashMap::new(),
        }
    }

    /// Allocate a fresh handle, build the runner with it, and register it.
    pub fn register(&self, build: impl FnOnce(RunnerId) -> Runner) -> Arc<Runner> {
        let id = RunnerId::from_raw(self.next_id.fetch_add(1, Ordering::SeqCst));
        let runner = Arc::new(build(id));
        self.runners.insert(id, Arc::clone(&runner));
        tracing::debug!(runner_id = %id, "Runner registered");
        runner
    }

    /// Look up a runner by handle.
    ///
    /// # Errors
    ///
    /// [`bf_core::Error::NotFound`] for unknown or evicted handles.
    pub fn lookup(&self, id: RunnerId) -> bf_core::Result<Arc<Runner>> {
        self.runners
            .get(&id)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| bf_core::Error::not_found("runner", id))
    }

    /// All registered runners, ordered by handle.
    pub fn list(&self) -> Vec<Arc<Runner>> {
        let mut runners: Vec<_> = self.runners.iter().map(|r| Arc::clone(r.value())).collect();
        runners.sort_by_key(|r| r.id());
        runners
    }

    pub fn len(&self) -> usize {
        self.runners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    /// Remove runners that have been terminal for at least `retention`.
    ///
    /// Returns the handles that were evicted.
    pub fn evict_expired(&self, retention: Duration) -> Vec<RunnerId> {
        let expired: Vec<RunnerId> = self
            .runners
            .iter()
            .filter(|r| {
                r.value()
                    .settled_at()
                    .is_some_and(|at| at.elapsed() >= retention)
            })
            .map(|r| *r.key())
            .collect();

        for id in &expired {
            self.runners.remove(id);
            tracing::debug!(runner_id = %id, "Runner evicted");
        }
        expired
    }

    /// Stop every runner that has not reached a terminal state.
    pub fn stop_all(&self) -> usize {
        self.list()
            .into_iter()
            .filter(|r| !r.state().is_terminal())
            .filter(|r| r.stop())
            .count()
    }
}
