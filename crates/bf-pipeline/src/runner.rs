//! Bounded-concurrency runner.
//!
//! A [`Runner`] owns a FIFO worklist and drives it through exactly `P` worker
//! tasks. Each worker pops the next entry, invokes the action's executor,
//! registers the returned controller as live, waits for it to settle, and
//! loops until the worklist is empty or the runner is stopped.
//!
//! State machine: `Pending -> Running -> {Completed, Stopped}`. Terminal
//! states are never left.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinSet;

use bf_core::events::{EventBus, EventPayload};
use bf_core::{Entry, Error, Profile, RunnerId};

use crate::action::Action;
use crate::controller::{EntryError, ExecutionController};

/// Lifecycle state of a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerState {
    Pending,
    Running,
    Completed,
    Stopped,
}

impl RunnerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunnerState::Completed | RunnerState::Stopped)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunnerState::Pending => "pending",
            RunnerState::Running => "running",
            RunnerState::Completed => "completed",
            RunnerState::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for RunnerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time aggregate progress of a runner.
///
/// `running` is the sum of `progress()` over live controllers and is not
/// clamped. `finished` counts every settled entry, whatever its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerProgress {
    pub finished: usize,
    pub running: f64,
    pub amount: usize,
    pub failed: usize,
    pub skipped: usize,
    pub state: RunnerState,
}

/// Listing view of a runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSummary {
    pub runner_id: RunnerId,
    pub extension_id: String,
    pub action_id: String,
    pub state: RunnerState,
    pub finished: usize,
    pub amount: usize,
    pub failed: usize,
    pub created_at: DateTime<Utc>,
}

/// One entry whose execution failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryFailure {
    pub entry: Entry,
    pub error: String,
}

/// Final result of a runner, available once every worker has exited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub runner_id: RunnerId,
    pub amount: usize,
    pub finished: usize,
    /// Entries that settled as cancelled (counted in `finished`).
    pub cancelled: usize,
    /// Entries never dispatched because the runner was stopped.
    pub skipped: usize,
    pub failures: Vec<EntryFailure>,
    pub stopped: bool,
}

impl RunOutcome {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Whether every entry ran and none failed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.stopped
    }

    /// Turn any recorded failure into [`Error::Batch`].
    ///
    /// A stopped runner without failures is not an error.
    pub fn into_result(self) -> bf_core::Result<Self> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(Error::Batch {
                failed: self.failures.len(),
                amount: self.amount,
            })
        }
    }
}

/// A batch of entries driven through a fixed-size worker pool.
pub struct Runner {
    id: RunnerId,
    extension_id: String,
    action_id: String,
    amount: usize,
    created_at: DateTime<Utc>,

    queue: Mutex<VecDeque<Entry>>,
    live: Mutex<HashMap<u64, Arc<dyn ExecutionController>>>,
    next_slot: AtomicU64,

    finished: AtomicUsize,
    cancelled: AtomicUsize,
    skipped: AtomicUsize,
    failures: Mutex<Vec<EntryFailure>>,

    stopped: AtomicBool,
    state: Mutex<RunnerState>,
    settled_at: Mutex<Option<Instant>>,
    done: watch::Sender<bool>,

    events: Option<Arc<EventBus>>,
}

impl Runner {
    /// Create a pending runner over `entries`.
    pub fn new(
        id: RunnerId,
        extension_id: impl Into<String>,
        action_id: impl Into<String>,
        entries: Vec<Entry>,
    ) -> Self {
        let (done, _) = watch::channel(false);
        Self {
            id,
            extension_id: extension_id.into(),
            action_id: action_id.into(),
            amount: entries.len(),
            created_at: Utc::now(),
            queue: Mutex::new(entries.into()),
            live: Mutex::new(HashMap::new()),
            next_slot: AtomicU64::new(0),
            finished: AtomicUsize::new(0),
            cancelled: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            failures: Mutex::new(Vec::new()),
            stopped: AtomicBool::new(false),
            state: Mutex::new(RunnerState::Pending),
            settled_at: Mutex::new(None),
            done,
            events: None,
        }
    }

    /// Builder: publish lifecycle events on `bus`.
    pub fn with_events(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn id(&self) -> RunnerId {
        self.id
    }

    pub fn extension_id(&self) -> &str {
        &self.extension_id
    }

    pub fn action_id(&self) -> &str {
        &self.action_id
    }

    /// Worklist length at creation.
    pub fn amount(&self) -> usize {
        self.amount
    }

    pub fn state(&self) -> RunnerState {
        *self.state.lock()
    }

    /// When the runner reached a terminal state.
    pub fn settled_at(&self) -> Option<Instant> {
        *self.settled_at.lock()
    }

    fn emit(&self, payload: EventPayload) {
        if let Some(ref bus) = self.events {
            bus.broadcast(payload);
        }
    }

    /// Spawn exactly `parallelism` workers (at least one) over the worklist.
    ///
    /// An empty worklist completes immediately without invoking `action`.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] if the runner was already started or stopped.
    pub fn start(
        self: &Arc<Self>,
        action: Arc<dyn Action>,
        profile: Profile,
        parallelism: usize,
    ) -> bf_core::Result<()> {
        {
            let mut state = self.state.lock();
            if *state != RunnerState::Pending {
                return Err(Error::Validation(format!(
                    "runner {} is already {}",
                    self.id, *state
                )));
            }
            *state = RunnerState::Running;
        }

        let parallelism = parallelism.max(1);
        tracing::info!(
            runner_id = %self.id,
            extension = %self.extension_id,
            action = %self.action_id,
            amount = self.amount,
            parallelism,
            "Runner started"
        );
        self.emit(EventPayload::RunnerStarted {
            runner_id: self.id,
            extension_id: self.extension_id.clone(),
            action_id: self.action_id.clone(),
            amount: self.amount,
        });

        if self.amount == 0 {
            self.settle();
            return Ok(());
        }

        let runner = Arc::clone(self);
        tokio::spawn(async move {
            let mut workers = JoinSet::new();
            for worker in 0..parallelism {
                let runner = Arc::clone(&runner);
                let action = Arc::clone(&action);
                let profile = profile.clone();
                workers.spawn(async move { runner.work(worker, action.as_ref(), &profile).await });
            }
            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    tracing::error!(runner_id = %runner.id, "Worker task failed: {e}");
                }
            }
            runner.settle();
        });

        Ok(())
    }

    /// One worker loop.
    async fn work(&self, worker: usize, action: &dyn Action, profile: &Profile) {
        loop {
            if self.stopped.load(Ordering::SeqCst) {
                break;
            }
            let Some(entry) = self.queue.lock().pop_front() else {
                break;
            };

            let controller = action.execute(profile, &entry);
            let slot = self.next_slot.fetch_add(1, Ordering::Relaxed);
            self.live.lock().insert(slot, Arc::clone(&controller));
            // A stop that raced with dispatch may have missed this controller.
            if self.stopped.load(Ordering::SeqCst) {
                controller.stop();
            }

            let result = controller.wait().await;
            self.live.lock().remove(&slot);

            match result {
                Ok(()) => {}
                Err(EntryError::Cancelled) => {
                    self.cancelled.fetch_add(1, Ordering::SeqCst);
                }
                Err(EntryError::Failed(message)) => {
                    tracing::warn!(
                        runner_id = %self.id,
                        worker,
                        input = ?entry.input_path(),
                        "Entry failed: {message}"
                    );
                    self.emit(EventPayload::EntryFailed {
                        runner_id: self.id,
                        input: entry.input_path().map(|p| p.to_path_buf()),
                        error: message.clone(),
                    });
                    self.failures.lock().push(EntryFailure {
                        entry,
                        error: message,
                    });
                }
            }
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
        tracing::debug!(runner_id = %self.id, worker, "Worker exited");
    }

    /// Move to the terminal state once no worker is left.
    fn settle(&self) {
        self.settle_if(|_| true);
    }

    /// Settle only if the current state satisfies `allowed`. The check and
    /// the transition happen under one state lock.
    fn settle_if(&self, allowed: impl FnOnce(RunnerState) -> bool) {
        let (state, skipped) = {
            let mut state = self.state.lock();
            if state.is_terminal() || !allowed(*state) {
                return;
            }
            let skipped = {
                let mut queue = self.queue.lock();
                let n = queue.len();
                queue.clear();
                n
            };
            self.skipped.store(skipped, Ordering::SeqCst);
            *state = if self.stopped.load(Ordering::SeqCst) {
                RunnerState::Stopped
            } else {
                RunnerState::Completed
            };
            (*state, skipped)
        };
        *self.settled_at.lock() = Some(Instant::now());

        let finished = self.finished.load(Ordering::SeqCst);
        let failed = self.failures.lock().len();
        tracing::info!(
            runner_id = %self.id,
            finished,
            failed,
            skipped,
            "Runner {state}"
        );
        self.emit(EventPayload::RunnerFinished {
            runner_id: self.id,
            finished,
            failed,
            skipped,
        });
        self.done.send_replace(true);
    }

    /// Stop every live controller and halt further dispatch.
    ///
    /// Idempotent; returns `true` only for the call that actually stopped
    /// the runner. Stopping a pending runner settles it immediately with
    /// every entry skipped.
    pub fn stop(&self) -> bool {
        let first = !self.stopped.swap(true, Ordering::SeqCst);

        let live: Vec<_> = self.live.lock().drain().map(|(_, c)| c).collect();
        for controller in &live {
            controller.stop();
        }

        if first {
            tracing::info!(runner_id = %self.id, live = live.len(), "Runner stop requested");
            self.emit(EventPayload::RunnerStopped { runner_id: self.id });
            self.settle_if(|state| state == RunnerState::Pending);
        }
        first
    }

    /// Current aggregate progress.
    pub fn progress(&self) -> RunnerProgress {
        let running = self.live.lock().values().map(|c| c.progress()).sum();
        RunnerProgress {
            finished: self.finished.load(Ordering::SeqCst),
            running,
            amount: self.amount,
            failed: self.failures.lock().len(),
            skipped: self.skipped.load(Ordering::SeqCst),
            state: self.state(),
        }
    }

    pub fn summary(&self) -> RunnerSummary {
        RunnerSummary {
            runner_id: self.id,
            extension_id: self.extension_id.clone(),
            action_id: self.action_id.clone(),
            state: self.state(),
            finished: self.finished.load(Ordering::SeqCst),
            amount: self.amount,
            failed: self.failures.lock().len(),
            created_at: self.created_at,
        }
    }

    /// Outcome so far; final once the runner is terminal.
    pub fn outcome(&self) -> RunOutcome {
        RunOutcome {
            runner_id: self.id,
            amount: self.amount,
            finished: self.finished.load(Ordering::SeqCst),
            cancelled: self.cancelled.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            failures: self.failures.lock().clone(),
            stopped: self.stopped.load(Ordering::SeqCst),
        }
    }

    /// Wait until every worker has exited and return the final outcome.
    pub async fn wait(&self) -> RunOutcome {
        let mut rx = self.done.subscribe();
        // The sender lives as long as `self`, so this cannot observe a close.
        let _ = rx.wait_for(|done| *done).await;
        self.outcome()
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("id", &self.id)
            .field("extension_id", &self.extension_id)
            .field("action_id", &self.action_id)
            .field("amount", &self.amount)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
