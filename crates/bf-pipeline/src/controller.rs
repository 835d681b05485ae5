//! The per-entry execution contract between the runner and an action.
//!
//! An action's executor returns an [`ExecutionController`] as soon as it is
//! invoked; the side effects are already under way by then. The runner only
//! ever talks to this trait, whichever action produced it.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Why an entry did not complete successfully.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntryError {
    /// The entry was stopped before it finished.
    #[error("cancelled")]
    Cancelled,
    /// The action failed (non-zero exit, spawn failure, I/O error, ...).
    #[error("{0}")]
    Failed(String),
}

impl From<bf_core::Error> for EntryError {
    fn from(err: bf_core::Error) -> Self {
        match err {
            bf_core::Error::Cancelled => EntryError::Cancelled,
            other => EntryError::Failed(other.to_string()),
        }
    }
}

/// Live handle on one entry's execution.
///
/// - `progress()` may be called at any rate, including after completion, and
///   returns the last known value. It is not range-checked; `0.0` means the
///   action does not instrument progress.
/// - `stop()` is idempotent and a no-op after settlement.
/// - `wait()` settles exactly once; every call observes the same outcome. A
///   stopped execution settles with [`EntryError::Cancelled`].
#[async_trait]
pub trait ExecutionController: Send + Sync {
    /// Current completion estimate for this entry.
    fn progress(&self) -> f64;

    /// Request termination.
    fn stop(&self);

    /// Wait for the execution to settle.
    async fn wait(&self) -> Result<(), EntryError>;
}

/// Shared, lock-free progress value.
#[derive(Debug, Clone, Default)]
pub struct ProgressCell(Arc<AtomicU64>);

impl ProgressCell {
    pub fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }
}

type Settlement = Option<Result<(), EntryError>>;

/// [`ExecutionController`] backed by a spawned tokio task.
///
/// The task is dropped as soon as [`stop`](ExecutionController::stop) is
/// called, so anything it owns (child processes spawned with
/// `kill_on_drop`, temp files) is released immediately.
pub struct TaskController {
    progress: ProgressCell,
    cancel: CancellationToken,
    done: watch::Receiver<Settlement>,
}

impl TaskController {
    /// Spawn `work` on the current tokio runtime and return its controller.
    ///
    /// `work` receives a cancellation token (fired by `stop()`) and the
    /// progress cell it should update.
    pub fn spawn<F, Fut>(work: F) -> Arc<Self>
    where
        F: FnOnce(CancellationToken, ProgressCell) -> Fut,
        Fut: Future<Output = Result<(), EntryError>> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let progress = ProgressCell::default();
        let (tx, rx) = watch::channel(None);

        let fut = work(cancel.clone(), progress.clone());
        let token = cancel.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                result = fut => result,
                _ = token.cancelled() => Err(EntryError::Cancelled),
            };
            tx.send_replace(Some(result));
        });

        Arc::new(Self {
            progress,
            cancel,
            done: rx,
        })
    }

    /// A controller that has already settled with `result`.
    pub fn settled(result: Result<(), EntryError>) -> Arc<Self> {
        let (_tx, rx) = watch::channel(Some(result));
        Arc::new(Self {
            progress: ProgressCell::default(),
            cancel: CancellationToken::new(),
            done: rx,
        })
    }

    /// Convenience for an execution that could not even begin.
    pub fn failed(message: impl Into<String>) -> Arc<Self> {
        Self::settled(Err(EntryError::Failed(message.into())))
    }

    fn is_settled(&self) -> bool {
        self.done.borrow().is_some()
    }
}

#[async_trait]
impl ExecutionController for TaskController {
    fn progress(&self) -> f64 {
        self.progress.get()
    }

    fn stop(&self) {
        if !self.is_settled() {
            self.cancel.cancel();
        }
    }

    async fn wait(&self) -> Result<(), EntryError> {
        let mut rx = self.done.clone();
        let settled = match rx.wait_for(Option::is_some).await {
            Ok(settled) => settled.clone(),
            Err(_) => return Err(EntryError::Failed("execution task aborted".into())),
        };
        settled.unwrap_or_else(|| Err(EntryError::Failed("execution did not settle".into())))
    }
}

impl std::fmt::Debug for TaskController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskController")
            .field("progress", &self.progress.get())
            .field("settled", &self.is_settled())
            .finish()
    }
}
