//! Running actions as background Tokio tasks.
//!
//! [`spawn_action`] begins a generation, hands the worker an [`ActionContext`],
//! and supervises the task so the coordinator hears `complete` exactly once on
//! every exit path: success, error, panic, deadline, or task teardown.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::core::{ActionCoordinator, CancelToken, Generation, OutputSink};

/// Append capability bound to one generation.
#[derive(Debug, Clone)]
pub struct ActionWriter {
    generation: Generation,
    sink: Arc<OutputSink>,
}

impl ActionWriter {
    pub fn new(generation: Generation, sink: Arc<OutputSink>) -> Self {
        Self { generation, sink }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Append raw text.
    pub fn append(&self, text: impl Into<String>) {
        self.sink.append(self.generation, text);
    }

    /// Append `text` followed by a newline.
    pub fn line(&self, text: impl AsRef<str>) {
        let mut text = text.as_ref().to_string();
        text.push('\n');
        self.sink.append(self.generation, text);
    }
}

/// Everything a worker is given at spawn time.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub generation: Generation,
    pub writer: ActionWriter,
    pub token: CancelToken,
}

impl ActionContext {
    pub fn append(&self, text: impl Into<String>) {
        self.writer.append(text);
    }

    pub fn line(&self, text: impl AsRef<str>) {
        self.writer.line(text);
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Sleep for `duration` unless cancelled first.
    ///
    /// Returns `true` if the full duration elapsed, `false` on cancellation.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.token.cancelled() => false,
        }
    }
}

/// Completes a generation when dropped.
///
/// Completion is idempotent, so dropping after an explicit completion is harmless.
#[derive(Debug)]
pub struct CompletionGuard {
    coordinator: ActionCoordinator,
    generation: Generation,
}

impl CompletionGuard {
    pub fn new(coordinator: ActionCoordinator, generation: Generation) -> Self {
        Self {
            coordinator,
            generation,
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.coordinator.complete(self.generation);
    }
}

/// How a supervised action ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionExit {
    /// Worker returned `Ok(())` without being cancelled.
    Finished,
    /// Worker returned `Ok(())` after its token was cancelled.
    Cancelled,
    /// Worker returned an error; it was appended to the output.
    Failed,
    /// Worker panicked.
    Panicked,
    /// Deadline elapsed; the worker task was aborted.
    TimedOut,
    /// Worker task was torn down before finishing (runtime shutdown).
    Aborted,
}

/// A spawned action: its generation and the supervising task.
#[derive(Debug)]
pub struct SpawnedAction {
    pub generation: Generation,
    pub handle: JoinHandle<ActionExit>,
}

/// Begin a new action on `coordinator` and run `worker` in the background.
///
/// `worker` is invoked inside the spawned task, so a panic while it builds its
/// future is reported like any other worker panic. With a `deadline`, a worker
/// still running when it elapses is cancelled and its task aborted; its
/// generation stops polling but keeps the output written so far.
///
/// # Panics
///
/// Panics when called outside a Tokio runtime. The generation is completed
/// before the panic leaves this function.
pub fn spawn_action<F, Fut>(
    coordinator: &ActionCoordinator,
    refresh_interval_secs: u32,
    deadline: Option<Duration>,
    worker: F,
) -> SpawnedAction
where
    F: FnOnce(ActionContext) -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let (generation, token) = coordinator.begin(refresh_interval_secs);
    let guard = CompletionGuard::new(coordinator.clone(), generation);
    let writer = ActionWriter::new(generation, Arc::clone(coordinator.sink()));
    let ctx = ActionContext {
        generation,
        writer: writer.clone(),
        token: token.clone(),
    };

    let task = tokio::spawn(async move { worker(ctx).await });
    let supervisor = Supervisor {
        coordinator: coordinator.clone(),
        writer,
        token,
        guard,
    };
    let handle = tokio::spawn(supervisor.run(task, deadline));
    SpawnedAction { generation, handle }
}

struct Supervisor {
    coordinator: ActionCoordinator,
    writer: ActionWriter,
    token: CancelToken,
    guard: CompletionGuard,
}

impl Supervisor {
    async fn run(self, mut task: JoinHandle<Result<()>>, deadline: Option<Duration>) -> ActionExit {
        let generation = self.writer.generation();
        let joined = match deadline {
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    self.writer
                        .line(format!("action timed out after {}s", limit.as_secs()));
                    self.coordinator.cancel(generation);
                    task.abort();
                    warn!(%generation, timeout_secs = limit.as_secs(), "action timed out");
                    return ActionExit::TimedOut;
                }
            },
            None => task.await,
        };

        let exit = self.classify(joined);
        drop(self.guard);
        exit
    }

    fn classify(&self, joined: std::result::Result<Result<()>, JoinError>) -> ActionExit {
        let generation = self.writer.generation();
        match joined {
            Ok(Ok(())) if self.token.is_cancelled() => {
                debug!(%generation, "action stopped after cancellation");
                ActionExit::Cancelled
            }
            Ok(Ok(())) => {
                info!(%generation, "action finished");
                ActionExit::Finished
            }
            Ok(Err(err)) => {
                let message = format!("{err:#}");
                self.writer.line(format!("error: {message}"));
                warn!(%generation, error = %message, "action failed");
                ActionExit::Failed
            }
            Err(join_err) if join_err.is_panic() => {
                self.writer.line("action panicked");
                error!(%generation, "action panicked");
                ActionExit::Panicked
            }
            Err(_) => {
                warn!(%generation, "action task aborted");
                ActionExit::Aborted
            }
        }
    }
}
