//! Action lifecycle coordinator.
//!
//! Exactly one generation is current at a time. Starting an action supersedes
//! the previous one: its cancel signal is raised, the sink switches to the new
//! generation, and any later completion report from the old worker is ignored.
//!
//! # Locking
//!
//! Every public method takes the state lock exactly once and never calls
//! another public method while holding it. Shared logic lives in free functions
//! over the already-locked state. When both locks are needed the order is
//! coordinator state, then sink; the sink never reaches back into the
//! coordinator. Logging happens after the state lock is released.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::{debug, info};

use super::cancel::{CancelHandle, CancelToken, cancel_signal};
use super::generation::{Generation, GenerationCounter};
use super::sink::OutputSink;
use super::view::{ActionStatus, Frame, View};

/// Minimum refresh interval advertised to clients, in seconds.
pub const MIN_REFRESH_SECS: u32 = 1;

#[derive(Debug)]
struct ActionRecord {
    generation: Generation,
    cancel: CancelHandle,
    started_at: Instant,
    running: bool,
    poll_count: u32,
    refresh_interval_secs: u32,
}

#[derive(Debug, Default)]
struct CoordinatorState {
    current: Option<ActionRecord>,
}

#[derive(Debug)]
struct Inner {
    generations: GenerationCounter,
    state: Mutex<CoordinatorState>,
    sink: Arc<OutputSink>,
}

/// Owns the current action record and the output sink it publishes to.
///
/// Cloning is cheap and every clone observes the same state.
#[derive(Debug, Clone)]
pub struct ActionCoordinator {
    inner: Arc<Inner>,
}

impl Default for ActionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionCoordinator {
    pub fn new() -> Self {
        Self::with_sink(Arc::new(OutputSink::new()))
    }

    /// Build a coordinator publishing to an existing sink.
    ///
    /// The coordinator becomes the only writer of the sink's visible generation.
    pub fn with_sink(sink: Arc<OutputSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                generations: GenerationCounter::new(),
                state: Mutex::new(CoordinatorState::default()),
                sink,
            }),
        }
    }

    pub fn sink(&self) -> &Arc<OutputSink> {
        &self.inner.sink
    }

    /// Start a new action, superseding any previous one.
    ///
    /// A refresh interval below [`MIN_REFRESH_SECS`] is raised to it.
    pub fn begin(&self, refresh_interval_secs: u32) -> (Generation, CancelToken) {
        let refresh_interval_secs = refresh_interval_secs.max(MIN_REFRESH_SECS);
        let (token, handle) = cancel_signal();

        let mut state = self.lock();
        let generation = self.inner.generations.next();
        let superseded = state.current.replace(ActionRecord {
            generation,
            cancel: handle,
            started_at: Instant::now(),
            running: true,
            poll_count: 0,
            refresh_interval_secs,
        });
        let superseded = superseded.map(|prev| {
            prev.cancel.cancel();
            (prev.generation, prev.running)
        });
        self.inner.sink.reset_to(generation);
        drop(state);

        match superseded {
            Some((prev, true)) => {
                info!(%generation, superseded = %prev, refresh_interval_secs, "action begun, cancelling running action");
            }
            _ => info!(%generation, refresh_interval_secs, "action begun"),
        }
        (generation, token)
    }

    /// Report that the worker for `generation` has finished.
    ///
    /// Only the current generation can stop polling; reports from superseded
    /// generations are ignored. Idempotent.
    pub fn complete(&self, generation: Generation) {
        let mut state = self.lock();
        let accepted = match state.current.as_mut() {
            Some(record) if record.generation == generation => {
                let was_running = record.running;
                record.running = false;
                record.poll_count = 0;
                Some(was_running)
            }
            _ => None,
        };
        drop(state);

        match accepted {
            Some(true) => debug!(%generation, "action completed"),
            Some(false) => debug!(%generation, "repeat completion ignored"),
            None => debug!(%generation, "stale completion ignored"),
        }
    }

    /// Count a display request and project the current view.
    ///
    /// Only a running action is counted; an idle coordinator reports a zero
    /// poll count and no refresh interval.
    pub fn poll(&self) -> View {
        let mut state = self.lock();
        poll_locked(&mut state).1
    }

    /// Like [`ActionCoordinator::poll`], plus the output of the polled generation.
    pub fn poll_frame(&self) -> Frame {
        let mut state = self.lock();
        let (generation, view) = poll_locked(&mut state);
        let output = self.inner.sink.snapshot(generation);
        drop(state);
        Frame {
            generation,
            view,
            output,
        }
    }

    /// Project the current view without counting a poll.
    pub fn current_view(&self) -> (Generation, View) {
        let state = self.lock();
        view_locked(&state)
    }

    /// Output of the currently visible generation.
    pub fn snapshot(&self) -> String {
        self.inner.sink.snapshot_current()
    }

    /// Stop the current action if it is running. Output stays visible.
    ///
    /// Returns the stopped generation, or `None` if nothing was running.
    pub fn abort(&self) -> Option<Generation> {
        let mut state = self.lock();
        let stopped = state.current.as_mut().and_then(stop_locked);
        drop(state);

        if let Some(generation) = stopped {
            info!(%generation, "action aborted");
        }
        stopped
    }

    /// Stop `generation` if it is still the current, running action.
    ///
    /// Returns `false` when `generation` was superseded or already idle.
    pub fn cancel(&self, generation: Generation) -> bool {
        let mut state = self.lock();
        let stopped = state
            .current
            .as_mut()
            .filter(|record| record.generation == generation)
            .and_then(stop_locked);
        drop(state);

        if stopped.is_some() {
            info!(%generation, "action cancelled");
        }
        stopped.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.lock()
            .current
            .as_ref()
            .is_some_and(|record| record.running)
    }

    /// Status summary for JSON consumers. Does not count as a poll.
    pub fn status(&self) -> ActionStatus {
        let state = self.lock();
        let (generation, view) = view_locked(&state);
        let elapsed_ms = state
            .current
            .as_ref()
            .map(|record| u64::try_from(record.started_at.elapsed().as_millis()).unwrap_or(u64::MAX));
        ActionStatus {
            generation,
            running: view.running,
            poll_count: view.poll_count,
            refresh_interval_secs: view.refresh_interval_secs,
            elapsed_ms,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        // Each operation leaves the record consistent before it can panic.
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn poll_locked(state: &mut CoordinatorState) -> (Generation, View) {
    match state.current.as_mut() {
        Some(record) if record.running => {
            record.poll_count = record.poll_count.saturating_add(1);
            (
                record.generation,
                View::running(record.poll_count, record.refresh_interval_secs),
            )
        }
        Some(record) => {
            record.poll_count = 0;
            (record.generation, View::IDLE)
        }
        None => (Generation::NONE, View::IDLE),
    }
}

fn view_locked(state: &CoordinatorState) -> (Generation, View) {
    match state.current.as_ref() {
        Some(record) if record.running => (
            record.generation,
            View::running(record.poll_count, record.refresh_interval_secs),
        ),
        Some(record) => (record.generation, View::IDLE),
        None => (Generation::NONE, View::IDLE),
    }
}

fn stop_locked(record: &mut ActionRecord) -> Option<Generation> {
    if !record.running {
        return None;
    }
    record.cancel.cancel();
    record.running = false;
    record.poll_count = 0;
    Some(record.generation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_before_any_action() {
        let coordinator = ActionCoordinator::new();
        assert_eq!(coordinator.poll(), View::IDLE);
        assert_eq!(coordinator.current_view(), (Generation::NONE, View::IDLE));
        assert!(!coordinator.is_running());
        assert_eq!(coordinator.status().elapsed_ms, None);
    }

    #[test]
    fn begin_supersedes_and_cancels_previous() {
        let coordinator = ActionCoordinator::new();
        let (g1, t1) = coordinator.begin(1);
        let (g2, t2) = coordinator.begin(1);

        assert!(g2 > g1);
        assert!(t1.is_cancelled());
        assert!(!t2.is_cancelled());
        assert_eq!(coordinator.current_view().0, g2);
    }

    #[test]
    fn zero_refresh_interval_is_raised() {
        let coordinator = ActionCoordinator::new();
        coordinator.begin(0);
        assert_eq!(coordinator.poll().refresh_interval_secs, MIN_REFRESH_SECS);
    }

    #[test]
    fn current_view_does_not_count() {
        let coordinator = ActionCoordinator::new();
        let (generation, _) = coordinator.begin(2);
        coordinator.poll();
        assert_eq!(coordinator.current_view(), (generation, View::running(1, 2)));
        assert_eq!(coordinator.current_view(), (generation, View::running(1, 2)));
        assert_eq!(coordinator.poll(), View::running(2, 2));
    }

    #[test]
    fn abort_stops_current_and_keeps_output() {
        let coordinator = ActionCoordinator::new();
        let (generation, token) = coordinator.begin(1);
        coordinator.sink().append(generation, "partial");

        assert_eq!(coordinator.abort(), Some(generation));
        assert!(token.is_cancelled());
        assert_eq!(coordinator.poll(), View::IDLE);
        assert_eq!(coordinator.snapshot(), "partial");
        assert_eq!(coordinator.abort(), None);
    }

    #[test]
    fn cancel_ignores_superseded_generation() {
        let coordinator = ActionCoordinator::new();
        let (g1, _) = coordinator.begin(1);
        let (g2, t2) = coordinator.begin(1);

        assert!(!coordinator.cancel(g1));
        assert!(coordinator.is_running());
        assert!(!t2.is_cancelled());

        assert!(coordinator.cancel(g2));
        assert!(t2.is_cancelled());
        assert!(!coordinator.is_running());
    }

    #[test]
    fn poll_frame_pairs_view_with_same_generation_output() {
        let coordinator = ActionCoordinator::new();
        let (g1, _) = coordinator.begin(1);
        coordinator.sink().append(g1, "one");
        let (g2, _) = coordinator.begin(1);
        coordinator.sink().append(g1, "stale");
        coordinator.sink().append(g2, "two");

        let frame = coordinator.poll_frame();
        assert_eq!(frame.generation, g2);
        assert_eq!(frame.view, View::running(1, 1));
        assert_eq!(frame.output, "two");
    }

    #[test]
    fn status_reports_without_counting() {
        let coordinator = ActionCoordinator::new();
        let (generation, _) = coordinator.begin(3);
        coordinator.poll();

        let status = coordinator.status();
        assert_eq!(status.generation, generation);
        assert!(status.running);
        assert_eq!(status.poll_count, 1);
        assert_eq!(status.refresh_interval_secs, 3);
        assert!(status.elapsed_ms.is_some());
        assert_eq!(coordinator.poll().poll_count, 2);
    }

    #[test]
    fn coordinators_do_not_share_state() {
        let first = ActionCoordinator::new();
        let second = ActionCoordinator::new();
        let (g, _) = first.begin(1);
        first.sink().append(g, "first only");

        assert!(!second.is_running());
        assert_eq!(second.snapshot(), "");
    }
}
