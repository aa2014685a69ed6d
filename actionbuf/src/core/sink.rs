//! Generation-tagged output buffer.
//!
//! Workers append text tagged with the generation that produced it. Reads only
//! ever see the entries of one generation, so a slow superseded worker can keep
//! writing without corrupting what its successor displays.

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::generation::Generation;

/// One append, immutable once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferEntry {
    pub generation: Generation,
    pub text: String,
}

#[derive(Debug, Default)]
struct SinkState {
    current: Generation,
    entries: Vec<BufferEntry>,
}

/// Append-only text store filtered by generation on read.
#[derive(Debug, Default)]
pub struct OutputSink {
    state: Mutex<SinkState>,
}

impl OutputSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `text` under `generation`.
    ///
    /// Stale generations are accepted and stored; [`OutputSink::snapshot`] filters them out.
    pub fn append(&self, generation: Generation, text: impl Into<String>) {
        let text = text.into();
        self.lock().entries.push(BufferEntry { generation, text });
    }

    /// Concatenate the entries written under `generation`, in append order.
    pub fn snapshot(&self, generation: Generation) -> String {
        let state = self.lock();
        collect_text(&state.entries, generation)
    }

    /// Concatenate the entries of the currently visible generation.
    pub fn snapshot_current(&self) -> String {
        let state = self.lock();
        collect_text(&state.entries, state.current)
    }

    pub fn current_generation(&self) -> Generation {
        self.lock().current
    }

    /// Make `generation` the visible one and drop entries strictly older than it.
    ///
    /// The visible generation never moves backwards: resetting to an older
    /// generation than the current one is ignored.
    pub fn reset_to(&self, generation: Generation) {
        let mut state = self.lock();
        if generation < state.current {
            return;
        }
        state.current = generation;
        state.entries.retain(|entry| entry.generation >= generation);
    }

    /// Number of stored entries, including stale ones not yet dropped.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        // Every mutation leaves the state consistent, so a poisoned lock is safe to reuse.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn collect_text(entries: &[BufferEntry], generation: Generation) -> String {
    entries
        .iter()
        .filter(|entry| entry.generation == generation)
        .map(|entry| entry.text.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::core::generation::GenerationCounter;

    #[test]
    fn snapshot_filters_by_generation() {
        let counter = GenerationCounter::new();
        let g1 = counter.next();
        let g2 = counter.next();
        let sink = OutputSink::new();

        sink.append(g1, "a");
        sink.append(g2, "b");
        sink.append(g1, "c");

        assert_eq!(sink.snapshot(g1), "ac");
        assert_eq!(sink.snapshot(g2), "b");
    }

    #[test]
    fn reset_hides_and_drops_older_entries() {
        let counter = GenerationCounter::new();
        let g1 = counter.next();
        let g2 = counter.next();
        let sink = OutputSink::new();

        sink.reset_to(g1);
        sink.append(g1, "old");
        assert_eq!(sink.snapshot_current(), "old");

        sink.reset_to(g2);
        assert_eq!(sink.snapshot_current(), "");
        assert!(sink.is_empty());

        // A late write from g1 is stored but never visible.
        sink.append(g1, "late");
        sink.append(g2, "new");
        assert_eq!(sink.snapshot_current(), "new");
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn reset_keeps_entries_of_target_generation() {
        let counter = GenerationCounter::new();
        let g1 = counter.next();
        let sink = OutputSink::new();

        // Worker output can arrive before the reset lands.
        sink.append(g1, "early ");
        sink.reset_to(g1);
        sink.append(g1, "later");
        assert_eq!(sink.snapshot_current(), "early later");
    }

    #[test]
    fn reset_never_moves_backwards() {
        let counter = GenerationCounter::new();
        let g1 = counter.next();
        let g2 = counter.next();
        let sink = OutputSink::new();

        sink.reset_to(g2);
        sink.append(g2, "kept");
        sink.reset_to(g1);

        assert_eq!(sink.current_generation(), g2);
        assert_eq!(sink.snapshot_current(), "kept");
    }

    #[test]
    fn concurrent_appends_are_all_kept_in_order_per_writer() {
        let counter = GenerationCounter::new();
        let g1 = counter.next();
        let sink = Arc::new(OutputSink::new());
        sink.reset_to(g1);

        thread::scope(|scope| {
            for writer in 0..4 {
                let sink = Arc::clone(&sink);
                scope.spawn(move || {
                    for i in 0..50 {
                        sink.append(g1, format!("{writer}:{i};"));
                    }
                });
            }
        });

        let output = sink.snapshot_current();
        for writer in 0..4 {
            let seen: Vec<usize> = output
                .split(';')
                .filter_map(|item| item.strip_prefix(&format!("{writer}:")))
                .map(|n| n.parse().expect("index"))
                .collect();
            assert_eq!(seen, (0..50).collect::<Vec<_>>());
        }
    }
}
