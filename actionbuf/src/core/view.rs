//! Read-only projections of coordinator state handed to renderers.

use std::time::Duration;

use serde::Serialize;

use super::generation::Generation;

/// What a display request needs to render a refresh directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct View {
    pub running: bool,
    pub poll_count: u32,
    pub refresh_interval_secs: u32,
}

impl View {
    /// Projection of an idle coordinator: no polling, no refresh.
    pub const IDLE: View = View {
        running: false,
        poll_count: 0,
        refresh_interval_secs: 0,
    };

    pub fn running(poll_count: u32, refresh_interval_secs: u32) -> Self {
        Self {
            running: true,
            poll_count,
            refresh_interval_secs,
        }
    }

    /// Delay a client should wait before re-fetching, or `None` when idle.
    pub fn refresh_after(&self) -> Option<Duration> {
        self.running
            .then(|| Duration::from_secs(u64::from(self.refresh_interval_secs)))
    }

    /// Label used by layouts: `Running` or `Stopped`.
    pub fn polling_label(&self) -> &'static str {
        if self.running { "Running" } else { "Stopped" }
    }
}

/// A poll result paired with the output of the same generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub generation: Generation,
    pub view: View,
    pub output: String,
}

/// Non-counting status summary for JSON consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionStatus {
    pub generation: Generation,
    pub running: bool,
    pub poll_count: u32,
    pub refresh_interval_secs: u32,
    /// Milliseconds since the current action began, if one ever has.
    pub elapsed_ms: Option<u64>,
}
