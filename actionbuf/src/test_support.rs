//! Test-only helpers for driving coordinators and spawned actions.

use std::time::Duration;

use crate::core::ActionCoordinator;

/// Wait until `coordinator` reports idle, polling every few milliseconds.
///
/// Returns `false` if it is still running after `timeout`. Uses Tokio time, so
/// paused-clock tests advance through the wait instantly.
pub async fn wait_until_idle(coordinator: &ActionCoordinator, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while coordinator.is_running() {
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    true
}

/// Split sink output into its non-empty lines.
pub fn record_lines(output: &str) -> Vec<&str> {
    output.lines().filter(|line| !line.is_empty()).collect()
}
