//! Cooperative cancellation for background actions.
//!
//! Cancellation is advisory. A worker that never checks its token still cannot
//! change what readers see once its generation is superseded; the signal only
//! lets it stop wasting work early.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Shared {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Worker-side view of a cancellation request.
#[derive(Debug, Clone)]
pub struct CancelToken {
    shared: Arc<Shared>,
}

/// Coordinator-side trigger paired with a [`CancelToken`].
#[derive(Debug)]
pub struct CancelHandle {
    shared: Arc<Shared>,
}

/// Create a connected token/handle pair.
pub fn cancel_signal() -> (CancelToken, CancelHandle) {
    let shared = Arc::new(Shared::default());
    (
        CancelToken {
            shared: Arc::clone(&shared),
        },
        CancelHandle { shared },
    )
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }

    /// Resolve once cancellation has been requested.
    pub async fn cancelled(&self) {
        loop {
            // Register interest before checking the flag so a concurrent
            // `cancel` between the check and the await is not missed.
            let notified = self.shared.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl CancelHandle {
    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        if !self.shared.cancelled.swap(true, Ordering::SeqCst) {
            self.shared.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }
}
