//! Generation-safe progress reporting for long-running actions observed by
//! page-refresh polling.
//!
//! A host starts an action, a background worker streams text into a shared
//! buffer, and clients re-fetch a display page until the action finishes. The
//! crate keeps that loop correct when actions are started on top of each other:
//!
//! - **[`core`]**: Pure, synchronous state (generations, output sink,
//!   cancellation, the coordinator). No I/O.
//! - **[`worker`]**: Spawns and supervises workers on Tokio so every exit path
//!   reports completion.
//! - **[`io`]**: Host configuration on disk.

pub mod core;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod worker;

pub use crate::core::{ActionCoordinator, Frame, Generation, View};
pub use crate::worker::{ActionContext, ActionExit, SpawnedAction, spawn_action};
