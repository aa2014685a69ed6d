//! Action lifecycle core: generations, the output sink, cancellation, and the
//! coordinator that ties them together.
//!
//! Core modules perform no I/O. Background execution lives in [`crate::worker`].

pub mod cancel;
pub mod coordinator;
pub mod generation;
pub mod sink;
pub mod view;

pub use cancel::{CancelHandle, CancelToken, cancel_signal};
pub use coordinator::{ActionCoordinator, MIN_REFRESH_SECS};
pub use generation::{Generation, GenerationCounter};
pub use sink::{BufferEntry, OutputSink};
pub use view::{ActionStatus, Frame, View};
