//! Monotonic action generations.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Identifier for one action's lifetime. Larger values are newer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    /// Held before any action has begun. Never issued by [`GenerationCounter`].
    pub const NONE: Generation = Generation(0);

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Issues strictly increasing generations, starting at 1.
#[derive(Debug, Default)]
pub struct GenerationCounter {
    last: AtomicU64,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically advance the counter and return the new generation.
    pub fn next(&self) -> Generation {
        Generation(self.last.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Most recently issued generation ([`Generation::NONE`] if none yet).
    pub fn last(&self) -> Generation {
        Generation(self.last.load(Ordering::Acquire))
    }
}
