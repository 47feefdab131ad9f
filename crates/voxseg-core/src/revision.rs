//! Process-wide modification clock.
//!
//! Mutable model objects carry a [`Revision`] stamp taken from a monotonic
//! counter. Comparing stamps answers "has A been modified since B was
//! computed" without wall-clock time.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic modification counter shared by the whole process.
///
/// Starts at 1 so that the default stamp (0) always reads as "never
/// modified" and compares older than any real stamp.
static CLOCK: AtomicU64 = AtomicU64::new(1);

/// Returns the next tick of the modification clock.
pub fn tick() -> u64 {
    CLOCK.fetch_add(1, Ordering::Relaxed)
}

/// A modification stamp.
///
/// `Revision::default()` is older than every stamp produced by [`tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Revision(u64);

impl Revision {
    /// Creates a stamp at the current clock tick.
    #[must_use]
    pub fn now() -> Self {
        Self(tick())
    }

    /// Advances this stamp to the current clock tick.
    pub fn touch(&mut self) {
        self.0 = tick();
    }

    /// Returns the raw counter value.
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }

    /// Returns true if this stamp is strictly newer than `other`.
    #[must_use]
    pub fn is_newer_than(self, other: Revision) -> bool {
        self.0 > other.0
    }
}
