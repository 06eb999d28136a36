//! Aggregate result of applying a node tree.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Counts of items applied and skipped while ingesting one node tree.
///
/// A non-zero failure count does not undo the applied items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    applied: usize,
    failed: usize,
}

impl IngestOutcome {
    /// Creates an outcome from raw counts.
    #[must_use]
    pub const fn new(applied: usize, failed: usize) -> Self {
        Self { applied, failed }
    }

    pub(crate) const fn applied_item() -> Self {
        Self::new(1, 0)
    }

    pub(crate) const fn failed_item() -> Self {
        Self::new(0, 1)
    }

    /// Items handed to a collaborator or forwarded.
    #[must_use]
    pub const fn applied(&self) -> usize {
        self.applied
    }

    /// Items skipped because they were malformed or rejected.
    #[must_use]
    pub const fn failed(&self) -> usize {
        self.failed
    }

    /// Whether nothing was skipped.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

impl Add for IngestOutcome {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.applied.saturating_add(rhs.applied),
            self.failed.saturating_add(rhs.failed),
        )
    }
}

impl AddAssign for IngestOutcome {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for IngestOutcome {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}
