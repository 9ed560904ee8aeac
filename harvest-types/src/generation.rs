//! Generation tokens for optimistic mutations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A monotonically increasing counter scoped to one (entity, field) pair.
///
/// Every optimistic mutation takes the next generation for each field it
/// touches. A settlement whose generation is no longer the latest for a field
/// is stale and must not change that field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    /// The generation of a field that has never been mutated.
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Returns the generation that supersedes this one.
    #[must_use]
    pub const fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}
