// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Structural diffs between two set versions.
//!
//! A [`Diff`] records which members have to be added ([`Changes::union`]) and which removed
//! ([`Changes::difference`]) to turn one set into another. [`Changes`] are sets themselves, and
//! can be serialized and shipped to another process that holds a copy of the source set:
//!
//! ```rust
//! use sset::sset;
//!
//! let a = sset![1, 2, 3];
//! let b = sset![2, 3, 4];
//!
//! let diff = a.changes_to(&b);
//! assert_eq!(diff.changes.union, sset![4]);
//! assert_eq!(diff.changes.difference, sset![1]);
//!
//! assert_eq!(a.apply_changes(&diff.changes), b);
//! assert_eq!(b.revert_changes(&diff.changes), a);
//! ```
use crate::SSet;
use serde::{Deserialize, Serialize};

/// The members to add and to remove to get from one set to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changes {
    /// Members of the target that the source lacks.
    pub union: SSet,
    /// Members of the source that the target lacks.
    pub difference: SSet,
}

/// The [`Changes`] between two sets, together with the two sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff {
    pub from: SSet,
    pub to: SSet,
    pub changes: Changes,
}

impl Changes {
    /// Whether applying these changes would be a no-op.
    pub fn is_empty(&self) -> bool {
        self.union.is_empty() && self.difference.is_empty()
    }
}

impl SSet {
    /// Computes the changes that turn `self` into `target`.
    pub fn changes_to(&self, target: &SSet) -> Diff {
        let (difference, union) = self.both_differences(target);
        Diff {
            from: self.clone(),
            to: target.clone(),
            changes: Changes { union, difference },
        }
    }

    /// Computes the changes that turn `source` into `self`.
    pub fn changes_from(&self, source: &SSet) -> Diff {
        source.changes_to(self)
    }

    /// Adds `changes.union` to, then removes `changes.difference` from, a copy of this set.
    pub fn apply_changes(&self, changes: &Changes) -> SSet {
        self.union(&changes.union).difference(&changes.difference)
    }

    /// Undoes `changes`: adds `changes.difference` to, then removes `changes.union` from, a copy
    /// of this set.
    pub fn revert_changes(&self, changes: &Changes) -> SSet {
        self.union(&changes.difference).difference(&changes.union)
    }
}
