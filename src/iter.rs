// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Iteration and the functional helpers built on it.
//!
//! All iteration is in ascending [`HashKey`] order.
use crate::{Result, SSet, canonical::HashKey, plugin::Registry};
use serde::Serialize;
use serde_json::Value;
use std::{fmt, iter::FusedIterator};

/// An iterator over the members of an [`SSet`], in ascending [`HashKey`] order.
///
/// Created by [`SSet::iter`].
pub struct Iter<'a> {
    entries: Entries<'a>,
}

impl fmt::Debug for Iter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter")
            .field("remaining", &self.entries.remaining)
            .finish()
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.entries.next_back().map(|(_, value)| value)
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl FusedIterator for Iter<'_> {}

/// Walks the store in key order and keeps count, so both ends know how much is left.
struct Entries<'a> {
    inner: Box<dyn DoubleEndedIterator<Item = (&'a HashKey, &'a Value)> + 'a>,
    remaining: usize,
}

impl<'a> Entries<'a> {
    fn new(set: &'a SSet) -> Self {
        Self {
            inner: Box::new(set.store.iter()),
            remaining: set.len(),
        }
    }
}

impl<'a> Iterator for Entries<'a> {
    type Item = (&'a HashKey, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.inner.next()?;
        self.remaining -= 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl DoubleEndedIterator for Entries<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let entry = self.inner.next_back()?;
        self.remaining -= 1;
        Some(entry)
    }
}

impl ExactSizeIterator for Entries<'_> {}

impl<'a> IntoIterator for &'a SSet {
    type Item = &'a Value;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl SSet {
    /// Iterates over all members.
    ///
    /// ```rust
    /// use sset::sset;
    ///
    /// let set = sset![1, 2, 3];
    /// let mut sum = 0;
    /// for value in &set {
    ///     sum += value.as_i64().unwrap();
    /// }
    /// assert_eq!(sum, 6);
    /// ```
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            entries: Entries::new(self),
        }
    }

    /// The identity keys of all members, in ascending order.
    pub fn hashes(&self) -> Vec<HashKey> {
        self.store.keys().copied().collect()
    }

    /// All members together with their identity keys.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = (&HashKey, &Value)> {
        Entries::new(self)
    }

    pub fn for_each<F>(&self, f: F)
    where
        F: FnMut(&Value),
    {
        self.iter().for_each(f);
    }

    /// Builds a new set from the images of all members under `f`.
    ///
    /// Members that map to the same value collapse, so the result may be smaller than `self`. The
    /// result has no plugins. Fails if any image cannot be canonicalized, or is itself a set.
    pub fn map<T, F>(&self, f: F) -> Result<SSet>
    where
        T: Serialize,
        F: FnMut(&Value) -> T,
    {
        SSet::from_values(self.iter().map(f))
    }

    /// The members for which `predicate` holds.
    ///
    /// The result keeps this set's plugins, which observe the removal of every rejected member.
    pub fn filter<F>(&self, mut predicate: F) -> SSet
    where
        F: FnMut(&Value) -> bool,
    {
        let rejected: Vec<HashKey> = self
            .entries()
            .filter(|(_, value)| !predicate(*value))
            .map(|(key, _)| *key)
            .collect();
        let mut set = self.clone();
        for key in &rejected {
            set.remove_member(key);
        }
        set
    }

    /// Folds all members into an accumulator.
    pub fn reduce<A, F>(&self, init: A, f: F) -> A
    where
        F: FnMut(A, &Value) -> A,
    {
        self.iter().fold(init, f)
    }

    /// Whether `predicate` holds for every member. True for the empty set.
    pub fn every<F>(&self, predicate: F) -> bool
    where
        F: FnMut(&Value) -> bool,
    {
        self.iter().all(predicate)
    }

    /// Whether `predicate` holds for at least one member. False for the empty set.
    pub fn some<F>(&self, predicate: F) -> bool
    where
        F: FnMut(&Value) -> bool,
    {
        self.iter().any(predicate)
    }

    /// The first member, in iteration order, for which `predicate` holds.
    pub fn find<F>(&self, mut predicate: F) -> Option<&Value>
    where
        F: FnMut(&Value) -> bool,
    {
        self.iter().find(|value| predicate(*value))
    }

    /// All members, cloned into a vector.
    pub fn to_vec(&self) -> Vec<Value> {
        self.iter().cloned().collect()
    }

    /// Consumes this set into its members.
    pub fn into_values(self) -> Vec<Value> {
        self.to_vec()
    }

    /// A copy of this set without plugins.
    pub fn without_plugins(&self) -> SSet {
        SSet {
            store: self.store.clone(),
            plugins: Registry::default(),
        }
    }
}
