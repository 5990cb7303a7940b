// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use crate::{
    Error, Result,
    canonical::{self, CanonicalizationError, HashKey},
    plugin::Registry,
    store::Store,
};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// A persistent set of canonical values, identified by content rather than by reference.
///
/// Every value is [canonicalized](crate::canonical) on the way in, and members are keyed by the
/// [`HashKey`] of their canonical form: two structurally equal values are the same member no
/// matter where they came from.
///
/// `SSet` is immutable. Every modifying method takes `&self` and returns a new set; the receiver
/// stays valid and unchanged, and so does every other set that shares members with it. Cloning is
/// cheap (reference-counted), so is passing sets between threads.
///
/// Iteration is in ascending [`HashKey`] order, which is the same in every process but otherwise
/// unrelated to the order in which values were inserted.
///
/// ```rust
/// use sset::{SSet, sset};
///
/// let a = sset![1, 2, 3];
/// let b = a.add(&4)?;
/// assert_eq!(a.len(), 3);
/// assert_eq!(b.len(), 4);
/// assert!(b.has(&4.0)?);
///
/// let c = b.remove(&4)?;
/// assert_eq!(a, c);
/// # Ok::<(), sset::Error>(())
/// ```
#[derive(Clone, Default)]
pub struct SSet {
    pub(crate) store: Store,
    pub(crate) plugins: Registry,
}

/// The result of [`SSet::merge_detailed`].
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The set after the merge.
    pub set: SSet,
    /// Whether the merged value was not a member before.
    pub inserted: bool,
}

impl fmt::Debug for SSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.plugins.is_empty() {
            f.debug_set().entries(self.iter()).finish()
        } else {
            f.debug_struct("SSet")
                .field("members", &Members(self))
                .field("plugins", &self.plugins)
                .finish()
        }
    }
}

struct Members<'a>(&'a SSet);

impl fmt::Debug for Members<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.iter()).finish()
    }
}

/// Two sets are equal when they hold the same members. Attached plugins are not compared.
impl PartialEq for SSet {
    fn eq(&self, other: &Self) -> bool {
        self.store.ptr_eq(&other.store)
            || (self.len() == other.len() && self.store.keys().all(|k| other.store.contains(k)))
    }
}

impl Eq for SSet {}

fn merge_argument(err: CanonicalizationError) -> Error {
    if err.is_set_as_value() {
        Error::InvalidMergeArgument
    } else {
        err.into()
    }
}

impl SSet {
    /// Creates an empty set without plugins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from a sequence of values. Duplicates collapse into a single member.
    ///
    /// Fails if any of the values cannot be canonicalized.
    pub fn from_values<I, T>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Serialize,
    {
        let mut set = Self::new();
        for value in values {
            let (key, value) = canonical::keyed(&value, true).map_err(merge_argument)?;
            set.insert_member(key, value);
        }
        Ok(set)
    }

    /// The number of members.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `value` is a member.
    ///
    /// Fails only if `value` cannot be canonicalized.
    pub fn has<T>(&self, value: &T) -> Result<bool>
    where
        T: Serialize + ?Sized,
    {
        let key = canonical::hash_of(value)?;
        Ok(self.has_hash(&key))
    }

    /// Whether a member with the given identity key exists.
    pub fn has_hash(&self, key: &HashKey) -> bool {
        self.store.contains(key)
    }

    /// Returns the member with the given identity key.
    pub fn get_by_hash(&self, key: &HashKey) -> Result<&Value> {
        self.store
            .get(key)
            .ok_or(Error::ValueNotFound { hash: *key })
    }

    /// Adds a value that must not already be a member.
    ///
    /// Fails with [`Error::ValueAlreadyExists`] if it is; use [`SSet::merge`] to add a value
    /// regardless.
    pub fn add<T>(&self, value: &T) -> Result<SSet>
    where
        T: Serialize + ?Sized,
    {
        let (key, value) = canonical::keyed(value, false)?;
        if self.has_hash(&key) {
            return Err(Error::ValueAlreadyExists { hash: key });
        }
        let mut set = self.clone();
        set.insert_member(key, value);
        Ok(set)
    }

    /// Adds a value unless it is already a member.
    ///
    /// Fails with [`Error::InvalidMergeArgument`] if `value` is itself an [`SSet`]; sets are
    /// combined with [`SSet::union`].
    pub fn merge<T>(&self, value: &T) -> Result<SSet>
    where
        T: Serialize + ?Sized,
    {
        self.merge_detailed(value).map(|outcome| outcome.set)
    }

    /// Like [`SSet::merge`], but also reports whether the value was new.
    pub fn merge_detailed<T>(&self, value: &T) -> Result<MergeOutcome>
    where
        T: Serialize + ?Sized,
    {
        let (key, value) = canonical::keyed(value, true).map_err(merge_argument)?;
        let mut set = self.clone();
        let inserted = set.insert_member(key, value);
        Ok(MergeOutcome { set, inserted })
    }

    /// Merges every value of a sequence, as by repeated [`SSet::merge`].
    ///
    /// Plugins observe the new members in ascending [`HashKey`] order, not in the order of
    /// `values`. Fails without a partial result if any value is rejected.
    pub fn merge_all<I, T>(&self, values: I) -> Result<SSet>
    where
        I: IntoIterator<Item = T>,
        T: Serialize,
    {
        let mut batch = values
            .into_iter()
            .map(|value| canonical::keyed(&value, true).map_err(merge_argument))
            .collect::<Result<Vec<_>>>()?;
        batch.sort_unstable_by_key(|(key, _)| *key);
        let mut set = self.clone();
        for (key, value) in batch {
            set.insert_member(key, value);
        }
        Ok(set)
    }

    /// Removes a member.
    ///
    /// Fails with [`Error::ValueNotFound`] if `value` is not a member.
    pub fn remove<T>(&self, value: &T) -> Result<SSet>
    where
        T: Serialize + ?Sized,
    {
        let key = canonical::hash_of(value)?;
        let mut set = self.clone();
        match set.remove_member(&key) {
            Some(_) => Ok(set),
            None => Err(Error::ValueNotFound { hash: key }),
        }
    }

    /// Whether every member of `self` is a member of `other`.
    pub fn is_subset(&self, other: &SSet) -> bool {
        self.difference(other).is_empty()
    }

    /// Whether every member of `other` is a member of `self`.
    pub fn is_superset(&self, other: &SSet) -> bool {
        other.difference(self).is_empty()
    }

    /// Whether `self` and `other` share no members.
    pub fn is_disjoint(&self, other: &SSet) -> bool {
        self.intersection(other).is_empty()
    }

    /// Whether both sets hold the same members, decided by their symmetric difference.
    ///
    /// Agrees with `==`, which takes a shortcut.
    pub fn equals(&self, other: &SSet) -> bool {
        self.symmetric_difference(other).is_empty()
    }

    /// Inserts a canonical value in place, notifying plugins if it is new.
    pub(crate) fn insert_member(&mut self, key: HashKey, value: Value) -> bool {
        if self.store.contains(&key) {
            return false;
        }
        self.plugins.notify_add(&value);
        self.store.insert(key, value)
    }

    /// Removes a member in place, notifying plugins if it was present.
    pub(crate) fn remove_member(&mut self, key: &HashKey) -> Option<Value> {
        let removed = self.store.remove(key)?;
        self.plugins.notify_remove(&removed);
        Some(removed)
    }
}

/// Collects JSON values into a set.
///
/// This cannot fail: every [`Value`] has a canonical form.
impl FromIterator<Value> for SSet {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut set = Self::new();
        for value in iter {
            let value = canonical::normalize(value);
            set.insert_member(canonical::digest(&value), value);
        }
        set
    }
}
