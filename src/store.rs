// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! The persistent member store backing every [`SSet`](crate::SSet).
//!
//! A [`Store`] is an immutable ordered map from [`HashKey`] to canonical value. Cloning a store is
//! O(1), and inserting into or removing from a clone costs O(log n): the new version shares all
//! untouched nodes with the old one, so a store that was handed out is never observed to change.
use crate::canonical::HashKey;
use imbl::OrdMap;
use serde_json::Value;

#[derive(Clone, Default)]
pub(crate) struct Store {
    members: OrdMap<HashKey, Value>,
}

impl Store {
    /// Number of members, which is by construction the cardinality of the member map.
    pub(crate) fn len(&self) -> usize {
        self.members.len()
    }

    pub(crate) fn contains(&self, key: &HashKey) -> bool {
        self.members.contains_key(key)
    }

    pub(crate) fn get(&self, key: &HashKey) -> Option<&Value> {
        self.members.get(key)
    }

    /// All keys, in ascending order.
    pub(crate) fn keys(&self) -> impl Iterator<Item = &HashKey> {
        self.members.keys()
    }

    /// Whether both stores are the same version.
    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        self.members.ptr_eq(&other.members)
    }

    /// Inserts `value` under `key` unless the key is already present.
    ///
    /// Returns whether the value was new.
    pub(crate) fn insert(&mut self, key: HashKey, value: Value) -> bool {
        if self.contains(&key) {
            return false;
        }
        self.members.insert(key, value);
        true
    }

    /// Removes the member under `key`, returning it if it was present.
    pub(crate) fn remove(&mut self, key: &HashKey) -> Option<Value> {
        if !self.contains(key) {
            return None;
        }
        self.members.remove(key)
    }

    /// All members in ascending key order.
    pub(crate) fn iter(&self) -> impl DoubleEndedIterator<Item = (&HashKey, &Value)> {
        self.members.iter()
    }
}
