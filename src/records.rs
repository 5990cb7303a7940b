// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Lookup of record-like members by field pattern.
//!
//! A [`RecordSet`] is an [`SSet`] whose members are expected to be JSON objects, with lookups in
//! the style of "all records whose `kind` is `"user"`". It is built only from the public set API
//! and adds no state of its own.
use crate::{Result, SSet, canonical, iter::Iter};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A set of records, searchable by field pattern.
///
/// ```rust
/// use sset::records::RecordSet;
/// use serde_json::json;
///
/// let users = RecordSet::from_values([
///     json!({"name": "ada", "role": "admin"}),
///     json!({"name": "bob", "role": "user"}),
///     json!({"name": "eve", "role": "user"}),
/// ])?;
/// assert_eq!(users.find(&json!({"role": "user"}))?.len(), 2);
/// assert_eq!(
///     users.find_one(&json!({"name": "ada"}))?,
///     Some(&json!({"name": "ada", "role": "admin"}))
/// );
/// # Ok::<(), sset::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordSet {
    inner: SSet,
}

impl From<SSet> for RecordSet {
    fn from(inner: SSet) -> Self {
        Self { inner }
    }
}

impl From<RecordSet> for SSet {
    fn from(records: RecordSet) -> Self {
        records.inner
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Value;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

/// Whether `record` contains everything in `pattern`.
///
/// Objects match when every field of the pattern is present in the record and matches in turn;
/// everything else matches only if equal.
fn matches(record: &Value, pattern: &Value) -> bool {
    match (record, pattern) {
        (Value::Object(record), Value::Object(pattern)) => pattern
            .iter()
            .all(|(field, expected)| record.get(field).is_some_and(|v| matches(v, expected))),
        (record, pattern) => record == pattern,
    }
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record set from a sequence of records. Duplicates collapse.
    pub fn from_values<I, T>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Serialize,
    {
        SSet::from_values(values).map(Self::from)
    }

    /// The underlying set.
    pub fn as_set(&self) -> &SSet {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Adds a record, failing if it is already present.
    pub fn add<T>(&self, record: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        self.inner.add(record).map(Self::from)
    }

    /// Removes a record, failing if it is not present.
    pub fn remove<T>(&self, record: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        self.inner.remove(record).map(Self::from)
    }

    pub fn has<T>(&self, record: &T) -> Result<bool>
    where
        T: Serialize + ?Sized,
    {
        self.inner.has(record)
    }

    pub fn union(&self, other: &RecordSet) -> Self {
        self.inner.union(&other.inner).into()
    }

    /// Builds a new record set from the images of all records under `f`.
    pub fn map<T, F>(&self, f: F) -> Result<Self>
    where
        T: Serialize,
        F: FnMut(&Value) -> T,
    {
        self.inner.map(f).map(Self::from)
    }

    pub fn iter(&self) -> Iter<'_> {
        self.inner.iter()
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.inner.to_vec()
    }

    /// All records that match `pattern`.
    ///
    /// A record matches if it holds every field of `pattern` with a matching value; nested
    /// objects in the pattern match partially as well. Values are compared in canonical form, so
    /// `1.0` in a pattern finds `1` in a record.
    pub fn find<T>(&self, pattern: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        let pattern = canonical::canonicalize(pattern)?;
        Ok(self.inner.filter(|record| matches(record, &pattern)).into())
    }

    /// The first record, in iteration order, that matches `pattern`.
    pub fn find_one<T>(&self, pattern: &T) -> Result<Option<&Value>>
    where
        T: Serialize + ?Sized,
    {
        let pattern = canonical::canonicalize(pattern)?;
        Ok(self.inner.find(|record| matches(record, &pattern)))
    }
}
