// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Implementations of [`quickcheck::Arbitrary`] for sets and their members.
use crate::{SSet, canonical};
use quickcheck::{Arbitrary, Gen};
use serde_json::{Map, Value};

/// A canonical JSON value drawn from a deliberately small domain.
///
/// Small integers, short strings over a two-letter alphabet and shallow containers make it likely
/// that independently generated sets share members, which is where set algebra gets interesting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalValue(pub Value);

fn pick(g: &mut Gen, n: usize) -> usize {
    usize::arbitrary(g) % n
}

fn scalar(g: &mut Gen) -> Value {
    match pick(g, 6) {
        0 => Value::Null,
        1 => Value::Bool(bool::arbitrary(g)),
        2 => Value::from(i64::from(i8::arbitrary(g) % 8)),
        3 => Value::from(f64::from(i8::arbitrary(g)) / 4.0),
        _ => {
            let len = pick(g, 4);
            Value::String((0..len).map(|_| if bool::arbitrary(g) { 'a' } else { 'b' }).collect())
        }
    }
}

fn value(g: &mut Gen, depth: usize) -> Value {
    if depth == 0 {
        return scalar(g);
    }
    match pick(g, 8) {
        0 => Value::Array((0..pick(g, 3)).map(|_| value(g, depth - 1)).collect()),
        1 => {
            let mut map = Map::new();
            for _ in 0..pick(g, 3) {
                let key = if bool::arbitrary(g) { "x" } else { "y" };
                map.insert(key.to_owned(), value(g, depth - 1));
            }
            Value::Object(map)
        }
        _ => scalar(g),
    }
}

impl Arbitrary for CanonicalValue {
    fn arbitrary(g: &mut Gen) -> Self {
        Self(canonical::normalize(value(g, 2)))
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        match &self.0 {
            Value::Array(items) => Box::new(items.clone().into_iter().map(Self)),
            Value::Object(map) => Box::new(map.clone().into_iter().map(|(_, v)| Self(v))),
            Value::Null => quickcheck::empty_shrinker(),
            _ => quickcheck::single_shrinker(Self(Value::Null)),
        }
    }
}

impl Arbitrary for SSet {
    fn arbitrary(g: &mut Gen) -> Self {
        let size = g.size().max(1);
        let len = pick(g, size);
        (0..len).map(|_| CanonicalValue::arbitrary(g).0).collect()
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        // drop one member at a time
        let set = self.clone();
        Box::new(self.hashes().into_iter().map(move |key| {
            let mut smaller = set.clone();
            smaller.remove_member(&key);
            smaller
        }))
    }
}
