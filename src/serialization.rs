// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! The serialized form of a set.
//!
//! A set serializes as a document with two fields:
//!
//! ```json
//! { "props": { "size": 2, "<plugin>": <aggregate>, ... }, "state": [<member>, ...] }
//! ```
//!
//! `state` lists the members in ascending [`HashKey`](crate::HashKey) order, but readers must not
//! depend on that order. Identity keys are never transmitted: the receiving side recomputes them
//! from the members.
//!
//! The serde impls on [`SSet`] round-trip the members only, since a [`Deserialize`] impl has no
//! way of knowing which plugins to re-attach. Use [`SSet::from_json`] to restore plugins along
//! with their aggregates.
use crate::{
    Error, Plugins, Result, SSet,
    canonical::{self, SET_TOKEN},
    plugin::RESERVED_NAME,
};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de,
    ser::{self, SerializeMap, SerializeStruct},
};
use serde_json::{Map, Value};

impl Serialize for SSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // the token lets the canonicalizer tell a whole set apart from any other value
        serializer.serialize_newtype_struct(SET_TOKEN, &DocumentRef(self))
    }
}

struct DocumentRef<'a>(&'a SSet);

impl Serialize for DocumentRef<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut document = serializer.serialize_struct("SSet", 2)?;
        document.serialize_field("props", &PropsRef(self.0))?;
        document.serialize_field("state", &StateRef(self.0))?;
        document.end()
    }
}

struct PropsRef<'a>(&'a SSet);

impl Serialize for PropsRef<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let set = self.0;
        let mut props = serializer.serialize_map(Some(1 + set.plugins.names().count()))?;
        props.serialize_entry(RESERVED_NAME, &set.len())?;
        for (name, active) in set.plugins.iter() {
            let aggregate = active.aggregate_json().map_err(ser::Error::custom)?;
            props.serialize_entry(name, &aggregate)?;
        }
        props.end()
    }
}

struct StateRef<'a>(&'a SSet);

impl Serialize for StateRef<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.0.iter())
    }
}

#[derive(Deserialize)]
struct Document {
    props: Props,
    state: Vec<Value>,
}

#[derive(Deserialize)]
struct Props {
    size: usize,
    #[serde(flatten)]
    plugins: Map<String, Value>,
}

impl Document {
    /// Rebuilds the members, checking them against the declared size.
    fn into_set(self) -> Result<(SSet, Map<String, Value>)> {
        let mut set = SSet::new();
        for value in self.state {
            let (key, value) = canonical::keyed(&value, false)?;
            set.insert_member(key, value);
        }
        tracing::trace!(members = set.len(), "reconstructed set from document");
        if set.len() != self.props.size {
            return Err(Error::SizeMismatch {
                declared: self.props.size,
                actual: set.len(),
            });
        }
        Ok((set, self.props.plugins))
    }
}

impl<'de> Deserialize<'de> for SSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let document = Document::deserialize(deserializer)?;
        let (set, _) = document.into_set().map_err(de::Error::custom)?;
        Ok(set)
    }
}

impl SSet {
    /// Serializes this set, including the aggregates of all attached plugins.
    ///
    /// ```rust
    /// use sset::sset;
    /// use serde_json::json;
    ///
    /// assert_eq!(
    ///     sset!["a"].to_json()?,
    ///     json!({"props": {"size": 1}, "state": ["a"]})
    /// );
    /// # Ok::<(), sset::Error>(())
    /// ```
    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Reconstructs a set from its serialized form and attaches `plugins` to it.
    ///
    /// Each plugin whose aggregate is present in the document's `props` gets that aggregate back
    /// as is; the others are initialized over the reconstructed members. Aggregates of plugins not
    /// in `plugins` are ignored.
    ///
    /// Fails with [`Error::SizeMismatch`] if the document's `size` does not match the number of
    /// distinct members in its `state`.
    pub fn from_json(document: Value, plugins: Plugins) -> Result<SSet> {
        let document: Document = serde_json::from_value(document)?;
        let (set, mut props) = document.into_set()?;
        tracing::debug!(
            members = set.len(),
            plugins = plugins.len(),
            "restoring set from document"
        );
        set.restore_plugins(plugins, &mut props)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        plugin::test::{Counter, Longest},
        sset,
    };
    use serde_json::json;

    #[test]
    fn document_shape() {
        let set = sset!["a", 1, [1]]
            .add_plugins(Plugins::new().with("counter", Counter))
            .unwrap()
            .add(&2)
            .unwrap();
        insta::assert_snapshot!(serde_json::to_string_pretty(&set).unwrap(), @r#"
        {
          "props": {
            "size": 4,
            "counter": 1
          },
          "state": [
            2,
            "a",
            1,
            [
              1
            ]
          ]
        }
        "#);
    }

    #[test]
    fn round_trip_without_plugins() {
        let set = sset![{"id": 1, "tags": ["x"]}, "two", 3.5, null];
        let wire = serde_json::to_string(&set).unwrap();
        let back: SSet = serde_json::from_str(&wire).unwrap();
        assert_eq!(back, set);
        assert_eq!(back.hashes(), set.hashes());
    }

    #[test]
    fn deserialize_drops_unknown_aggregates() {
        let back: SSet = serde_json::from_value(json!({
            "props": {"size": 1, "counter": 7},
            "state": [1],
        }))
        .unwrap();
        assert!(back.active_plugins().is_empty());
        assert_eq!(back, sset![1]);
    }

    #[test]
    fn from_json_restores_aggregates() {
        let set = SSet::new()
            .add_plugins(Plugins::new().with("counter", Counter))
            .unwrap()
            .add("x")
            .unwrap()
            .add("yy")
            .unwrap();
        let document = set.to_json().unwrap();

        let back = SSet::from_json(
            document,
            Plugins::new().with("counter", Counter).with("longest", Longest),
        )
        .unwrap();
        assert_eq!(back, set);
        // restored, not recomputed by `on_init`
        assert_eq!(back.query::<Counter>("counter").unwrap(), 2);
        // absent from the document, so initialized
        assert_eq!(back.query::<Longest>("longest").unwrap(), Some("yy"));
    }

    #[test]
    fn size_is_checked() {
        let err = SSet::from_json(
            json!({"props": {"size": 2}, "state": [1, 1.0]}),
            Plugins::new(),
        )
        .unwrap_err();
        insta::assert_snapshot!(
            err.to_string(),
            @"serialized set declares size 2 but holds 1 distinct members"
        );

        let err = serde_json::from_value::<SSet>(json!({"props": {"size": 0}, "state": [1]}))
            .unwrap_err();
        assert!(err.to_string().contains("declares size 0"));
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(matches!(
            SSet::from_json(json!({"state": []}), Plugins::new()),
            Err(Error::Serialization(_))
        ));
        assert!(matches!(
            SSet::from_json(
                json!({"props": {"size": 0, "counter": "many"}, "state": []}),
                Plugins::new().with("counter", Counter),
            ),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn nested_sets_hash_as_their_document() {
        let inner = sset![1, 2];
        let outer = sset![].add(&inner).unwrap();
        assert!(outer.has(&inner.to_json().unwrap()).unwrap());
    }

    #[quickcheck]
    fn serialization_round_trip(set: SSet) -> bool {
        let wire = serde_json::to_vec(&set).unwrap();
        let back: SSet = serde_json::from_slice(&wire).unwrap();
        back.equals(&set)
    }
}
