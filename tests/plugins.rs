use serde_json::json;
use sset::{Error, Plugin, Plugins, SSet, Value, sset};
use std::collections::BTreeMap;

/// Set `RUST_LOG=sset=trace` to see plugin lifecycle events.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Counts additions, independently of the size of the set.
struct Counter;

impl Plugin for Counter {
    type Aggregate = u64;
    type Api<'set> = u64;

    fn on_init(&self, _set: &SSet) -> u64 {
        0
    }

    fn on_add(&self, count: u64, _value: &Value) -> u64 {
        count + 1
    }

    fn query<'set>(&self, _set: &'set SSet, count: &'set u64) -> u64 {
        *count
    }
}

/// Indexes object members by their `kind` field.
struct ByKind;

impl Plugin for ByKind {
    type Aggregate = BTreeMap<String, usize>;
    type Api<'set> = KindIndex<'set>;

    fn on_init(&self, set: &SSet) -> Self::Aggregate {
        set.iter().fold(BTreeMap::new(), |index, value| self.on_add(index, value))
    }

    fn on_add(&self, mut index: Self::Aggregate, value: &Value) -> Self::Aggregate {
        if let Some(kind) = value.get("kind").and_then(Value::as_str) {
            *index.entry(kind.to_owned()).or_default() += 1;
        }
        index
    }

    fn on_remove(&self, mut index: Self::Aggregate, value: &Value) -> Self::Aggregate {
        if let Some(kind) = value.get("kind").and_then(Value::as_str) {
            if let Some(count) = index.get_mut(kind) {
                *count -= 1;
                if *count == 0 {
                    index.remove(kind);
                }
            }
        }
        index
    }

    fn query<'set>(&self, set: &'set SSet, index: &'set Self::Aggregate) -> KindIndex<'set> {
        KindIndex { set, index }
    }
}

struct KindIndex<'set> {
    set: &'set SSet,
    index: &'set BTreeMap<String, usize>,
}

impl<'set> KindIndex<'set> {
    fn count(&self, kind: &str) -> usize {
        self.index.get(kind).copied().unwrap_or(0)
    }

    fn members(&self, kind: &str) -> Vec<&'set Value> {
        self.set
            .iter()
            .filter(|v| v.get("kind").and_then(Value::as_str) == Some(kind))
            .collect()
    }
}

#[test]
fn counter_ignores_removals() {
    init_tracing();
    let mut set = SSet::new()
        .add_plugins(Plugins::new().with("counter", Counter))
        .unwrap();
    for i in 0..5 {
        set = set.add(&i).unwrap();
    }
    assert_eq!(set.query::<Counter>("counter").unwrap(), 5);

    let set = set.remove(&3).unwrap();
    assert_eq!(set.query::<Counter>("counter").unwrap(), 5);
    assert_eq!(set.len(), 4);
}

#[test]
fn duplicate_names_are_listed() {
    let set = SSet::new()
        .add_plugins(Plugins::new().with("counter", Counter).with("kinds", ByKind))
        .unwrap();

    let err = set
        .add_plugins(Plugins::new().with("counter", Counter).with("other", Counter))
        .unwrap_err();
    assert!(matches!(&err, Error::PluginAlreadyActive { names } if names == &["counter"]));
    insta::assert_snapshot!(err.to_string(), @"Plugin counter is already active");

    let err = set
        .add_plugins(Plugins::new().with("counter", Counter).with("kinds", ByKind))
        .unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"Plugins counter, kinds are already active");
}

#[test]
fn query_api_borrows_from_the_set() {
    let set = sset![
        {"kind": "cat", "name": "tom"},
        {"kind": "cat", "name": "felix"},
        {"kind": "dog", "name": "rex"},
        "not an animal",
    ]
    .add_plugins(Plugins::new().with("kinds", ByKind))
    .unwrap();

    let kinds = set.query::<ByKind>("kinds").unwrap();
    assert_eq!(kinds.count("cat"), 2);
    assert_eq!(kinds.count("dog"), 1);
    assert_eq!(kinds.members("dog"), [&json!({"kind": "dog", "name": "rex"})]);

    let fewer = set.remove(&json!({"kind": "dog", "name": "rex"})).unwrap();
    assert_eq!(fewer.query::<ByKind>("kinds").unwrap().count("dog"), 0);
    assert_eq!(set.query::<ByKind>("kinds").unwrap().count("dog"), 1);
}

#[test]
fn plugins_follow_set_algebra() {
    let animals = sset![{"kind": "cat"}, {"kind": "dog"}, {"kind": "cow"}]
        .add_plugins(Plugins::new().with("kinds", ByKind))
        .unwrap();
    let pets = sset![{"kind": "cat"}, {"kind": "dog"}];

    let farm = animals.difference(&pets);
    assert_eq!(farm, sset![{"kind": "cow"}]);
    let kinds = farm.query::<ByKind>("kinds").unwrap();
    assert_eq!(kinds.count("cow"), 1);
    assert_eq!(kinds.count("cat"), 0);
}

#[test]
fn aggregates_travel_with_the_set() {
    init_tracing();
    let set = sset![{"kind": "cat"}]
        .add_plugins(Plugins::new().with("counter", Counter).with("kinds", ByKind))
        .unwrap()
        .add(&json!({"kind": "dog"}))
        .unwrap();

    let document = set.to_json().unwrap();
    assert_eq!(document["props"]["size"], 2);
    assert_eq!(document["props"]["counter"], 1);
    assert_eq!(document["props"]["kinds"], json!({"cat": 1, "dog": 1}));

    let received = SSet::from_json(
        document,
        Plugins::new().with("counter", Counter).with("kinds", ByKind),
    )
    .unwrap();
    assert_eq!(received, set);
    assert_eq!(received.query::<Counter>("counter").unwrap(), 1);
    assert_eq!(received.query::<ByKind>("kinds").unwrap().count("cat"), 1);
}

#[test]
fn plugin_selection() {
    let set = sset![1]
        .add_plugins(Plugins::new().with("a", Counter).with("b", Counter))
        .unwrap()
        .add(&2)
        .unwrap();

    let only_b = set.only_use_plugins(Plugins::new().with("b", Counter)).unwrap();
    assert_eq!(only_b.active_plugins(), ["b"]);
    assert_eq!(only_b.query::<Counter>("b").unwrap(), 1);

    let none = set.remove_plugins(set.active_plugins()).unwrap();
    assert!(none.active_plugins().is_empty());
    assert!(matches!(
        none.remove_plugins(["a"]),
        Err(Error::PluginNotActive { names }) if names == ["a"]
    ));
}
