use sset::{Error, SSet, SetOperation, hash_of, sset};

#[test]
fn set_algebra_on_overlapping_sets() {
    let a = sset![1, 2, 3];
    let b = sset![2, 3, 4];

    assert_eq!(a.union(&b), sset![1, 2, 3, 4]);
    assert_eq!(a.difference(&b), sset![1]);
    assert_eq!(a.intersection(&b), sset![2, 3]);
    assert_eq!(a.symmetric_difference(&b), sset![1, 4]);

    // the same, in one pass
    let all = a.combine(
        &b,
        &[
            SetOperation::Union,
            SetOperation::Difference,
            SetOperation::Intersection,
        ],
    );
    assert_eq!(all.union, Some(sset![1, 2, 3, 4]));
    assert_eq!(all.difference, Some(sset![1]));
    assert_eq!(all.intersection, Some(sset![2, 3]));
    assert_eq!(all.opposite_difference, None);

    // neither operand changed
    assert_eq!(a, sset![1, 2, 3]);
    assert_eq!(b, sset![2, 3, 4]);
}

#[test]
fn add_is_strict_and_merge_is_not() {
    let a = SSet::new().add(&1).unwrap();

    let err = a.add(&1).unwrap_err();
    assert!(matches!(err, Error::ValueAlreadyExists { hash } if hash == hash_of(&1).unwrap()));
    assert_eq!(a.len(), 1);

    let merged = a.merge(&1).unwrap();
    assert_eq!(merged.len(), 1);
    assert!(!a.merge_detailed(&1).unwrap().inserted);
}

#[test]
fn versions_are_independent() {
    let v0 = sset!["a"];
    let v1 = v0.add("b").unwrap();
    let v2 = v1.remove("a").unwrap();
    let v3 = v1.add("c").unwrap();

    assert_eq!(v0, sset!["a"]);
    assert_eq!(v1, sset!["a", "b"]);
    assert_eq!(v2, sset!["b"]);
    assert_eq!(v3, sset!["a", "b", "c"]);
}

#[test]
fn values_from_anywhere_are_the_same_member() {
    #[derive(serde::Serialize)]
    struct Point {
        x: f64,
        y: f64,
    }

    let set = SSet::new().add(&Point { x: 1.0, y: -0.0 }).unwrap();
    assert!(set.has(&serde_json::json!({"y": 0, "x": 1})).unwrap());

    let parsed: serde_json::Value = serde_json::from_str(r#"{"x": 1.0, "y": 0.0}"#).unwrap();
    assert!(matches!(set.add(&parsed), Err(Error::ValueAlreadyExists { .. })));
}

#[test]
fn unsupported_values_are_rejected() {
    let set = sset![1];
    assert!(matches!(set.add(&f64::NAN), Err(Error::Canonicalization(_))));
    assert!(matches!(set.merge(&f32::INFINITY), Err(Error::Canonicalization(_))));
    assert!(matches!(set.has(&u128::MAX), Err(Error::Canonicalization(_))));
    assert!(matches!(set.merge(&sset![2]), Err(Error::InvalidMergeArgument)));
    assert_eq!(set, sset![1]);
}

#[test]
fn diff_between_versions() {
    let before = sset![{"id": 1}, {"id": 2}, {"id": 3}];
    let after = before
        .remove(&serde_json::json!({"id": 1}))
        .unwrap()
        .add(&serde_json::json!({"id": 4}))
        .unwrap();

    let diff = before.changes_to(&after);
    assert_eq!(diff.changes.union, sset![{"id": 4}]);
    assert_eq!(diff.changes.difference, sset![{"id": 1}]);
    assert_eq!(before.apply_changes(&diff.changes), after);
    assert_eq!(after.revert_changes(&diff.changes), before);
    assert_eq!(after.changes_from(&before), diff);
}
