// (c) Copyright 2025 Helsing GmbH. All rights reserved.
/// Convenience macro for creating a set from JSON-like literals.
///
/// Takes the same syntax as the elements of a [`serde_json::json!`] array. Since JSON values are
/// always canonicalizable, this cannot fail; duplicates collapse as with any other set
/// construction.
///
/// ```rust
/// # use sset::sset;
/// let set = sset![1, 1.0, "one", {"one": [1]}, null];
/// assert_eq!(set.len(), 4);
/// assert!(sset![].is_empty());
/// ```
///
/// NOTE! `json!` turns non-finite floats into `null` rather than rejecting them. Use
/// [`SSet::from_values`](crate::SSet::from_values) to have them rejected.
#[macro_export]
macro_rules! sset {
    ($($element:tt)*) => {
        $crate::__private::from_array($crate::__private::serde_json::json!([$($element)*]))
    };
}
