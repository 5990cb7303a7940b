// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! # SSet: A Persistent, Content-Addressed Set
//!
//! This crate provides [`SSet`], an immutable set of JSON-like values whose members are
//! identified by their *content*, not by where they came from. Two structurally equal values are
//! the same member, whether they were built in this process, parsed from the network, or read back
//! from disk.
//!
//! The primary goal of this library is to make sets that can travel: every value is reduced to a
//! serialization-safe [canonical form](canonical) before it is stored or hashed, so a set
//! serialized in one process and deserialized in another has exactly the same members, with
//! exactly the same identity keys.
//!
//! ## Core Concepts
//!
//! - **Canonical values.** Anything that implements [`serde::Serialize`] can be added to a set.
//!   On the way in, it is turned into a [`Value`] in which numbers are normalized (`1` and `1.0`
//!   are the same member), object keys are strings, and nothing that cannot survive a JSON round
//!   trip (such as `NaN`) is accepted. See [`canonical`] for the exact rules.
//! - **Identity keys.** Each member is keyed by the [`HashKey`] of its canonical form, a SHA-256
//!   digest that is stable across processes and releases of this crate. Iteration is in ascending
//!   key order.
//! - **Persistence.** Sets are never modified in place. Every modifying method takes `&self` and
//!   returns a new set; all older versions stay valid. Versions share their storage until one of
//!   them diverges, so cloning is O(1).
//! - **Plugins.** Derived state (counts, indexes, sums, ...) can be attached to a set as a
//!   [`Plugin`], which observes every member that enters or leaves and keeps an aggregate per set
//!   version. See the [`plugin`] module.
//!
//! ## Getting Started
//!
//! ```rust
//! use sset::{SSet, sset};
//! use serde_json::json;
//!
//! // 1. BUILD
//! // Literal syntax follows `serde_json::json!`.
//! let fruits = sset!["apple", "banana"];
//!
//! // 2. MODIFY
//! // Modifications return a new set and leave the receiver alone.
//! let more = fruits.add("cherry")?;
//! assert_eq!(fruits.len(), 2);
//! assert_eq!(more.len(), 3);
//!
//! // `add` insists on new values, `merge` does not.
//! assert!(more.add("cherry").is_err());
//! assert_eq!(more.merge("cherry")?, more);
//!
//! // 3. COMBINE
//! let yellow = sset!["banana", "lemon"];
//! assert_eq!(more.intersection(&yellow), sset!["banana"]);
//! assert_eq!(more.difference(&yellow), sset!["apple", "cherry"]);
//!
//! // 4. SHIP
//! // The serialized form carries the members and the set's size; identity keys are recomputed
//! // on arrival.
//! let wire = serde_json::to_string(&more)?;
//! let received: SSet = serde_json::from_str(&wire)?;
//! assert_eq!(received, more);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Set Algebra
//!
//! Binary operations ([`SSet::union`], [`SSet::intersection`], [`SSet::difference`], ...) cost
//! time proportional to the *smaller* of the two operands, and any combination of them can be
//! computed in a single traversal with [`SSet::combine`]. See the [`algebra`] module.
//!
//! ## Diffs
//!
//! [`SSet::changes_to`] describes the difference between two versions of a set as two sets: the
//! members to add and the members to remove. [`Changes`] can be serialized, applied with
//! [`SSet::apply_changes`] and undone with [`SSet::revert_changes`]. See the [`diff`] module.
//!
//! ## Records and Graphs
//!
//! Two small layers on top of the public set API are included: [`records::RecordSet`] finds
//! object members by field pattern, and [`graph::Graph`] keeps nodes and edges in two record
//! sets with id-based traversal.
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events at `debug` and `trace` level only (plugin lifecycle,
//! reconstruction from serialized form, operand selection in set algebra). It never installs a
//! subscriber.
//!
//! ## License
//!
//! This project is licensed under either of
//!
//! - Apache License, Version 2.0, ([LICENSE-APACHE](LICENSE-APACHE) or http://www.apache.org/licenses/LICENSE-2.0)
//! - MIT license ([LICENSE-MIT](LICENSE-MIT) or http://opensource.org/licenses/MIT)
//!
//! at your option.
//!
//! ## Features
//!
//! - `arbitrary`: Implements `quickcheck::Arbitrary` for [`SSet`] and for a small generator of
//!   canonical values, useful for property-based testing.
#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

pub mod algebra;
pub use algebra::{Combined, SetOperation};
#[cfg(any(test, feature = "arbitrary"))]
pub mod arbitrary;
pub mod canonical;
pub use canonical::{CanonicalizationError, HashKey, canonicalize, hash_of, normalize};
pub mod diff;
pub use diff::{Changes, Diff};
mod error;
pub use error::{Error, Result};
pub mod graph;
pub mod iter;
pub mod macros;
pub mod plugin;
pub use plugin::{Plugin, Plugins};
pub mod records;
mod serialization;
mod set;
pub use set::{MergeOutcome, SSet};
mod store;

pub use serde_json::Value;

#[doc(hidden)]
pub mod __private {
    use crate::SSet;
    use serde_json::Value;

    pub use serde_json;

    /// Builds the set behind [`sset!`](crate::sset).
    pub fn from_array(value: Value) -> SSet {
        match value {
            Value::Array(elements) => elements.into_iter().collect(),
            other => std::iter::once(other).collect(),
        }
    }
}
