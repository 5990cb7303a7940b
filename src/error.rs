// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Errors raised by set operations.
//!
//! Every error is a precondition violation raised synchronously at the offending call. Since all
//! mutations are copy-on-write, the receiver of a failed call is left exactly as it was.
use crate::canonical::{CanonicalizationError, HashKey};
use std::fmt;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The ways in which an operation on an [`SSet`](crate::SSet) can fail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// [`SSet::add`](crate::SSet::add) was given a value that is already a member.
    #[error("value with hash {hash} is already contained in the set")]
    ValueAlreadyExists { hash: HashKey },

    /// A removal or lookup referred to a value that is not a member.
    #[error("no value in the set corresponds to hash {hash}")]
    ValueNotFound { hash: HashKey },

    /// [`SSet::merge`](crate::SSet::merge) was handed a whole set instead of a plain value.
    #[error("a set cannot be merged as a value; use union to combine sets")]
    InvalidMergeArgument,

    /// One or more plugins passed to `add_plugins` are already registered.
    #[error("{}", PluginNames::new("already active", .names))]
    PluginAlreadyActive { names: Vec<String> },

    /// One or more plugin names do not refer to a registered plugin.
    #[error("{}", PluginNames::new("not active", .names))]
    PluginNotActive { names: Vec<String> },

    /// A plugin was queried as a different type than the one it was registered as.
    #[error("plugin `{name}` was registered with a different type")]
    PluginTypeMismatch { name: String },

    /// The value cannot be reduced to the serialization-safe form.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    /// A serialized set declared a size that does not match its members.
    #[error("serialized set declares size {declared} but holds {actual} distinct members")]
    SizeMismatch { declared: usize, actual: usize },

    /// A set document, or a plugin aggregate within it, could not be (de)serialized.
    #[error("set document could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A graph lookup asked for a node id that no node carries.
    #[error("no node with id {id} exists in the graph")]
    NodeIdNotFound { id: serde_json::Value },
}

/// Renders `Plugin a is already active` / `Plugins a, b are already active`.
struct PluginNames<'a> {
    state: &'static str,
    names: &'a [String],
}

impl<'a> PluginNames<'a> {
    fn new(state: &'static str, names: &'a [String]) -> Self {
        Self { state, names }
    }
}

impl fmt::Display for PluginNames<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (noun, verb) = if self.names.len() > 1 {
            ("Plugins", "are")
        } else {
            ("Plugin", "is")
        };
        write!(f, "{noun} {} {verb} {}", self.names.join(", "), self.state)
    }
}
