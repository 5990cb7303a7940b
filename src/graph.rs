// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! A directed graph stored as two sets of records.
//!
//! Nodes and edges are arbitrary JSON objects. Nodes are identified by their `id` field; edges by
//! their own `id` field and connect the node ids found in `from` and `to`. Like everything else in
//! this crate, a [`Graph`] is immutable: all operations return a new graph.
//!
//! ```rust
//! use sset::graph::{Graph, GraphParts};
//! use serde_json::json;
//!
//! let graph = Graph::from_parts(GraphParts {
//!     nodes: vec![json!({"id": "a"}), json!({"id": "b"}), json!({"id": "c"})],
//!     edges: vec![
//!         json!({"id": 1, "from": "a", "to": "b"}),
//!         json!({"id": 2, "from": "a", "to": "c"}),
//!     ],
//! })?;
//!
//! let reached = graph.reached_by_id(&"a")?;
//! assert_eq!(reached.nodes().len(), 2);
//! assert!(reached.has_node_id(&"c")?);
//! # Ok::<(), sset::Error>(())
//! ```
use crate::{Error, Result, canonical, records::RecordSet};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The plain-data form of a [`Graph`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphParts {
    pub nodes: Vec<Value>,
    pub edges: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    nodes: RecordSet,
    edges: RecordSet,
}

/// The pattern `{field: value}`, in canonical form.
fn field_pattern<T>(field: &str, value: &T) -> Result<Value>
where
    T: Serialize + ?Sized,
{
    let mut pattern = Map::new();
    pattern.insert(field.to_owned(), canonical::canonicalize(value)?);
    Ok(Value::Object(pattern))
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from lists of nodes and edges. Duplicates collapse.
    pub fn from_parts(parts: GraphParts) -> Result<Self> {
        Ok(Self {
            nodes: RecordSet::from_values(parts.nodes)?,
            edges: RecordSet::from_values(parts.edges)?,
        })
    }

    /// Lists the nodes and edges, each in iteration order.
    pub fn to_parts(&self) -> GraphParts {
        GraphParts {
            nodes: self.nodes.to_vec(),
            edges: self.edges.to_vec(),
        }
    }

    pub fn nodes(&self) -> &RecordSet {
        &self.nodes
    }

    pub fn edges(&self) -> &RecordSet {
        &self.edges
    }

    /// Nodes and edges of both graphs.
    pub fn union(&self, other: &Graph) -> Self {
        self.node_union(other).edge_union(other)
    }

    fn with_nodes(&self, nodes: RecordSet) -> Self {
        Self {
            nodes,
            edges: self.edges.clone(),
        }
    }

    fn with_edges(&self, edges: RecordSet) -> Self {
        Self {
            nodes: self.nodes.clone(),
            edges,
        }
    }

    /// Adds a node, failing with [`Error::ValueAlreadyExists`] if it is present.
    pub fn add_node<T>(&self, node: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        Ok(self.with_nodes(self.nodes.add(node)?))
    }

    /// Removes a node, failing with [`Error::ValueNotFound`] if it is not present.
    ///
    /// Edges touching the node are kept.
    pub fn remove_node<T>(&self, node: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        Ok(self.with_nodes(self.nodes.remove(node)?))
    }

    /// Replaces `node` with `replacement`.
    ///
    /// Fails if `node` is not present, or if `replacement` is (and differs from `node`).
    pub fn update_node<T, U>(&self, node: &T, replacement: &U) -> Result<Self>
    where
        T: Serialize + ?Sized,
        U: Serialize + ?Sized,
    {
        Ok(self.with_nodes(self.nodes.remove(node)?.add(replacement)?))
    }

    /// This graph's edges, with the nodes of both graphs.
    pub fn node_union(&self, other: &Graph) -> Self {
        self.with_nodes(self.nodes.union(&other.nodes))
    }

    /// The node whose `id` field equals `id`.
    ///
    /// Fails with [`Error::NodeIdNotFound`] if there is none.
    pub fn node_by_id<T>(&self, id: &T) -> Result<&Value>
    where
        T: Serialize + ?Sized,
    {
        let pattern = field_pattern("id", id)?;
        self.nodes
            .find_one(&pattern)?
            .ok_or_else(|| Error::NodeIdNotFound {
                id: pattern["id"].clone(),
            })
    }

    pub fn has_node_id<T>(&self, id: &T) -> Result<bool>
    where
        T: Serialize + ?Sized,
    {
        Ok(self.nodes.find_one(&field_pattern("id", id)?)?.is_some())
    }

    /// A graph of the nodes targeted by edges leaving the node `id`, without edges.
    ///
    /// Fails with [`Error::NodeIdNotFound`] if any such edge points at a node that does not exist.
    pub fn reached_by_id<T>(&self, id: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        let leaving = self.edges.find(&field_pattern("from", id)?)?;
        let nodes = leaving
            .iter()
            .map(|edge| match edge.get("to") {
                Some(to) => self.node_by_id(to).cloned(),
                None => Err(Error::NodeIdNotFound { id: Value::Null }),
            })
            .collect::<Result<crate::SSet>>()?;
        tracing::trace!(edges = leaving.len(), nodes = nodes.len(), "followed edges");
        Ok(Self {
            nodes: nodes.into(),
            edges: RecordSet::new(),
        })
    }

    /// Adds an edge, failing with [`Error::ValueAlreadyExists`] if it is present.
    pub fn add_edge<T>(&self, edge: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        Ok(self.with_edges(self.edges.add(edge)?))
    }

    /// Removes an edge, failing with [`Error::ValueNotFound`] if it is not present.
    pub fn remove_edge<T>(&self, edge: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        Ok(self.with_edges(self.edges.remove(edge)?))
    }

    /// Replaces `edge` with `replacement`.
    pub fn update_edge<T, U>(&self, edge: &T, replacement: &U) -> Result<Self>
    where
        T: Serialize + ?Sized,
        U: Serialize + ?Sized,
    {
        Ok(self.with_edges(self.edges.remove(edge)?.add(replacement)?))
    }

    /// This graph's nodes, with the edges of both graphs.
    pub fn edge_union(&self, other: &Graph) -> Self {
        self.with_edges(self.edges.union(&other.edges))
    }

    /// Replaces every edge by its image under `f`.
    pub fn map_edges<T, F>(&self, f: F) -> Result<Self>
    where
        T: Serialize,
        F: FnMut(&Value) -> T,
    {
        Ok(self.with_edges(self.edges.map(f)?))
    }

    pub fn has_edge_id<T>(&self, id: &T) -> Result<bool>
    where
        T: Serialize + ?Sized,
    {
        Ok(self.edges.find_one(&field_pattern("id", id)?)?.is_some())
    }

    /// Removes the edge carrying the same `id` as `edge` if there is one, and adds `edge`
    /// otherwise.
    pub fn toggle_edge<T>(&self, edge: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        let edge = canonical::canonicalize(edge)?;
        let existing = match edge.get("id") {
            Some(id) => self.edges.find_one(&field_pattern("id", id)?)?,
            None => None,
        };
        match existing {
            Some(existing) => self.remove_edge(existing),
            None => self.add_edge(&edge),
        }
    }

    /// A graph of the edges leaving the node `id`, without nodes.
    pub fn edges_from<T>(&self, id: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        Ok(Self {
            nodes: RecordSet::new(),
            edges: self.edges.find(&field_pattern("from", id)?)?,
        })
    }
}
