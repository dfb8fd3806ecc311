//! Property-graph collaborator.
//!
//! The engine only talks to storage through [`PropertyGraph`] (vertex/edge
//! CRUD, multi-valued properties, a unique key index and a secondary value
//! index) inside a [`Transaction`] obtained from a [`GraphStore`]. Queries
//! may instead read a [`GraphStore::snapshot`], which never blocks other
//! readers.
//!
//! - [`MemGraph`]: in-memory transactional graph (petgraph) with undo-log
//!   rollback and shared read snapshots

pub mod mem;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub use mem::{MemGraph, MemSnapshot, MemTransaction};

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Identifier of a real vertex. Never reused within one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct VertexId(u64);

impl VertexId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Identifier of a real edge. Ids grow with creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct EdgeId(u64);

impl EdgeId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Which incident edges of a vertex to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

/// A snapshot of one edge's endpoints and label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRecord {
    pub id: EdgeId,
    pub start: VertexId,
    pub label: String,
    pub end: VertexId,
}

impl EdgeRecord {
    /// The endpoint that is not `vertex` (or `vertex` itself for a loop).
    pub fn other(&self, vertex: VertexId) -> VertexId {
        if self.start == vertex {
            self.end
        } else {
            self.start
        }
    }
}

/// Capability surface the engine needs from a property graph.
///
/// Properties are multi-valued string sets; adding a present value or
/// removing an absent one is a no-op reported through the returned `bool`.
/// Deleting something that no longer exists returns `Ok(false)`.
pub trait PropertyGraph {
    /// Unique key index lookup.
    fn lookup_vertex(&self, key: &str, value: &str) -> StoreResult<Option<VertexId>>;
    fn register_key(&mut self, vertex: VertexId, key: &str, value: &str) -> StoreResult<()>;
    fn unregister_key(&mut self, key: &str, value: &str) -> StoreResult<bool>;

    fn create_vertex(&mut self) -> StoreResult<VertexId>;
    fn vertex_exists(&self, vertex: VertexId) -> StoreResult<bool>;
    /// Delete a vertex with its incident edges and all its index entries.
    fn delete_vertex(&mut self, vertex: VertexId) -> StoreResult<bool>;

    fn get_property(&self, vertex: VertexId, key: &str) -> StoreResult<BTreeSet<String>>;
    fn property_keys(&self, vertex: VertexId) -> StoreResult<Vec<String>>;
    fn add_property_value(&mut self, vertex: VertexId, key: &str, value: &str) -> StoreResult<bool>;
    fn remove_property_value(
        &mut self,
        vertex: VertexId,
        key: &str,
        value: &str,
    ) -> StoreResult<bool>;
    fn remove_property(&mut self, vertex: VertexId, key: &str) -> StoreResult<bool>;

    fn create_edge(&mut self, from: VertexId, label: &str, to: VertexId) -> StoreResult<EdgeId>;
    /// Incident edges, optionally filtered by label, in creation order.
    fn find_edges(
        &self,
        vertex: VertexId,
        label: Option<&str>,
        direction: Direction,
    ) -> StoreResult<Vec<EdgeRecord>>;
    fn edge(&self, edge: EdgeId) -> StoreResult<Option<EdgeRecord>>;
    fn delete_edge(&mut self, edge: EdgeId) -> StoreResult<bool>;

    fn get_edge_property(&self, edge: EdgeId, key: &str) -> StoreResult<BTreeSet<String>>;
    fn edge_property_keys(&self, edge: EdgeId) -> StoreResult<Vec<String>>;
    fn add_edge_property_value(&mut self, edge: EdgeId, key: &str, value: &str)
    -> StoreResult<bool>;
    fn remove_edge_property_value(
        &mut self,
        edge: EdgeId,
        key: &str,
        value: &str,
    ) -> StoreResult<bool>;

    /// Secondary (multi-vertex) value index.
    fn index_vertex(&mut self, vertex: VertexId, key: &str, value: &str) -> StoreResult<()>;
    fn unindex_vertex(&mut self, vertex: VertexId, key: &str, value: &str) -> StoreResult<bool>;
    fn lookup_vertices_by_value(&self, key: &str, value: &str) -> StoreResult<Vec<VertexId>>;

    fn vertex_count(&self) -> usize;
    fn edge_count(&self) -> usize;

    /// Whether the vertex has any incident edge.
    fn has_edges(&self, vertex: VertexId) -> StoreResult<bool> {
        Ok(!self.find_edges(vertex, None, Direction::Both)?.is_empty())
    }
}

/// A unit of work. Dropping it without [`Transaction::commit`] rolls back.
pub trait Transaction: PropertyGraph {
    fn commit(self) -> StoreResult<()>;
}

/// A store that hands out transactions and read snapshots.
pub trait GraphStore {
    type Txn<'a>: Transaction
    where
        Self: 'a;

    /// Read-only view of the committed state. Mutators fail with
    /// [`StoreError::ReadOnly`].
    type Snapshot<'a>: PropertyGraph
    where
        Self: 'a;

    /// Exclusive unit of work.
    fn begin(&self) -> StoreResult<Self::Txn<'_>>;

    /// Consistent view of the last committed state, shared with other readers.
    fn snapshot(&self) -> StoreResult<Self::Snapshot<'_>>;
}
