//! In-memory property graph backed by petgraph.
//!
//! The whole graph state sits behind one `RwLock<Arc<_>>`. A transaction
//! holds the write lock and mutates the state in place, recording an undo
//! step for every change; dropping it uncommitted replays those steps in
//! reverse. Snapshots clone the `Arc` under the read lock, so a write that
//! starts while a snapshot is alive copies the state once and leaves the
//! snapshot untouched. All data is lost on process exit.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use petgraph::Direction as PgDirection;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;

use crate::error::StoreError;

use super::{
    Direction, EdgeId, EdgeRecord, GraphStore, PropertyGraph, StoreResult, Transaction, VertexId,
};

type Properties = BTreeMap<String, BTreeSet<String>>;
type Entry = (String, String);

#[derive(Debug, Clone)]
struct VertexData {
    id: VertexId,
    properties: Properties,
    /// Key-index entries pointing at this vertex.
    keys: BTreeSet<Entry>,
    /// Value-index entries pointing at this vertex.
    indexed: BTreeSet<Entry>,
}

#[derive(Debug, Clone)]
struct EdgeData {
    id: EdgeId,
    label: String,
    properties: Properties,
}

/// An edge taken out of the graph, with enough to put it back.
#[derive(Debug)]
struct DetachedEdge {
    start: VertexId,
    end: VertexId,
    data: EdgeData,
}

#[derive(Debug, Clone, Default)]
struct GraphState {
    graph: StableDiGraph<VertexData, EdgeData>,
    vertices: HashMap<VertexId, NodeIndex>,
    edges: HashMap<EdgeId, EdgeIndex>,
    keys: HashMap<Entry, VertexId>,
    values: HashMap<Entry, BTreeSet<VertexId>>,
    next_vertex: u64,
    next_edge: u64,
}

fn pair(key: &str, value: &str) -> Entry {
    (key.to_string(), value.to_string())
}

impl GraphState {
    fn node(&self, vertex: VertexId) -> StoreResult<NodeIndex> {
        self.vertices
            .get(&vertex)
            .copied()
            .ok_or(StoreError::VertexNotFound { id: vertex.get() })
    }

    fn vertex(&self, vertex: VertexId) -> StoreResult<&VertexData> {
        let idx = self.node(vertex)?;
        self.graph
            .node_weight(idx)
            .ok_or(StoreError::VertexNotFound { id: vertex.get() })
    }

    fn vertex_mut(&mut self, vertex: VertexId) -> StoreResult<&mut VertexData> {
        let idx = self.node(vertex)?;
        self.graph
            .node_weight_mut(idx)
            .ok_or(StoreError::VertexNotFound { id: vertex.get() })
    }

    fn edge_index(&self, edge: EdgeId) -> StoreResult<EdgeIndex> {
        self.edges
            .get(&edge)
            .copied()
            .ok_or(StoreError::EdgeNotFound { id: edge.get() })
    }

    fn edge_data(&self, edge: EdgeId) -> StoreResult<&EdgeData> {
        let idx = self.edge_index(edge)?;
        self.graph
            .edge_weight(idx)
            .ok_or(StoreError::EdgeNotFound { id: edge.get() })
    }

    fn edge_data_mut(&mut self, edge: EdgeId) -> StoreResult<&mut EdgeData> {
        let idx = self.edge_index(edge)?;
        self.graph
            .edge_weight_mut(idx)
            .ok_or(StoreError::EdgeNotFound { id: edge.get() })
    }

    fn record(&self, idx: EdgeIndex) -> Option<EdgeRecord> {
        let (src, dst) = self.graph.edge_endpoints(idx)?;
        let data = self.graph.edge_weight(idx)?;
        Some(EdgeRecord {
            id: data.id,
            start: self.graph.node_weight(src)?.id,
            label: data.label.clone(),
            end: self.graph.node_weight(dst)?.id,
        })
    }

    // Reads shared by transactions and snapshots.

    fn lookup_vertex(&self, key: &str, value: &str) -> Option<VertexId> {
        self.keys.get(&pair(key, value)).copied()
    }

    fn property(&self, vertex: VertexId, key: &str) -> StoreResult<BTreeSet<String>> {
        Ok(self
            .vertex(vertex)?
            .properties
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    fn property_keys(&self, vertex: VertexId) -> StoreResult<Vec<String>> {
        Ok(self.vertex(vertex)?.properties.keys().cloned().collect())
    }

    fn has_value(&self, vertex: VertexId, key: &str, value: &str) -> StoreResult<bool> {
        Ok(self
            .vertex(vertex)?
            .properties
            .get(key)
            .is_some_and(|set| set.contains(value)))
    }

    fn edge(&self, edge: EdgeId) -> Option<EdgeRecord> {
        self.edges.get(&edge).and_then(|idx| self.record(*idx))
    }

    fn edge_property(&self, edge: EdgeId, key: &str) -> StoreResult<BTreeSet<String>> {
        Ok(self
            .edge_data(edge)?
            .properties
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    fn edge_property_keys(&self, edge: EdgeId) -> StoreResult<Vec<String>> {
        Ok(self.edge_data(edge)?.properties.keys().cloned().collect())
    }

    fn edge_has_value(&self, edge: EdgeId, key: &str, value: &str) -> StoreResult<bool> {
        Ok(self
            .edge_data(edge)?
            .properties
            .get(key)
            .is_some_and(|set| set.contains(value)))
    }

    fn lookup_by_value(&self, key: &str, value: &str) -> Vec<VertexId> {
        self.values
            .get(&pair(key, value))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    fn find_edges(
        &self,
        vertex: VertexId,
        label: Option<&str>,
        direction: Direction,
    ) -> StoreResult<Vec<EdgeRecord>> {
        let idx = self.node(vertex)?;
        let mut found: Vec<EdgeIndex> = Vec::new();
        if matches!(direction, Direction::Outgoing | Direction::Both) {
            found.extend(
                self.graph
                    .edges_directed(idx, PgDirection::Outgoing)
                    .map(|e| e.id()),
            );
        }
        if matches!(direction, Direction::Incoming | Direction::Both) {
            found.extend(
                self.graph
                    .edges_directed(idx, PgDirection::Incoming)
                    .map(|e| e.id()),
            );
        }
        let mut records: Vec<EdgeRecord> = found
            .into_iter()
            .filter_map(|e| self.record(e))
            .filter(|r| label.is_none_or(|l| r.label == l))
            .collect();
        records.sort_by_key(|r| r.id);
        records.dedup_by_key(|r| r.id);
        Ok(records)
    }

    // Writes. Each returns what the transaction needs to undo it.

    fn create_vertex(&mut self) -> VertexId {
        self.next_vertex += 1;
        let id = VertexId::new(self.next_vertex);
        let idx = self.graph.add_node(VertexData {
            id,
            properties: Properties::new(),
            keys: BTreeSet::new(),
            indexed: BTreeSet::new(),
        });
        self.vertices.insert(id, idx);
        id
    }

    fn register_key(&mut self, vertex: VertexId, entry: Entry) -> StoreResult<()> {
        self.vertex_mut(vertex)?.keys.insert(entry.clone());
        if let Some(previous) = self.keys.insert(entry.clone(), vertex) {
            if previous != vertex {
                if let Ok(data) = self.vertex_mut(previous) {
                    data.keys.remove(&entry);
                }
            }
        }
        Ok(())
    }

    fn unregister_key(&mut self, entry: &Entry) -> Option<VertexId> {
        let vertex = self.keys.remove(entry)?;
        if let Ok(data) = self.vertex_mut(vertex) {
            data.keys.remove(entry);
        }
        Some(vertex)
    }

    fn detach_edge(&mut self, idx: EdgeIndex) -> Option<DetachedEdge> {
        let (src, dst) = self.graph.edge_endpoints(idx)?;
        let start = self.graph.node_weight(src)?.id;
        let end = self.graph.node_weight(dst)?.id;
        let data = self.graph.remove_edge(idx)?;
        self.edges.remove(&data.id);
        Some(DetachedEdge { start, end, data })
    }

    fn delete_vertex(&mut self, vertex: VertexId) -> Option<(VertexData, Vec<DetachedEdge>)> {
        let idx = self.vertices.remove(&vertex)?;
        let mut incident: Vec<EdgeIndex> = self
            .graph
            .edges_directed(idx, PgDirection::Outgoing)
            .chain(self.graph.edges_directed(idx, PgDirection::Incoming))
            .map(|e| e.id())
            .collect();
        incident.sort();
        incident.dedup();
        let edges: Vec<DetachedEdge> = incident
            .into_iter()
            .filter_map(|e| self.detach_edge(e))
            .collect();
        let data = self.graph.remove_node(idx)?;
        for entry in &data.keys {
            self.keys.remove(entry);
        }
        for entry in &data.indexed {
            if let Some(set) = self.values.get_mut(entry) {
                set.remove(&vertex);
                if set.is_empty() {
                    self.values.remove(entry);
                }
            }
        }
        Some((data, edges))
    }

    fn restore_vertex(&mut self, data: VertexData, edges: Vec<DetachedEdge>) {
        let id = data.id;
        for entry in &data.keys {
            self.keys.insert(entry.clone(), id);
        }
        for entry in &data.indexed {
            self.values.entry(entry.clone()).or_default().insert(id);
        }
        let idx = self.graph.add_node(data);
        self.vertices.insert(id, idx);
        for edge in edges {
            self.restore_edge(edge);
        }
    }

    fn create_edge(&mut self, from: VertexId, label: &str, to: VertexId) -> StoreResult<EdgeId> {
        let a = self.node(from)?;
        let b = self.node(to)?;
        self.next_edge += 1;
        let id = EdgeId::new(self.next_edge);
        let idx = self.graph.add_edge(
            a,
            b,
            EdgeData {
                id,
                label: label.to_string(),
                properties: Properties::new(),
            },
        );
        self.edges.insert(id, idx);
        Ok(id)
    }

    fn delete_edge(&mut self, edge: EdgeId) -> Option<DetachedEdge> {
        let idx = self.edges.get(&edge).copied()?;
        self.detach_edge(idx)
    }

    fn restore_edge(&mut self, edge: DetachedEdge) {
        let (Ok(a), Ok(b)) = (self.node(edge.start), self.node(edge.end)) else {
            return;
        };
        let id = edge.data.id;
        let idx = self.graph.add_edge(a, b, edge.data);
        self.edges.insert(id, idx);
    }

    fn index_vertex(&mut self, vertex: VertexId, entry: Entry) -> StoreResult<()> {
        self.vertex_mut(vertex)?.indexed.insert(entry.clone());
        self.values.entry(entry).or_default().insert(vertex);
        Ok(())
    }

    fn unindex_vertex(&mut self, vertex: VertexId, entry: &Entry) -> bool {
        if let Ok(data) = self.vertex_mut(vertex) {
            data.indexed.remove(entry);
        }
        let Some(set) = self.values.get_mut(entry) else {
            return false;
        };
        let removed = set.remove(&vertex);
        if set.is_empty() {
            self.values.remove(entry);
        }
        removed
    }
}

/// Replace one property slot, returning what it held before.
fn replace_set(
    properties: &mut Properties,
    key: &str,
    next: Option<BTreeSet<String>>,
) -> Option<BTreeSet<String>> {
    match next {
        Some(set) if !set.is_empty() => properties.insert(key.to_string(), set),
        _ => properties.remove(key),
    }
}

/// One reversible change made by a transaction.
#[derive(Debug)]
enum Undo {
    CreatedVertex(VertexId),
    DeletedVertex {
        data: VertexData,
        edges: Vec<DetachedEdge>,
    },
    CreatedEdge(EdgeId),
    DeletedEdge(DetachedEdge),
    VertexProperty {
        vertex: VertexId,
        key: String,
        previous: Option<BTreeSet<String>>,
    },
    EdgeProperty {
        edge: EdgeId,
        key: String,
        previous: Option<BTreeSet<String>>,
    },
    KeyRegistered {
        entry: Entry,
        vertex: VertexId,
        vertex_had: bool,
        previous: Option<VertexId>,
    },
    KeyUnregistered {
        entry: Entry,
        vertex: VertexId,
    },
    Indexed {
        entry: Entry,
        vertex: VertexId,
    },
    Unindexed {
        entry: Entry,
        vertex: VertexId,
    },
}

impl Undo {
    /// Steps are reverted newest first, so everything a step refers to
    /// exists again by the time it runs.
    fn revert(self, state: &mut GraphState) {
        match self {
            Undo::CreatedVertex(vertex) => {
                state.delete_vertex(vertex);
            }
            Undo::DeletedVertex { data, edges } => state.restore_vertex(data, edges),
            Undo::CreatedEdge(edge) => {
                state.delete_edge(edge);
            }
            Undo::DeletedEdge(edge) => state.restore_edge(edge),
            Undo::VertexProperty {
                vertex,
                key,
                previous,
            } => {
                if let Ok(data) = state.vertex_mut(vertex) {
                    replace_set(&mut data.properties, &key, previous);
                }
            }
            Undo::EdgeProperty {
                edge,
                key,
                previous,
            } => {
                if let Ok(data) = state.edge_data_mut(edge) {
                    replace_set(&mut data.properties, &key, previous);
                }
            }
            Undo::KeyRegistered {
                entry,
                vertex,
                vertex_had,
                previous,
            } => {
                if !vertex_had {
                    if let Ok(data) = state.vertex_mut(vertex) {
                        data.keys.remove(&entry);
                    }
                }
                match previous {
                    Some(owner) => {
                        if let Ok(data) = state.vertex_mut(owner) {
                            data.keys.insert(entry.clone());
                        }
                        state.keys.insert(entry, owner);
                    }
                    None => {
                        state.keys.remove(&entry);
                    }
                }
            }
            Undo::KeyUnregistered { entry, vertex } => {
                if let Ok(data) = state.vertex_mut(vertex) {
                    data.keys.insert(entry.clone());
                }
                state.keys.insert(entry, vertex);
            }
            Undo::Indexed { entry, vertex } => {
                state.unindex_vertex(vertex, &entry);
            }
            Undo::Unindexed { entry, vertex } => {
                if state.index_vertex(vertex, entry).is_err() {
                    tracing::warn!(%vertex, "index entry of a missing vertex not restored");
                }
            }
        }
    }
}

/// Snapshot counts of a [`MemGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphStats {
    pub vertices: usize,
    pub edges: usize,
    pub keyed_vertices: usize,
}

/// Transactional in-memory property graph.
pub struct MemGraph {
    state: RwLock<Arc<GraphState>>,
}

impl MemGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Arc::new(GraphState::default())),
        }
    }

    /// Counts of the committed state.
    pub fn stats(&self) -> StoreResult<GraphStats> {
        let state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(GraphStats {
            vertices: state.vertices.len(),
            edges: state.edges.len(),
            keyed_vertices: state.keys.len(),
        })
    }
}

impl Default for MemGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.stats() {
            Ok(stats) => f
                .debug_struct("MemGraph")
                .field("vertices", &stats.vertices)
                .field("edges", &stats.edges)
                .finish(),
            Err(_) => f.debug_struct("MemGraph").field("poisoned", &true).finish(),
        }
    }
}

impl GraphStore for MemGraph {
    type Txn<'a> = MemTransaction<'a>;
    type Snapshot<'a> = MemSnapshot;

    fn begin(&self) -> StoreResult<MemTransaction<'_>> {
        let guard = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(MemTransaction {
            guard,
            undo: Vec::new(),
        })
    }

    fn snapshot(&self) -> StoreResult<MemSnapshot> {
        let guard = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(MemSnapshot {
            state: Arc::clone(&guard),
        })
    }
}

/// An open transaction on a [`MemGraph`]. Holds the graph's write lock.
pub struct MemTransaction<'a> {
    guard: RwLockWriteGuard<'a, Arc<GraphState>>,
    undo: Vec<Undo>,
}

impl MemTransaction<'_> {
    fn state(&self) -> &GraphState {
        &self.guard
    }

    /// Copies the state only while a snapshot still shares it.
    fn state_mut(&mut self) -> &mut GraphState {
        Arc::make_mut(&mut *self.guard)
    }
}

impl Transaction for MemTransaction<'_> {
    fn commit(mut self) -> StoreResult<()> {
        tracing::trace!(changes = self.undo.len(), "committing transaction");
        self.undo.clear();
        Ok(())
    }
}

impl Drop for MemTransaction<'_> {
    fn drop(&mut self) {
        if self.undo.is_empty() {
            return;
        }
        let steps = self.undo.len();
        let state = Arc::make_mut(&mut *self.guard);
        for step in self.undo.drain(..).rev() {
            step.revert(state);
        }
        tracing::debug!(steps, "rolled back transaction");
    }
}

impl PropertyGraph for MemTransaction<'_> {
    fn lookup_vertex(&self, key: &str, value: &str) -> StoreResult<Option<VertexId>> {
        Ok(self.state().lookup_vertex(key, value))
    }

    fn register_key(&mut self, vertex: VertexId, key: &str, value: &str) -> StoreResult<()> {
        let entry = pair(key, value);
        let vertex_had = self.state().vertex(vertex)?.keys.contains(&entry);
        let previous = self.state().keys.get(&entry).copied();
        if vertex_had && previous == Some(vertex) {
            return Ok(());
        }
        self.state_mut().register_key(vertex, entry.clone())?;
        self.undo.push(Undo::KeyRegistered {
            entry,
            vertex,
            vertex_had,
            previous,
        });
        Ok(())
    }

    fn unregister_key(&mut self, key: &str, value: &str) -> StoreResult<bool> {
        let entry = pair(key, value);
        if !self.state().keys.contains_key(&entry) {
            return Ok(false);
        }
        match self.state_mut().unregister_key(&entry) {
            Some(vertex) => {
                self.undo.push(Undo::KeyUnregistered { entry, vertex });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn create_vertex(&mut self) -> StoreResult<VertexId> {
        let vertex = self.state_mut().create_vertex();
        self.undo.push(Undo::CreatedVertex(vertex));
        Ok(vertex)
    }

    fn vertex_exists(&self, vertex: VertexId) -> StoreResult<bool> {
        Ok(self.state().vertices.contains_key(&vertex))
    }

    fn delete_vertex(&mut self, vertex: VertexId) -> StoreResult<bool> {
        if !self.state().vertices.contains_key(&vertex) {
            return Ok(false);
        }
        match self.state_mut().delete_vertex(vertex) {
            Some((data, edges)) => {
                self.undo.push(Undo::DeletedVertex { data, edges });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn get_property(&self, vertex: VertexId, key: &str) -> StoreResult<BTreeSet<String>> {
        self.state().property(vertex, key)
    }

    fn property_keys(&self, vertex: VertexId) -> StoreResult<Vec<String>> {
        self.state().property_keys(vertex)
    }

    fn add_property_value(&mut self, vertex: VertexId, key: &str, value: &str) -> StoreResult<bool> {
        if self.state().has_value(vertex, key, value)? {
            return Ok(false);
        }
        let properties = &mut self.state_mut().vertex_mut(vertex)?.properties;
        let previous = properties.get(key).cloned();
        properties
            .entry(key.to_string())
            .or_default()
            .insert(value.to_string());
        self.undo.push(Undo::VertexProperty {
            vertex,
            key: key.to_string(),
            previous,
        });
        Ok(true)
    }

    fn remove_property_value(
        &mut self,
        vertex: VertexId,
        key: &str,
        value: &str,
    ) -> StoreResult<bool> {
        if !self.state().has_value(vertex, key, value)? {
            return Ok(false);
        }
        let properties = &mut self.state_mut().vertex_mut(vertex)?.properties;
        let previous = properties.get(key).cloned();
        let rest = previous.clone().map(|mut set| {
            set.remove(value);
            set
        });
        replace_set(properties, key, rest);
        self.undo.push(Undo::VertexProperty {
            vertex,
            key: key.to_string(),
            previous,
        });
        Ok(true)
    }

    fn remove_property(&mut self, vertex: VertexId, key: &str) -> StoreResult<bool> {
        if !self.state().vertex(vertex)?.properties.contains_key(key) {
            return Ok(false);
        }
        let previous = self.state_mut().vertex_mut(vertex)?.properties.remove(key);
        self.undo.push(Undo::VertexProperty {
            vertex,
            key: key.to_string(),
            previous,
        });
        Ok(true)
    }

    fn create_edge(&mut self, from: VertexId, label: &str, to: VertexId) -> StoreResult<EdgeId> {
        self.state().node(from)?;
        self.state().node(to)?;
        let edge = self.state_mut().create_edge(from, label, to)?;
        self.undo.push(Undo::CreatedEdge(edge));
        Ok(edge)
    }

    fn find_edges(
        &self,
        vertex: VertexId,
        label: Option<&str>,
        direction: Direction,
    ) -> StoreResult<Vec<EdgeRecord>> {
        self.state().find_edges(vertex, label, direction)
    }

    fn edge(&self, edge: EdgeId) -> StoreResult<Option<EdgeRecord>> {
        Ok(self.state().edge(edge))
    }

    fn delete_edge(&mut self, edge: EdgeId) -> StoreResult<bool> {
        if !self.state().edges.contains_key(&edge) {
            return Ok(false);
        }
        match self.state_mut().delete_edge(edge) {
            Some(detached) => {
                self.undo.push(Undo::DeletedEdge(detached));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn get_edge_property(&self, edge: EdgeId, key: &str) -> StoreResult<BTreeSet<String>> {
        self.state().edge_property(edge, key)
    }

    fn edge_property_keys(&self, edge: EdgeId) -> StoreResult<Vec<String>> {
        self.state().edge_property_keys(edge)
    }

    fn add_edge_property_value(
        &mut self,
        edge: EdgeId,
        key: &str,
        value: &str,
    ) -> StoreResult<bool> {
        if self.state().edge_has_value(edge, key, value)? {
            return Ok(false);
        }
        let properties = &mut self.state_mut().edge_data_mut(edge)?.properties;
        let previous = properties.get(key).cloned();
        properties
            .entry(key.to_string())
            .or_default()
            .insert(value.to_string());
        self.undo.push(Undo::EdgeProperty {
            edge,
            key: key.to_string(),
            previous,
        });
        Ok(true)
    }

    fn remove_edge_property_value(
        &mut self,
        edge: EdgeId,
        key: &str,
        value: &str,
    ) -> StoreResult<bool> {
        if !self.state().edge_has_value(edge, key, value)? {
            return Ok(false);
        }
        let properties = &mut self.state_mut().edge_data_mut(edge)?.properties;
        let previous = properties.get(key).cloned();
        let rest = previous.clone().map(|mut set| {
            set.remove(value);
            set
        });
        replace_set(properties, key, rest);
        self.undo.push(Undo::EdgeProperty {
            edge,
            key: key.to_string(),
            previous,
        });
        Ok(true)
    }

    fn index_vertex(&mut self, vertex: VertexId, key: &str, value: &str) -> StoreResult<()> {
        let entry = pair(key, value);
        if self.state().vertex(vertex)?.indexed.contains(&entry) {
            return Ok(());
        }
        self.state_mut().index_vertex(vertex, entry.clone())?;
        self.undo.push(Undo::Indexed { entry, vertex });
        Ok(())
    }

    fn unindex_vertex(&mut self, vertex: VertexId, key: &str, value: &str) -> StoreResult<bool> {
        let entry = pair(key, value);
        let present = self
            .state()
            .values
            .get(&entry)
            .is_some_and(|set| set.contains(&vertex));
        if !present {
            return Ok(false);
        }
        let removed = self.state_mut().unindex_vertex(vertex, &entry);
        self.undo.push(Undo::Unindexed { entry, vertex });
        Ok(removed)
    }

    fn lookup_vertices_by_value(&self, key: &str, value: &str) -> StoreResult<Vec<VertexId>> {
        Ok(self.state().lookup_by_value(key, value))
    }

    fn vertex_count(&self) -> usize {
        self.state().vertices.len()
    }

    fn edge_count(&self) -> usize {
        self.state().edges.len()
    }
}

/// A read-only view of a [`MemGraph`] as of its last commit.
///
/// Holds no lock. Later commits are not visible through it.
#[derive(Debug, Clone)]
pub struct MemSnapshot {
    state: Arc<GraphState>,
}

fn read_only<T>(operation: &'static str) -> StoreResult<T> {
    Err(StoreError::ReadOnly { operation })
}

impl PropertyGraph for MemSnapshot {
    fn lookup_vertex(&self, key: &str, value: &str) -> StoreResult<Option<VertexId>> {
        Ok(self.state.lookup_vertex(key, value))
    }

    fn register_key(&mut self, _vertex: VertexId, _key: &str, _value: &str) -> StoreResult<()> {
        read_only("register a key")
    }

    fn unregister_key(&mut self, _key: &str, _value: &str) -> StoreResult<bool> {
        read_only("unregister a key")
    }

    fn create_vertex(&mut self) -> StoreResult<VertexId> {
        read_only("create a vertex")
    }

    fn vertex_exists(&self, vertex: VertexId) -> StoreResult<bool> {
        Ok(self.state.vertices.contains_key(&vertex))
    }

    fn delete_vertex(&mut self, _vertex: VertexId) -> StoreResult<bool> {
        read_only("delete a vertex")
    }

    fn get_property(&self, vertex: VertexId, key: &str) -> StoreResult<BTreeSet<String>> {
        self.state.property(vertex, key)
    }

    fn property_keys(&self, vertex: VertexId) -> StoreResult<Vec<String>> {
        self.state.property_keys(vertex)
    }

    fn add_property_value(&mut self, _: VertexId, _: &str, _: &str) -> StoreResult<bool> {
        read_only("add a property value")
    }

    fn remove_property_value(&mut self, _: VertexId, _: &str, _: &str) -> StoreResult<bool> {
        read_only("remove a property value")
    }

    fn remove_property(&mut self, _vertex: VertexId, _key: &str) -> StoreResult<bool> {
        read_only("remove a property")
    }

    fn create_edge(&mut self, _from: VertexId, _label: &str, _to: VertexId) -> StoreResult<EdgeId> {
        read_only("create an edge")
    }

    fn find_edges(
        &self,
        vertex: VertexId,
        label: Option<&str>,
        direction: Direction,
    ) -> StoreResult<Vec<EdgeRecord>> {
        self.state.find_edges(vertex, label, direction)
    }

    fn edge(&self, edge: EdgeId) -> StoreResult<Option<EdgeRecord>> {
        Ok(self.state.edge(edge))
    }

    fn delete_edge(&mut self, _edge: EdgeId) -> StoreResult<bool> {
        read_only("delete an edge")
    }

    fn get_edge_property(&self, edge: EdgeId, key: &str) -> StoreResult<BTreeSet<String>> {
        self.state.edge_property(edge, key)
    }

    fn edge_property_keys(&self, edge: EdgeId) -> StoreResult<Vec<String>> {
        self.state.edge_property_keys(edge)
    }

    fn add_edge_property_value(&mut self, _: EdgeId, _: &str, _: &str) -> StoreResult<bool> {
        read_only("add an edge property value")
    }

    fn remove_edge_property_value(&mut self, _: EdgeId, _: &str, _: &str) -> StoreResult<bool> {
        read_only("remove an edge property value")
    }

    fn index_vertex(&mut self, _vertex: VertexId, _key: &str, _value: &str) -> StoreResult<()> {
        read_only("index a vertex")
    }

    fn unindex_vertex(&mut self, _vertex: VertexId, _key: &str, _value: &str) -> StoreResult<bool> {
        read_only("unindex a vertex")
    }

    fn lookup_vertices_by_value(&self, key: &str, value: &str) -> StoreResult<Vec<VertexId>> {
        Ok(self.state.lookup_by_value(key, value))
    }

    fn vertex_count(&self) -> usize {
        self.state.vertices.len()
    }

    fn edge_count(&self) -> usize {
        self.state.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn committed_changes_are_visible() {
        let graph = MemGraph::new();
        let v = {
            let mut tx = graph.begin().unwrap();
            let v = tx.create_vertex().unwrap();
            tx.register_key(v, "_uri", "http://ex.org/a").unwrap();
            tx.commit().unwrap();
            v
        };
        let tx = graph.begin().unwrap();
        assert_eq!(tx.lookup_vertex("_uri", "http://ex.org/a").unwrap(), Some(v));
    }

    #[test]
    fn dropped_transaction_rolls_back() {
        let graph = MemGraph::new();
        {
            let mut tx = graph.begin().unwrap();
            tx.create_vertex().unwrap();
            // dropped without commit
        }
        assert_eq!(graph.stats().unwrap().vertices, 0);
    }

    #[test]
    fn properties_have_set_semantics() {
        let graph = MemGraph::new();
        let mut tx = graph.begin().unwrap();
        let v = tx.create_vertex().unwrap();
        assert!(tx.add_property_value(v, "k", "a").unwrap());
        assert!(!tx.add_property_value(v, "k", "a").unwrap());
        assert!(tx.add_property_value(v, "k", "b").unwrap());
        assert_eq!(tx.get_property(v, "k").unwrap().len(), 2);
        assert!(tx.remove_property_value(v, "k", "a").unwrap());
        assert!(!tx.remove_property_value(v, "k", "a").unwrap());
        assert!(tx.remove_property_value(v, "k", "b").unwrap());
        assert!(tx.property_keys(v).unwrap().is_empty());
    }

    #[test]
    fn edges_are_listed_in_creation_order() {
        let graph = MemGraph::new();
        let mut tx = graph.begin().unwrap();
        let a = tx.create_vertex().unwrap();
        let b = tx.create_vertex().unwrap();
        let e1 = tx.create_edge(a, "p", b).unwrap();
        let e2 = tx.create_edge(a, "q", b).unwrap();
        let e3 = tx.create_edge(b, "p", a).unwrap();
        let out: Vec<EdgeId> = tx
            .find_edges(a, None, Direction::Outgoing)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(out, vec![e1, e2]);
        let both: Vec<EdgeId> = tx
            .find_edges(a, Some("p"), Direction::Both)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(both, vec![e1, e3]);
    }

    #[test]
    fn self_loop_is_listed_once() {
        let graph = MemGraph::new();
        let mut tx = graph.begin().unwrap();
        let a = tx.create_vertex().unwrap();
        tx.create_edge(a, "p", a).unwrap();
        assert_eq!(tx.find_edges(a, None, Direction::Both).unwrap().len(), 1);
    }

    #[test]
    fn deleting_a_vertex_drops_edges_and_index_entries() {
        let graph = MemGraph::new();
        let mut tx = graph.begin().unwrap();
        let a = tx.create_vertex().unwrap();
        let b = tx.create_vertex().unwrap();
        tx.register_key(a, "_uri", "http://ex.org/a").unwrap();
        tx.index_vertex(a, "_literal", "x").unwrap();
        tx.create_edge(a, "p", b).unwrap();
        assert!(tx.delete_vertex(a).unwrap());
        assert!(!tx.delete_vertex(a).unwrap());
        assert_eq!(tx.edge_count(), 0);
        assert_eq!(tx.lookup_vertex("_uri", "http://ex.org/a").unwrap(), None);
        assert!(tx.lookup_vertices_by_value("_literal", "x").unwrap().is_empty());
        assert!(!tx.has_edges(b).unwrap());
    }

    #[test]
    fn missing_edge_delete_is_benign() {
        let graph = MemGraph::new();
        let mut tx = graph.begin().unwrap();
        let a = tx.create_vertex().unwrap();
        let e = tx.create_edge(a, "p", a).unwrap();
        assert!(tx.delete_edge(e).unwrap());
        assert!(!tx.delete_edge(e).unwrap());
    }

    #[test]
    fn vertex_ids_are_not_reused() {
        let graph = MemGraph::new();
        let mut tx = graph.begin().unwrap();
        let a = tx.create_vertex().unwrap();
        tx.delete_vertex(a).unwrap();
        let b = tx.create_vertex().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn edge_properties_have_set_semantics() {
        let graph = MemGraph::new();
        let mut tx = graph.begin().unwrap();
        let a = tx.create_vertex().unwrap();
        let e = tx.create_edge(a, "p", a).unwrap();
        assert!(tx.add_edge_property_value(e, "_contexts", "urn:g1").unwrap());
        assert!(!tx.add_edge_property_value(e, "_contexts", "urn:g1").unwrap());
        assert!(tx.remove_edge_property_value(e, "_contexts", "urn:g1").unwrap());
        assert!(tx.edge_property_keys(e).unwrap().is_empty());
    }

    /// Everything observable about the committed state, in a stable order.
    fn fingerprint(graph: &MemGraph) -> String {
        let state = graph.state.read().unwrap();
        let mut vertices: Vec<String> = state
            .graph
            .node_indices()
            .filter_map(|i| state.graph.node_weight(i))
            .map(|v| format!("{} {:?} {:?} {:?}", v.id, v.properties, v.keys, v.indexed))
            .collect();
        vertices.sort();
        let mut edges: Vec<String> = state
            .graph
            .edge_indices()
            .filter_map(|e| {
                let r = state.record(e)?;
                let data = state.graph.edge_weight(e)?;
                Some(format!("{} {}-{}->{} {:?}", r.id, r.start, r.label, r.end, data.properties))
            })
            .collect();
        edges.sort();
        let mut mapped: Vec<String> = state
            .vertices
            .keys()
            .map(|v| v.to_string())
            .chain(state.edges.keys().map(|e| e.to_string()))
            .collect();
        mapped.sort();
        let keys: BTreeMap<_, _> = state.keys.iter().collect();
        let values: BTreeMap<_, _> = state.values.iter().collect();
        format!("{vertices:?}\n{edges:?}\n{mapped:?}\n{keys:?}\n{values:?}")
    }

    #[test]
    fn rollback_restores_deleted_vertices_edges_and_indexes() {
        let graph = MemGraph::new();
        let (a, b, c, ab) = {
            let mut tx = graph.begin().unwrap();
            let a = tx.create_vertex().unwrap();
            let b = tx.create_vertex().unwrap();
            let c = tx.create_vertex().unwrap();
            tx.register_key(a, "_uri", "http://ex.org/a").unwrap();
            tx.register_key(b, "_uri", "http://ex.org/b").unwrap();
            tx.index_vertex(a, "_literal", "x").unwrap();
            tx.index_vertex(c, "_literal", "x").unwrap();
            tx.add_property_value(a, "name", "A").unwrap();
            tx.add_property_value(b, "name", "B1").unwrap();
            tx.add_property_value(b, "name", "B2").unwrap();
            let ab = tx.create_edge(a, "p", b).unwrap();
            tx.add_edge_property_value(ab, "_contexts", "urn:g1").unwrap();
            tx.create_edge(b, "q", c).unwrap();
            tx.create_edge(c, "r", c).unwrap();
            tx.commit().unwrap();
            (a, b, c, ab)
        };
        let before = fingerprint(&graph);

        {
            let mut tx = graph.begin().unwrap();
            assert!(tx.delete_vertex(a).unwrap());
            assert!(tx.remove_property_value(b, "name", "B1").unwrap());
            assert!(tx.remove_property(b, "name").unwrap());
            // takes over b's key
            tx.register_key(c, "_uri", "http://ex.org/b").unwrap();
            assert!(tx.unindex_vertex(c, "_literal", "x").unwrap());
            assert!(tx.delete_vertex(c).unwrap());
            let d = tx.create_vertex().unwrap();
            let bd = tx.create_edge(b, "p", d).unwrap();
            tx.add_edge_property_value(bd, "_contexts", "urn:g2").unwrap();
            tx.register_key(d, "_uri", "http://ex.org/a").unwrap();
            assert_eq!(tx.vertex_count(), 2);
            assert_eq!(tx.edge_count(), 1);
        }

        assert_eq!(fingerprint(&graph), before);
        let tx = graph.begin().unwrap();
        assert_eq!(tx.lookup_vertex("_uri", "http://ex.org/a").unwrap(), Some(a));
        assert_eq!(tx.lookup_vertex("_uri", "http://ex.org/b").unwrap(), Some(b));
        let out: Vec<EdgeId> = tx
            .find_edges(a, None, Direction::Outgoing)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(out, vec![ab]);
        assert!(tx.get_edge_property(ab, "_contexts").unwrap().contains("urn:g1"));
        assert_eq!(tx.get_property(b, "name").unwrap().len(), 2);
        assert_eq!(tx.lookup_vertices_by_value("_literal", "x").unwrap(), vec![a, c]);
        assert_eq!(tx.find_edges(c, None, Direction::Both).unwrap().len(), 2);
    }

    #[test]
    fn writes_without_readers_mutate_in_place() {
        let graph = MemGraph::new();
        let before = Arc::as_ptr(&*graph.state.read().unwrap());
        for _ in 0..3 {
            let mut tx = graph.begin().unwrap();
            let v = tx.create_vertex().unwrap();
            tx.register_key(v, "_uri", &format!("http://ex.org/{v}")).unwrap();
            tx.commit().unwrap();
        }
        {
            let mut tx = graph.begin().unwrap();
            tx.create_vertex().unwrap();
        }
        assert_eq!(Arc::as_ptr(&*graph.state.read().unwrap()), before);
        assert_eq!(graph.stats().unwrap().vertices, 3);
    }

    #[test]
    fn snapshot_keeps_its_view_across_commits() {
        let graph = MemGraph::new();
        let v = {
            let mut tx = graph.begin().unwrap();
            let v = tx.create_vertex().unwrap();
            tx.add_property_value(v, "k", "a").unwrap();
            tx.commit().unwrap();
            v
        };
        let first = graph.snapshot().unwrap();
        let second = graph.snapshot().unwrap();
        {
            let mut tx = graph.begin().unwrap();
            tx.add_property_value(v, "k", "b").unwrap();
            tx.create_vertex().unwrap();
            tx.commit().unwrap();
        }
        for snapshot in [&first, &second] {
            assert_eq!(snapshot.get_property(v, "k").unwrap().len(), 1);
            assert_eq!(snapshot.vertex_count(), 1);
        }
        let latest = graph.snapshot().unwrap();
        assert_eq!(latest.get_property(v, "k").unwrap().len(), 2);
        assert_eq!(latest.vertex_count(), 2);
    }

    #[test]
    fn snapshots_reject_writes() {
        let graph = MemGraph::new();
        let mut snapshot = graph.snapshot().unwrap();
        assert!(matches!(
            snapshot.create_vertex(),
            Err(StoreError::ReadOnly { .. })
        ));
        assert_eq!(graph.stats().unwrap().vertices, 0);
    }
}
