//! Fragments: the in-memory staging graph describing what one statement
//! looks like in the property graph.
//!
//! A [`Fragment`] is produced by an encoding policy and consumed by the
//! executor, which merges it into (or subtracts it from) the real graph.
//! Nodes are either *keyed* (resolved by direct key lookup) or *unkeyed*
//! (middle and literal vertices, resolved structurally).

use std::collections::{BTreeMap, BTreeSet};

use crate::error::FragmentError;

/// Multi-valued key → values property bag.
pub type PropertyBag = BTreeMap<String, BTreeSet<String>>;

/// Index of a node within one fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(usize);

impl NodeRef {
    /// Position in the fragment's node list.
    pub fn index(self) -> usize {
        self.0
    }
}

/// How a fragment node maps onto a real vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeIdentity {
    /// Looked up (or created) through the key index.
    Keyed { key: String, value: String },
    /// Resolved by structural matching. Every listed property must match
    /// exactly; `None` requires the property to be absent.
    Unkeyed {
        properties: BTreeMap<String, Option<String>>,
    },
}

impl NodeIdentity {
    /// Whether the node is found through the unique key index.
    pub fn is_keyed(&self) -> bool {
        matches!(self, NodeIdentity::Keyed { .. })
    }
}

/// Free-form role markers the executor uses to decide how to treat a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeTag {
    Subject,
    Object,
    Class,
    Context,
    Middle,
    Literal,
}

/// A value that is only removed once its guard property is empty.
///
/// Dense literals use this: the literal stays on the subject while its
/// per-value context property still lists a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardedValue {
    pub key: String,
    pub value: String,
    pub guard_key: String,
}

/// When a secondary index entry is dropped during removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexRelease {
    /// Only together with the vertex.
    WithVertex,
    /// Once no property of the vertex holds the value. `None` checks every
    /// predicate property; `Some(key)` checks only that key.
    WhenNoProperty { key: Option<String> },
    /// Once no outgoing `label` edge lists the value under `key`.
    WhenNoEdgeProperty { label: String, key: String },
}

/// A secondary value-index registration for the node's vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub key: String,
    pub value: String,
    pub release: IndexRelease,
}

/// A literal to hand to the fulltext collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulltextEntry {
    pub predicate: String,
    pub value: String,
}

/// One node of a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentNode {
    pub identity: NodeIdentity,
    pub tags: BTreeSet<NodeTag>,
    pub properties: PropertyBag,
    pub guarded: Vec<GuardedValue>,
    pub index_entries: Vec<IndexEntry>,
    pub fulltext: Vec<FulltextEntry>,
    /// A failed lookup during removal skips this node instead of aborting.
    pub optional: bool,
}

impl FragmentNode {
    /// A node identified by one unique `key = value` pair.
    pub fn keyed(key: impl Into<String>, value: impl Into<String>, tag: NodeTag) -> Self {
        Self::with_identity(
            NodeIdentity::Keyed {
                key: key.into(),
                value: value.into(),
            },
            tag,
        )
    }

    /// A node identified by an exact property match. `None` means absent.
    pub fn unkeyed(properties: BTreeMap<String, Option<String>>, tag: NodeTag) -> Self {
        Self::with_identity(NodeIdentity::Unkeyed { properties }, tag)
    }

    fn with_identity(identity: NodeIdentity, tag: NodeTag) -> Self {
        Self {
            identity,
            tags: BTreeSet::from([tag]),
            properties: PropertyBag::new(),
            guarded: Vec::new(),
            index_entries: Vec::new(),
            fulltext: Vec::new(),
            optional: false,
        }
    }

    /// Let removal proceed when this node is absent from the graph.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn has_tag(&self, tag: NodeTag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn is_keyed(&self) -> bool {
        self.identity.is_keyed()
    }

    /// Add `value` to the set under `key`.
    pub fn add_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties
            .entry(key.into())
            .or_default()
            .insert(value.into());
    }

    fn absorb(&mut self, other: FragmentNode) {
        self.tags.extend(other.tags);
        for (key, values) in other.properties {
            self.properties.entry(key).or_default().extend(values);
        }
        for g in other.guarded {
            if !self.guarded.contains(&g) {
                self.guarded.push(g);
            }
        }
        for e in other.index_entries {
            if !self.index_entries.contains(&e) {
                self.index_entries.push(e);
            }
        }
        for f in other.fulltext {
            if !self.fulltext.contains(&f) {
                self.fulltext.push(f);
            }
        }
        self.optional &= other.optional;
    }
}

/// What an edge means for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// A direct statement edge; deleted once its property set is empty.
    Relation,
    /// Connects a middle node to its subject/object/literal; a constraint
    /// during structural matching, deleted together with the middle node.
    Structural,
    /// Middle → context vertex; deleted directly on removal.
    Context,
}

/// A directed, labeled edge between two fragment nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentEdge {
    pub start: NodeRef,
    pub label: String,
    pub end: NodeRef,
    pub kind: EdgeKind,
    pub properties: PropertyBag,
}

impl FragmentEdge {
    /// Add `value` to the set under `key`.
    pub fn add_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties
            .entry(key.into())
            .or_default()
            .insert(value.into());
    }
}

/// An ordered node set plus the edges between them.
///
/// Every edge's endpoints are members of the node set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    nodes: Vec<FragmentNode>,
    edges: Vec<FragmentEdge>,
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, merging it into an existing keyed node with the same
    /// identity. Unkeyed nodes are always distinct.
    pub fn add_node(&mut self, node: FragmentNode) -> NodeRef {
        if node.is_keyed() {
            if let Some(pos) = self.nodes.iter().position(|n| n.identity == node.identity) {
                self.nodes[pos].absorb(node);
                return NodeRef(pos);
            }
        }
        self.nodes.push(node);
        NodeRef(self.nodes.len() - 1)
    }

    /// Add an edge (or merge into an identical one) and return its position.
    pub fn add_edge(
        &mut self,
        start: NodeRef,
        label: impl Into<String>,
        end: NodeRef,
        kind: EdgeKind,
    ) -> Result<usize, FragmentError> {
        let label = label.into();
        for node in [start, end] {
            if node.0 >= self.nodes.len() {
                return Err(FragmentError::DanglingEdge {
                    label,
                    node: node.0,
                    len: self.nodes.len(),
                });
            }
        }
        if let Some(pos) = self
            .edges
            .iter()
            .position(|e| e.start == start && e.end == end && e.label == label && e.kind == kind)
        {
            return Ok(pos);
        }
        self.edges.push(FragmentEdge {
            start,
            label,
            end,
            kind,
            properties: PropertyBag::new(),
        });
        Ok(self.edges.len() - 1)
    }

    /// The node at `node`.
    pub fn node(&self, node: NodeRef) -> &FragmentNode {
        &self.nodes[node.0]
    }

    pub fn node_mut(&mut self, node: NodeRef) -> &mut FragmentNode {
        &mut self.nodes[node.0]
    }

    /// The edge at position `edge`, as returned by [`Fragment::add_edge`].
    pub fn edge_mut(&mut self, edge: usize) -> &mut FragmentEdge {
        &mut self.edges[edge]
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeRef, &FragmentNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeRef(i), n))
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> &[FragmentEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// First node carrying `tag`.
    pub fn find_tagged(&self, tag: NodeTag) -> Option<NodeRef> {
        self.nodes
            .iter()
            .position(|n| n.has_tag(tag))
            .map(NodeRef)
    }

    /// Structural edges touching `node`, with the neighbour and whether
    /// `node` is the edge's start.
    pub fn structural_edges_of(
        &self,
        node: NodeRef,
    ) -> impl Iterator<Item = (&FragmentEdge, NodeRef, bool)> {
        self.edges.iter().filter_map(move |e| {
            if e.kind != EdgeKind::Structural {
                return None;
            }
            if e.start == node {
                Some((e, e.end, true))
            } else if e.end == node {
                Some((e, e.start, false))
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_nodes_are_deduplicated() {
        let mut f = Fragment::new();
        let a = f.add_node(FragmentNode::keyed("_uri", "http://ex.org/a", NodeTag::Subject));
        let b = f.add_node(FragmentNode::keyed("_uri", "http://ex.org/a", NodeTag::Object));
        assert_eq!(a, b);
        assert_eq!(f.node_count(), 1);
        assert!(f.node(a).has_tag(NodeTag::Subject));
        assert!(f.node(a).has_tag(NodeTag::Object));
    }

    #[test]
    fn merged_node_is_required_if_any_part_is() {
        let mut f = Fragment::new();
        let ctx = f.add_node(FragmentNode::keyed("_uri", "urn:g", NodeTag::Context).optional());
        assert!(f.node(ctx).optional);
        f.add_node(FragmentNode::keyed("_uri", "urn:g", NodeTag::Subject));
        assert!(!f.node(ctx).optional);
    }

    #[test]
    fn unkeyed_nodes_stay_distinct() {
        let mut f = Fragment::new();
        let a = f.add_node(FragmentNode::unkeyed(BTreeMap::new(), NodeTag::Middle));
        let b = f.add_node(FragmentNode::unkeyed(BTreeMap::new(), NodeTag::Middle));
        assert_ne!(a, b);
    }

    #[test]
    fn dangling_edge_is_rejected() {
        let mut f = Fragment::new();
        let a = f.add_node(FragmentNode::keyed("_uri", "http://ex.org/a", NodeTag::Subject));
        let mut other = Fragment::new();
        other.add_node(FragmentNode::keyed("_uri", "http://ex.org/x", NodeTag::Subject));
        let far = other.add_node(FragmentNode::keyed("_uri", "http://ex.org/y", NodeTag::Object));
        let err = f.add_edge(a, "http://ex.org/p", far, EdgeKind::Relation).unwrap_err();
        assert!(matches!(err, FragmentError::DanglingEdge { node: 1, len: 1, .. }));
    }

    #[test]
    fn duplicate_edges_merge() {
        let mut f = Fragment::new();
        let a = f.add_node(FragmentNode::keyed("_uri", "http://ex.org/a", NodeTag::Subject));
        let e1 = f.add_edge(a, "http://ex.org/p", a, EdgeKind::Relation).unwrap();
        let e2 = f.add_edge(a, "http://ex.org/p", a, EdgeKind::Relation).unwrap();
        assert_eq!(e1, e2);
        assert_eq!(f.edges().len(), 1);
    }
}
