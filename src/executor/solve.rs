//! Bounded structural matching of unkeyed fragment nodes.
//!
//! Unkeyed nodes are resolved one at a time, each anchored on a structural
//! edge to a node that is already resolved, so the search never leaves the
//! one/two-hop neighbourhood of the keyed vertices. Candidates are tried in
//! edge creation order and the first complete assignment wins.

use crate::fragment::{Fragment, NodeIdentity, NodeRef};
use crate::store::{Direction, PropertyGraph, StoreResult, VertexId};

pub(crate) struct Matcher<'a, G: ?Sized> {
    graph: &'a G,
    fragment: &'a Fragment,
}

/// A structural edge from an unresolved node to a resolved one.
struct Anchor<'f> {
    label: &'f str,
    vertex: VertexId,
    /// The unresolved node is the edge's start.
    node_is_start: bool,
}

impl<'a, G: PropertyGraph + ?Sized> Matcher<'a, G> {
    pub fn new(graph: &'a G, fragment: &'a Fragment) -> Self {
        Self { graph, fragment }
    }

    /// Extend `assigned` (one slot per fragment node, keyed slots already
    /// filled) to every unkeyed node. On failure the unkeyed slots are left
    /// empty.
    pub fn solve(&self, assigned: &mut [Option<VertexId>]) -> StoreResult<bool> {
        let pending: Vec<NodeRef> = self
            .fragment
            .nodes()
            .filter(|(r, n)| !n.is_keyed() && assigned[r.index()].is_none())
            .map(|(r, _)| r)
            .collect();
        self.search(&pending, assigned)
    }

    fn search(&self, pending: &[NodeRef], assigned: &mut [Option<VertexId>]) -> StoreResult<bool> {
        if pending.is_empty() {
            return Ok(true);
        }
        let Some((pos, anchor)) = pending
            .iter()
            .enumerate()
            .find_map(|(i, n)| self.anchor(*n, assigned).map(|a| (i, a)))
        else {
            tracing::trace!(pending = pending.len(), "no anchored node left to match");
            return Ok(false);
        };
        let node = pending[pos];
        let rest: Vec<NodeRef> = pending
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != pos)
            .map(|(_, n)| *n)
            .collect();

        for candidate in self.candidates(&anchor)? {
            if assigned.contains(&Some(candidate)) {
                continue;
            }
            if !self.identity_matches(node, candidate)? {
                continue;
            }
            if !self.constraints_hold(node, candidate, assigned)? {
                continue;
            }
            tracing::trace!(node = node.index(), %candidate, "trying candidate");
            assigned[node.index()] = Some(candidate);
            if self.search(&rest, assigned)? {
                return Ok(true);
            }
            assigned[node.index()] = None;
        }
        Ok(false)
    }

    fn anchor(&self, node: NodeRef, assigned: &[Option<VertexId>]) -> Option<Anchor<'a>> {
        self.fragment
            .structural_edges_of(node)
            .find_map(|(edge, neighbour, node_is_start)| {
                assigned[neighbour.index()].map(|vertex| Anchor {
                    label: edge.label.as_str(),
                    vertex,
                    node_is_start,
                })
            })
    }

    fn candidates(&self, anchor: &Anchor<'_>) -> StoreResult<Vec<VertexId>> {
        let direction = if anchor.node_is_start {
            Direction::Incoming
        } else {
            Direction::Outgoing
        };
        let mut found: Vec<VertexId> = Vec::new();
        for edge in self
            .graph
            .find_edges(anchor.vertex, Some(anchor.label), direction)?
        {
            let candidate = edge.other(anchor.vertex);
            if !found.contains(&candidate) {
                found.push(candidate);
            }
        }
        Ok(found)
    }

    fn identity_matches(&self, node: NodeRef, candidate: VertexId) -> StoreResult<bool> {
        let NodeIdentity::Unkeyed { properties } = &self.fragment.node(node).identity else {
            return Ok(false);
        };
        for (key, expected) in properties {
            let actual = self.graph.get_property(candidate, key)?;
            let ok = match expected {
                Some(value) => actual.len() == 1 && actual.contains(value),
                None => actual.is_empty(),
            };
            if !ok {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Every structural edge between `node` and an assigned node exists.
    fn constraints_hold(
        &self,
        node: NodeRef,
        candidate: VertexId,
        assigned: &[Option<VertexId>],
    ) -> StoreResult<bool> {
        for (edge, neighbour, node_is_start) in self.fragment.structural_edges_of(node) {
            let other = if neighbour == node {
                Some(candidate)
            } else {
                assigned[neighbour.index()]
            };
            let Some(other) = other else {
                continue;
            };
            let (from, to) = if node_is_start {
                (candidate, other)
            } else {
                (other, candidate)
            };
            let exists = self
                .graph
                .find_edges(from, Some(&edge.label), Direction::Outgoing)?
                .iter()
                .any(|e| e.end == to);
            if !exists {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
