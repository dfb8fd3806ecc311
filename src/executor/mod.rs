//! Graph executor: merges fragments into, and subtracts them from, a
//! property graph.
//!
//! `apply` is idempotent: keyed vertices are looked up before being created,
//! unkeyed middle/literal vertices are matched structurally, and properties
//! and edges are merged with set semantics. `remove` is its mirror and ends
//! with garbage collection of everything the statement alone kept alive.
//!
//! Both run inside a transaction owned by the caller.

mod solve;

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use crate::fragment::{
    EdgeKind, Fragment, FragmentNode, FulltextEntry, IndexRelease, NodeIdentity, NodeTag,
};
use crate::fulltext::TextIndex;
use crate::store::{Direction, EdgeId, PropertyGraph, StoreResult, VertexId};
use crate::vocab::{LITERAL_KIND, Vocabulary};

use solve::Matcher;

/// What [`GraphExecutor::apply`] created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub created_vertices: usize,
    pub created_edges: usize,
}

/// What [`GraphExecutor::remove`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalReport {
    /// Whether the graph changed at all.
    pub removed: bool,
    pub deleted_vertices: usize,
    pub deleted_edges: usize,
}

/// Applies and removes fragments.
#[derive(Clone)]
pub struct GraphExecutor {
    vocab: Arc<Vocabulary>,
    text_index: Option<Arc<dyn TextIndex>>,
}

impl std::fmt::Debug for GraphExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphExecutor")
            .field("text_index", &self.text_index.is_some())
            .finish()
    }
}

/// First `from -label-> to` edge in creation order.
fn find_edge<G: PropertyGraph + ?Sized>(
    graph: &G,
    from: VertexId,
    label: &str,
    to: VertexId,
) -> StoreResult<Option<EdgeId>> {
    Ok(graph
        .find_edges(from, Some(label), Direction::Outgoing)?
        .into_iter()
        .find(|e| e.end == to)
        .map(|e| e.id))
}

impl GraphExecutor {
    pub fn new(vocab: Arc<Vocabulary>) -> Self {
        Self {
            vocab,
            text_index: None,
        }
    }

    pub fn with_text_index(mut self, index: Arc<dyn TextIndex>) -> Self {
        self.text_index = Some(index);
        self
    }

    /// Merge `fragment` into the graph, creating only what is missing.
    pub fn apply<G: PropertyGraph + ?Sized>(
        &self,
        graph: &mut G,
        fragment: &Fragment,
    ) -> StoreResult<ApplyReport> {
        let mut report = ApplyReport::default();
        let mut assigned: Vec<Option<VertexId>> = vec![None; fragment.node_count()];

        for (r, node) in fragment.nodes() {
            if let NodeIdentity::Keyed { key, value } = &node.identity {
                let vertex = match graph.lookup_vertex(key, value)? {
                    Some(v) => v,
                    None => {
                        let v = graph.create_vertex()?;
                        graph.add_property_value(v, key, value)?;
                        graph.register_key(v, key, value)?;
                        report.created_vertices += 1;
                        v
                    }
                };
                assigned[r.index()] = Some(vertex);
            }
        }

        let matched = Matcher::new(&*graph, fragment).solve(&mut assigned)?;
        if !matched {
            tracing::trace!("no existing structure matched, creating unkeyed nodes");
        }

        let mut vertices = Vec::with_capacity(fragment.node_count());
        for (r, node) in fragment.nodes() {
            let vertex = match assigned[r.index()] {
                Some(v) => v,
                None => {
                    let v = graph.create_vertex()?;
                    if let NodeIdentity::Unkeyed { properties } = &node.identity {
                        for (key, value) in properties {
                            if let Some(value) = value {
                                graph.add_property_value(v, key, value)?;
                            }
                        }
                    }
                    report.created_vertices += 1;
                    v
                }
            };
            vertices.push(vertex);
        }

        for (r, node) in fragment.nodes() {
            let v = vertices[r.index()];
            for (key, values) in &node.properties {
                for value in values {
                    graph.add_property_value(v, key, value)?;
                }
            }
            for guarded in &node.guarded {
                graph.add_property_value(v, &guarded.key, &guarded.value)?;
            }
            for entry in &node.index_entries {
                graph.index_vertex(v, &entry.key, &entry.value)?;
            }
        }

        for edge in fragment.edges() {
            let from = vertices[edge.start.index()];
            let to = vertices[edge.end.index()];
            let id = match find_edge(&*graph, from, &edge.label, to)? {
                Some(id) => id,
                None => {
                    report.created_edges += 1;
                    graph.create_edge(from, &edge.label, to)?
                }
            };
            for (key, values) in &edge.properties {
                for value in values {
                    graph.add_edge_property_value(id, key, value)?;
                }
            }
        }

        for (r, node) in fragment.nodes() {
            for entry in &node.fulltext {
                self.index_text(vertices[r.index()], entry);
            }
        }

        tracing::debug!(
            created_vertices = report.created_vertices,
            created_edges = report.created_edges,
            "applied fragment"
        );
        Ok(report)
    }

    /// Subtract `fragment` from the graph and reclaim what it alone used.
    ///
    /// Removing something that isn't there is a no-op.
    pub fn remove<G: PropertyGraph + ?Sized>(
        &self,
        graph: &mut G,
        fragment: &Fragment,
    ) -> StoreResult<RemovalReport> {
        let vocab = self.vocab.as_ref();
        let mut report = RemovalReport::default();
        let n = fragment.node_count();
        let mut assigned: Vec<Option<VertexId>> = vec![None; n];

        for (r, node) in fragment.nodes() {
            if let NodeIdentity::Keyed { key, value } = &node.identity {
                match graph.lookup_vertex(key, value)? {
                    Some(v) => assigned[r.index()] = Some(v),
                    None if node.optional => {}
                    None => {
                        tracing::debug!(%key, %value, "removal target absent");
                        return Ok(report);
                    }
                }
            }
        }
        if !Matcher::new(&*graph, fragment).solve(&mut assigned)? {
            tracing::debug!("no matching structure, nothing to remove");
            return Ok(report);
        }

        let mut touched: BTreeSet<VertexId> = fragment
            .nodes()
            .filter(|(_, node)| node.is_keyed())
            .filter_map(|(r, _)| assigned[r.index()])
            .collect();

        // Properties, then guarded values whose guard emptied.
        let mut emptied_keys: Vec<BTreeSet<&str>> = vec![BTreeSet::new(); n];
        let mut released: Vec<BTreeSet<&str>> = vec![BTreeSet::new(); n];
        for (r, node) in fragment.nodes() {
            let Some(v) = assigned[r.index()] else {
                continue;
            };
            for (key, values) in &node.properties {
                for value in values {
                    if graph.remove_property_value(v, key, value)? {
                        emptied_keys[r.index()].insert(key.as_str());
                        report.removed = true;
                    }
                }
            }
            for guarded in &node.guarded {
                let requested = node
                    .properties
                    .get(&guarded.guard_key)
                    .is_some_and(|s| !s.is_empty());
                let removed_any = emptied_keys[r.index()].contains(guarded.guard_key.as_str());
                let guard_empty = graph.get_property(v, &guarded.guard_key)?.is_empty();
                if guard_empty
                    && (!requested || removed_any)
                    && graph.remove_property_value(v, &guarded.key, &guarded.value)?
                {
                    released[r.index()].insert(guarded.key.as_str());
                    report.removed = true;
                }
            }
        }

        // Edges. Structural ones go with their middle node.
        let mut contexts_requested = vec![false; n];
        let mut contexts_removed = vec![false; n];
        for edge in fragment.edges() {
            if edge.kind == EdgeKind::Context {
                contexts_requested[edge.start.index()] = true;
            }
            let (Some(from), Some(to)) = (assigned[edge.start.index()], assigned[edge.end.index()])
            else {
                continue;
            };
            match edge.kind {
                EdgeKind::Structural => {}
                EdgeKind::Context => {
                    if let Some(id) = find_edge(&*graph, from, &edge.label, to)? {
                        if graph.delete_edge(id)? {
                            contexts_removed[edge.start.index()] = true;
                            report.deleted_edges += 1;
                            report.removed = true;
                        }
                    }
                }
                EdgeKind::Relation => {
                    let Some(id) = find_edge(&*graph, from, &edge.label, to)? else {
                        continue;
                    };
                    let mut removed_any = false;
                    for (key, values) in &edge.properties {
                        for value in values {
                            if graph.remove_edge_property_value(id, key, value)? {
                                removed_any = true;
                                report.removed = true;
                            }
                        }
                    }
                    let requested = edge.properties.values().any(|s| !s.is_empty());
                    if graph.edge_property_keys(id)?.is_empty()
                        && (!requested || removed_any)
                        && graph.delete_edge(id)?
                    {
                        report.deleted_edges += 1;
                        report.removed = true;
                    }
                }
            }
        }

        // Middle nodes that no longer record any context.
        let mut dead: HashSet<VertexId> = HashSet::new();
        for (r, node) in fragment.nodes() {
            if !node.has_tag(NodeTag::Middle) {
                continue;
            }
            let Some(m) = assigned[r.index()] else {
                continue;
            };
            let requested = contexts_requested[r.index()] || requests_contexts(vocab, node);
            let removed_any = contexts_removed[r.index()]
                || emptied_keys[r.index()].contains(vocab.contexts_key.as_str());
            if !self.middle_is_dead(&*graph, m)? || (requested && !removed_any) {
                continue;
            }
            let mut owned = Vec::new();
            let incident = graph.find_edges(m, None, Direction::Both)?;
            for edge in &incident {
                let other = edge.other(m);
                if other == m {
                    continue;
                }
                if graph.get_property(other, &vocab.kind_key)?.contains(LITERAL_KIND) {
                    owned.push(other);
                } else {
                    touched.insert(other);
                }
            }
            if graph.delete_vertex(m)? {
                dead.insert(m);
                report.deleted_vertices += 1;
                report.deleted_edges += incident.len();
                report.removed = true;
            }
            for literal in owned {
                let edges = graph.find_edges(literal, None, Direction::Both)?.len();
                if graph.delete_vertex(literal)? {
                    dead.insert(literal);
                    report.deleted_vertices += 1;
                    report.deleted_edges += edges;
                }
            }
        }

        // Secondary index entries whose condition no longer holds.
        for (r, node) in fragment.nodes() {
            let Some(v) = assigned[r.index()] else {
                continue;
            };
            if dead.contains(&v) || !graph.vertex_exists(v)? {
                continue;
            }
            for entry in &node.index_entries {
                let release = match &entry.release {
                    IndexRelease::WithVertex => false,
                    IndexRelease::WhenNoProperty { key: Some(key) } => {
                        !graph.get_property(v, key)?.contains(&entry.value)
                    }
                    IndexRelease::WhenNoProperty { key: None } => {
                        !self.any_property_holds(&*graph, v, &entry.value)?
                    }
                    IndexRelease::WhenNoEdgeProperty { label, key } => {
                        !any_edge_records(&*graph, v, label, key, &entry.value)?
                    }
                };
                if release {
                    graph.unindex_vertex(v, &entry.key, &entry.value)?;
                }
            }
        }

        for (r, node) in fragment.nodes() {
            let Some(v) = assigned[r.index()] else {
                continue;
            };
            for entry in &node.fulltext {
                if dead.contains(&v) || released[r.index()].contains(entry.predicate.as_str()) {
                    self.unindex_text(v, entry);
                }
            }
        }

        for vertex in touched {
            if !graph.vertex_exists(vertex)? || graph.has_edges(vertex)? {
                continue;
            }
            if self.only_identity_left(&*graph, vertex)? && graph.delete_vertex(vertex)? {
                report.deleted_vertices += 1;
                report.removed = true;
            }
        }

        tracing::debug!(
            removed = report.removed,
            deleted_vertices = report.deleted_vertices,
            deleted_edges = report.deleted_edges,
            "removed fragment"
        );
        Ok(report)
    }

    fn middle_is_dead<G: PropertyGraph + ?Sized>(&self, graph: &G, m: VertexId) -> StoreResult<bool> {
        let vocab = self.vocab.as_ref();
        Ok(graph
            .find_edges(m, Some(&vocab.context_edge_label), Direction::Outgoing)?
            .is_empty()
            && graph.get_property(m, &vocab.contexts_key)?.is_empty())
    }

    fn any_property_holds<G: PropertyGraph + ?Sized>(
        &self,
        graph: &G,
        v: VertexId,
        value: &str,
    ) -> StoreResult<bool> {
        for key in graph.property_keys(v)? {
            if !self.vocab.is_internal(&key) && graph.get_property(v, &key)?.contains(value) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// A keyed vertex whose only property is its identity key.
    fn only_identity_left<G: PropertyGraph + ?Sized>(
        &self,
        graph: &G,
        v: VertexId,
    ) -> StoreResult<bool> {
        let keys = graph.property_keys(v)?;
        Ok(matches!(keys.as_slice(), [k] if *k == self.vocab.uri_key || *k == self.vocab.blank_key))
    }

    fn index_text(&self, vertex: VertexId, entry: &FulltextEntry) {
        if let Some(index) = &self.text_index {
            if let Err(err) = index.index(vertex, &entry.predicate, &entry.value) {
                tracing::warn!(%vertex, predicate = %entry.predicate, error = %err, "fulltext indexing failed");
            }
        }
    }

    fn unindex_text(&self, vertex: VertexId, entry: &FulltextEntry) {
        if let Some(index) = &self.text_index {
            if let Err(err) = index.remove(vertex, &entry.predicate, &entry.value) {
                tracing::warn!(%vertex, predicate = %entry.predicate, error = %err, "fulltext removal failed");
            }
        }
    }
}

fn requests_contexts(vocab: &Vocabulary, node: &FragmentNode) -> bool {
    node.properties
        .get(&vocab.contexts_key)
        .is_some_and(|s| !s.is_empty())
}

fn any_edge_records<G: PropertyGraph + ?Sized>(
    graph: &G,
    v: VertexId,
    label: &str,
    key: &str,
    value: &str,
) -> StoreResult<bool> {
    for edge in graph.find_edges(v, Some(label), Direction::Outgoing)? {
        if graph.get_edge_property(edge.id, key)?.contains(value) {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{EncodingPolicy, StatementEncoder};
    use crate::fulltext::{MemTextIndex, TextIndexError, TextIndexResult};
    use crate::model::{CompleteStatement, Context, Literal, Uri};
    use crate::store::{GraphStore, MemGraph, Transaction};

    fn uri(s: &str) -> Uri {
        Uri::new(s).unwrap()
    }

    fn ctx(s: &str) -> Context {
        Context::named(uri(s))
    }

    fn knows(contexts: Vec<Context>) -> CompleteStatement {
        CompleteStatement::new(
            uri("http://ex.org/emil"),
            uri("http://ex.org/knows"),
            uri("http://ex.org/johan"),
            contexts,
        )
    }

    fn setup(policy: EncodingPolicy) -> (StatementEncoder, GraphExecutor) {
        let vocab = Arc::new(Vocabulary::default());
        (
            StatementEncoder::new(policy, vocab.clone()),
            GraphExecutor::new(vocab),
        )
    }

    #[test]
    fn apply_is_idempotent() {
        for policy in EncodingPolicy::ALL {
            let (enc, exec) = setup(policy);
            let graph = MemGraph::new();
            let mut tx = graph.begin().unwrap();
            let f = enc.to_fragment(&knows(vec![ctx("urn:ctx:public")])).unwrap();
            let first = exec.apply(&mut tx, &f).unwrap();
            assert!(first.created_vertices > 0);
            let (v, e) = (tx.vertex_count(), tx.edge_count());
            let second = exec.apply(&mut tx, &f).unwrap();
            assert_eq!(second, ApplyReport::default(), "{policy}");
            assert_eq!((tx.vertex_count(), tx.edge_count()), (v, e));
            tx.commit().unwrap();
        }
    }

    #[test]
    fn second_context_reuses_the_middle() {
        let (enc, exec) = setup(EncodingPolicy::VerboseQuad);
        let graph = MemGraph::new();
        let mut tx = graph.begin().unwrap();
        exec.apply(&mut tx, &enc.to_fragment(&knows(vec![ctx("urn:ctx:public")])).unwrap())
            .unwrap();
        let report = exec
            .apply(&mut tx, &enc.to_fragment(&knows(vec![ctx("urn:ctx:private")])).unwrap())
            .unwrap();
        // only the new context vertex and its edge
        assert_eq!(report.created_vertices, 1);
        assert_eq!(report.created_edges, 1);
    }

    #[test]
    fn remove_reclaims_everything() {
        for policy in EncodingPolicy::ALL {
            let (enc, exec) = setup(policy);
            let graph = MemGraph::new();
            let mut tx = graph.begin().unwrap();
            let st = knows(vec![ctx("urn:ctx:public"), ctx("urn:ctx:private")]);
            let f = enc.to_fragment(&st).unwrap();
            exec.apply(&mut tx, &f).unwrap();
            let report = exec.remove(&mut tx, &f).unwrap();
            assert!(report.removed);
            assert_eq!(tx.vertex_count(), 0, "{policy}");
            assert_eq!(tx.edge_count(), 0, "{policy}");
        }
    }

    #[test]
    fn removing_one_context_keeps_the_other() {
        for policy in EncodingPolicy::ALL {
            let (enc, exec) = setup(policy);
            let graph = MemGraph::new();
            let mut tx = graph.begin().unwrap();
            let both = knows(vec![ctx("urn:ctx:public"), ctx("urn:ctx:private")]);
            exec.apply(&mut tx, &enc.to_fragment(&both).unwrap()).unwrap();
            let public = enc.to_fragment(&knows(vec![ctx("urn:ctx:public")])).unwrap();
            exec.remove(&mut tx, &public).unwrap();
            let emil = tx.lookup_vertex("_uri", "http://ex.org/emil").unwrap();
            assert!(emil.is_some(), "{policy}");
            assert!(tx.has_edges(emil.unwrap()).unwrap());
        }
    }

    #[test]
    fn removing_a_context_keeps_default_graph_occurrence() {
        for policy in EncodingPolicy::ALL {
            let (enc, exec) = setup(policy);
            let graph = MemGraph::new();
            let mut tx = graph.begin().unwrap();
            exec.apply(&mut tx, &enc.to_fragment(&knows(Vec::new())).unwrap())
                .unwrap();
            let (v, e) = (tx.vertex_count(), tx.edge_count());
            let report = exec
                .remove(&mut tx, &enc.to_fragment(&knows(vec![ctx("urn:ctx:public")])).unwrap())
                .unwrap();
            assert!(!report.removed, "{policy}");
            assert_eq!((tx.vertex_count(), tx.edge_count()), (v, e));
        }
    }

    #[test]
    fn removing_absent_statement_is_a_noop() {
        let (enc, exec) = setup(EncodingPolicy::AlwaysMiddle);
        let graph = MemGraph::new();
        let mut tx = graph.begin().unwrap();
        let report = exec
            .remove(&mut tx, &enc.to_fragment(&knows(Vec::new())).unwrap())
            .unwrap();
        assert_eq!(report, RemovalReport::default());
    }

    #[test]
    fn shared_subject_survives_removal_of_one_statement() {
        for policy in EncodingPolicy::ALL {
            let (enc, exec) = setup(policy);
            let graph = MemGraph::new();
            let mut tx = graph.begin().unwrap();
            let nick = CompleteStatement::in_default_graph(
                uri("http://ex.org/emil"),
                uri("http://ex.org/nick"),
                Literal::plain("Emil"),
            );
            exec.apply(&mut tx, &enc.to_fragment(&nick).unwrap()).unwrap();
            exec.apply(&mut tx, &enc.to_fragment(&knows(Vec::new())).unwrap())
                .unwrap();
            exec.remove(&mut tx, &enc.to_fragment(&knows(Vec::new())).unwrap())
                .unwrap();
            assert!(
                tx.lookup_vertex("_uri", "http://ex.org/emil").unwrap().is_some(),
                "{policy}"
            );
            assert!(
                tx.lookup_vertex("_uri", "http://ex.org/johan").unwrap().is_none(),
                "{policy}"
            );
            exec.remove(&mut tx, &enc.to_fragment(&nick).unwrap()).unwrap();
            assert_eq!(tx.vertex_count(), 0, "{policy}");
            let encoded = crate::vocab::encode_literal(&Literal::plain("Emil"));
            assert!(tx.lookup_vertices_by_value("_literal", &encoded).unwrap().is_empty());
        }
    }

    #[test]
    fn fulltext_follows_the_literal() {
        let vocab = Arc::new(Vocabulary::default());
        let name = uri("http://ex.org/name");
        let index = Arc::new(MemTextIndex::new());
        for policy in EncodingPolicy::ALL {
            let enc = StatementEncoder::new(policy, vocab.clone()).with_fulltext(
                crate::config::FulltextConfig {
                    all: true,
                    predicates: BTreeSet::new(),
                },
            );
            let exec = GraphExecutor::new(vocab.clone()).with_text_index(index.clone());
            let graph = MemGraph::new();
            let mut tx = graph.begin().unwrap();
            let st = CompleteStatement::in_default_graph(
                uri("http://ex.org/emil"),
                name.clone(),
                Literal::plain("Emil Eifrem"),
            );
            let f = enc.to_fragment(&st).unwrap();
            exec.apply(&mut tx, &f).unwrap();
            assert_eq!(index.search("eifrem").len(), 1, "{policy}");
            exec.remove(&mut tx, &f).unwrap();
            assert!(index.search("eifrem").is_empty(), "{policy}");
        }
    }

    struct BrokenIndex;

    impl TextIndex for BrokenIndex {
        fn index(&self, _: VertexId, _: &str, _: &str) -> TextIndexResult<()> {
            Err(TextIndexError::Unavailable {
                message: "offline".into(),
            })
        }

        fn remove(&self, _: VertexId, _: &str, _: &str) -> TextIndexResult<()> {
            Err(TextIndexError::Unavailable {
                message: "offline".into(),
            })
        }
    }

    #[test]
    fn fulltext_failure_does_not_abort_apply() {
        let vocab = Arc::new(Vocabulary::default());
        let enc = StatementEncoder::new(EncodingPolicy::Dense, vocab.clone()).with_fulltext(
            crate::config::FulltextConfig {
                all: true,
                predicates: BTreeSet::new(),
            },
        );
        let exec = GraphExecutor::new(vocab).with_text_index(Arc::new(BrokenIndex));
        let graph = MemGraph::new();
        let mut tx = graph.begin().unwrap();
        let st = CompleteStatement::in_default_graph(
            uri("http://ex.org/emil"),
            uri("http://ex.org/name"),
            Literal::plain("Emil"),
        );
        let f = enc.to_fragment(&st).unwrap();
        exec.apply(&mut tx, &f).unwrap();
        assert_eq!(tx.vertex_count(), 1);
        exec.remove(&mut tx, &f).unwrap();
        assert_eq!(tx.vertex_count(), 0);
    }
}
