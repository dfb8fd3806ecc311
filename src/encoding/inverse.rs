//! Reassembling statements from the property graph.
//!
//! The readers recognize each topology from what is stored: a `_kind` of
//! `middle` marks a middle node, `literal` a literal vertex, and predicate
//! keyed properties on a resource vertex are dense literals. Anything else
//! reached through a predicate edge is a direct (dense or type) edge.

use std::collections::BTreeSet;

use crate::error::{QuadResult, QueryError};
use crate::model::{BlankNode, CompleteStatement, Context, Literal, Resource, Uri, Value};
use crate::store::{Direction, EdgeRecord, PropertyGraph, StoreResult, VertexId};
use crate::vocab::{LITERAL_KIND, MIDDLE_KIND, Vocabulary, decode_literal, encode_literal};

/// One stored triple occurrence and the contexts it is recorded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub subject: Resource,
    pub predicate: Uri,
    pub object: Value,
    pub contexts: BTreeSet<Context>,
}

impl Occurrence {
    pub fn into_statement(self) -> CompleteStatement {
        CompleteStatement::new(
            self.subject,
            self.predicate,
            self.object,
            self.contexts.into_iter().collect(),
        )
    }
}

fn corrupt(message: impl ToString) -> QueryError {
    QueryError::CorruptEncoding {
        message: message.to_string(),
    }
}

fn parse_uri(raw: &str) -> Result<Uri, QueryError> {
    Uri::new(raw).map_err(corrupt)
}

/// Read-only view of a graph under one vocabulary.
pub struct GraphReader<'a, G: ?Sized> {
    graph: &'a G,
    vocab: &'a Vocabulary,
}

impl<'a, G: PropertyGraph + ?Sized> GraphReader<'a, G> {
    pub fn new(graph: &'a G, vocab: &'a Vocabulary) -> Self {
        Self { graph, vocab }
    }

    fn single(&self, vertex: VertexId, key: &str) -> StoreResult<Option<String>> {
        Ok(self.graph.get_property(vertex, key)?.into_iter().next())
    }

    fn has_kind(&self, vertex: VertexId, kind: &str) -> StoreResult<bool> {
        Ok(self
            .graph
            .get_property(vertex, &self.vocab.kind_key)?
            .contains(kind))
    }

    pub fn is_middle(&self, vertex: VertexId) -> StoreResult<bool> {
        self.has_kind(vertex, MIDDLE_KIND)
    }

    pub fn is_literal_vertex(&self, vertex: VertexId) -> StoreResult<bool> {
        self.has_kind(vertex, LITERAL_KIND)
    }

    /// The vertex of a resource, if it exists.
    pub fn vertex_of(&self, resource: &Resource) -> StoreResult<Option<VertexId>> {
        match resource {
            Resource::Uri(uri) => self.graph.lookup_vertex(&self.vocab.uri_key, uri.as_str()),
            Resource::Blank(b) => self.graph.lookup_vertex(&self.vocab.blank_key, b.id()),
        }
    }

    /// The resource a keyed vertex stands for.
    pub fn resource(&self, vertex: VertexId) -> QuadResult<Option<Resource>> {
        if let Some(uri) = self.single(vertex, &self.vocab.uri_key)? {
            return Ok(Some(Resource::Uri(parse_uri(&uri)?)));
        }
        if let Some(id) = self.single(vertex, &self.vocab.blank_key)? {
            return Ok(Some(Resource::Blank(BlankNode::new(id).map_err(corrupt)?)));
        }
        Ok(None)
    }

    /// A literal stored as value/datatype/language properties.
    fn literal_at(&self, vertex: VertexId) -> QuadResult<Option<Literal>> {
        let Some(value) = self.single(vertex, &self.vocab.literal_value_key)? else {
            return Ok(None);
        };
        let datatype = self
            .single(vertex, &self.vocab.literal_datatype_key)?
            .map(|d| parse_uri(&d))
            .transpose()?;
        let language = self.single(vertex, &self.vocab.literal_language_key)?;
        let literal = Literal::from_parts(value, datatype, language).map_err(corrupt)?;
        Ok(Some(literal))
    }

    fn parse_contexts(&self, values: BTreeSet<String>) -> QuadResult<BTreeSet<Context>> {
        values
            .iter()
            .map(|v| -> QuadResult<Context> { Ok(Context::Named(parse_uri(v)?)) })
            .collect()
    }

    /// Reassemble the triple a middle node stands for.
    pub fn read_middle(&self, middle: VertexId) -> QuadResult<Option<Occurrence>> {
        let incoming: Vec<EdgeRecord> = self
            .graph
            .find_edges(middle, None, Direction::Incoming)?
            .into_iter()
            .filter(|e| !self.vocab.is_internal(&e.label))
            .collect();
        let [edge] = incoming.as_slice() else {
            tracing::warn!(%middle, edges = incoming.len(), "middle node without a single subject edge");
            return Ok(None);
        };
        let predicate = parse_uri(&edge.label)?;
        let Some(subject) = self.resource(edge.start)? else {
            tracing::warn!(%middle, start = %edge.start, "middle node subject has no identity");
            return Ok(None);
        };

        let object = match self.literal_at(middle)? {
            Some(literal) => Value::Literal(literal),
            None => {
                let outgoing = self
                    .graph
                    .find_edges(middle, Some(&edge.label), Direction::Outgoing)?;
                let [target] = outgoing.as_slice() else {
                    tracing::warn!(%middle, edges = outgoing.len(), "middle node without a single object edge");
                    return Ok(None);
                };
                let object = if self.is_literal_vertex(target.end)? {
                    self.literal_at(target.end)?.map(Value::Literal)
                } else {
                    self.resource(target.end)?.map(Value::Resource)
                };
                let Some(object) = object else {
                    tracing::warn!(%middle, end = %target.end, "middle node object has no identity");
                    return Ok(None);
                };
                object
            }
        };

        let mut contexts = BTreeSet::new();
        for e in self
            .graph
            .find_edges(middle, Some(&self.vocab.context_edge_label), Direction::Outgoing)?
        {
            match self.resource(e.end)? {
                Some(Resource::Uri(uri)) => {
                    contexts.insert(Context::Named(uri));
                }
                _ => tracing::warn!(%middle, end = %e.end, "context edge to a vertex without a URI"),
            }
        }
        contexts.extend(
            self.parse_contexts(self.graph.get_property(middle, &self.vocab.contexts_key)?)?,
        );

        Ok(Some(Occurrence {
            subject,
            predicate,
            object,
            contexts,
        }))
    }

    /// A direct `S -p-> O` edge.
    pub fn read_direct(&self, edge: &EdgeRecord) -> QuadResult<Option<Occurrence>> {
        let predicate = parse_uri(&edge.label)?;
        let (Some(subject), Some(object)) = (self.resource(edge.start)?, self.resource(edge.end)?)
        else {
            tracing::warn!(edge = %edge.id, "direct edge between vertices without identity");
            return Ok(None);
        };
        let contexts =
            self.parse_contexts(self.graph.get_edge_property(edge.id, &self.vocab.contexts_key)?)?;
        Ok(Some(Occurrence {
            subject,
            predicate,
            object: Value::Resource(object),
            contexts,
        }))
    }

    /// Literals stored as predicate properties on a subject vertex.
    pub fn dense_literals(
        &self,
        subject_vertex: VertexId,
        predicate: Option<&Uri>,
    ) -> QuadResult<Vec<Occurrence>> {
        let keys: Vec<String> = self
            .graph
            .property_keys(subject_vertex)?
            .into_iter()
            .filter(|k| !self.vocab.is_internal(k))
            .filter(|k| predicate.is_none_or(|p| p.as_str() == k.as_str()))
            .collect();
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let Some(subject) = self.resource(subject_vertex)? else {
            tracing::warn!(vertex = %subject_vertex, "literal properties on a vertex without identity");
            return Ok(Vec::new());
        };
        let mut found = Vec::new();
        for key in keys {
            let predicate = parse_uri(&key)?;
            for encoded in self.graph.get_property(subject_vertex, &key)? {
                let literal = decode_literal(&encoded).map_err(corrupt)?;
                let guard = self.vocab.literal_context_key(&predicate, &encoded);
                let contexts =
                    self.parse_contexts(self.graph.get_property(subject_vertex, &guard)?)?;
                found.push(Occurrence {
                    subject: subject.clone(),
                    predicate: predicate.clone(),
                    object: Value::Literal(literal),
                    contexts,
                });
            }
        }
        Ok(found)
    }

    /// Everything stated about a subject vertex.
    pub fn from_subject(
        &self,
        subject: VertexId,
        predicate: Option<&Uri>,
    ) -> QuadResult<Vec<Occurrence>> {
        let mut found = Vec::new();
        for edge in self
            .graph
            .find_edges(subject, predicate.map(Uri::as_str), Direction::Outgoing)?
        {
            if self.vocab.is_internal(&edge.label) {
                continue;
            }
            let occurrence = if self.is_middle(edge.end)? {
                self.read_middle(edge.end)?
            } else {
                self.read_direct(&edge)?
            };
            found.extend(occurrence);
        }
        found.extend(self.dense_literals(subject, predicate)?);
        Ok(found)
    }

    /// Everything pointing at an object vertex.
    pub fn to_object(&self, object: VertexId, predicate: Option<&Uri>) -> QuadResult<Vec<Occurrence>> {
        let mut found = Vec::new();
        for edge in self
            .graph
            .find_edges(object, predicate.map(Uri::as_str), Direction::Incoming)?
        {
            if self.vocab.is_internal(&edge.label) {
                continue;
            }
            let occurrence = if self.is_middle(edge.start)? {
                self.read_middle(edge.start)?
            } else {
                self.read_direct(&edge)?
            };
            found.extend(occurrence);
        }
        Ok(found)
    }

    /// Every occurrence of a literal, through the literal value index.
    pub fn with_literal(&self, literal: &Literal) -> QuadResult<Vec<Occurrence>> {
        let encoded = encode_literal(literal);
        let mut found = Vec::new();
        for vertex in self
            .graph
            .lookup_vertices_by_value(&self.vocab.literal_index_key, &encoded)?
        {
            if self.is_middle(vertex)? {
                found.extend(self.read_middle(vertex)?);
            } else if self.is_literal_vertex(vertex)? {
                for edge in self.graph.find_edges(vertex, None, Direction::Incoming)? {
                    if !self.vocab.is_internal(&edge.label) && self.is_middle(edge.start)? {
                        found.extend(self.read_middle(edge.start)?);
                    }
                }
            } else {
                found.extend(self.dense_literals(vertex, None)?);
            }
        }
        found.retain(|o| matches!(&o.object, Value::Literal(l) if l == literal));
        Ok(found)
    }

    /// Every occurrence recorded in a named context.
    pub fn in_context(&self, context: &Uri) -> QuadResult<Vec<Occurrence>> {
        let mut found = Vec::new();
        if let Some(ctx) = self.graph.lookup_vertex(&self.vocab.uri_key, context.as_str())? {
            for edge in self.graph.find_edges(
                ctx,
                Some(&self.vocab.context_edge_label),
                Direction::Incoming,
            )? {
                found.extend(self.read_middle(edge.start)?);
            }
        }
        for vertex in self
            .graph
            .lookup_vertices_by_value(&self.vocab.context_index_key, context.as_str())?
        {
            if self.is_middle(vertex)? {
                found.extend(self.read_middle(vertex)?);
                continue;
            }
            let label = self.vocab.type_predicate.as_str();
            for edge in self
                .graph
                .find_edges(vertex, Some(label), Direction::Outgoing)?
            {
                found.extend(self.read_direct(&edge)?);
            }
        }
        let wanted = Context::Named(context.clone());
        found.retain(|o| o.contexts.contains(&wanted));
        Ok(found)
    }
}
