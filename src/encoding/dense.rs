//! Dense topology: two nodes, contexts recorded as properties.

use crate::error::FragmentError;
use crate::fragment::{
    EdgeKind, Fragment, FulltextEntry, GuardedValue, IndexEntry, IndexRelease, NodeRef,
};
use crate::model::Literal;
use crate::vocab::encode_literal;

use super::Shape;

/// `S -p-> O`, the edge listing the statement's named contexts.
pub(super) fn object(
    fragment: &mut Fragment,
    shape: &Shape<'_>,
    subject: NodeRef,
    object: NodeRef,
) -> Result<(), FragmentError> {
    let edge = fragment.add_edge(subject, shape.predicate.as_str(), object, EdgeKind::Relation)?;
    for ctx in shape.context_uris() {
        fragment
            .edge_mut(edge)
            .add_property(&shape.vocab.contexts_key, ctx.as_str());
    }
    Ok(())
}

/// The encoded literal under the predicate key of the subject, with a
/// sibling property holding that value's contexts.
pub(super) fn literal(
    fragment: &mut Fragment,
    shape: &Shape<'_>,
    subject: NodeRef,
    literal: &Literal,
    fulltext: bool,
) {
    let vocab = shape.vocab;
    let encoded = encode_literal(literal);
    let guard_key = vocab.literal_context_key(shape.predicate, &encoded);
    let node = fragment.node_mut(subject);
    for ctx in shape.context_uris() {
        node.add_property(&guard_key, ctx.as_str());
    }
    node.guarded.push(GuardedValue {
        key: shape.predicate.as_str().to_string(),
        value: encoded.clone(),
        guard_key,
    });
    node.index_entries.push(IndexEntry {
        key: vocab.literal_index_key.clone(),
        value: encoded,
        release: IndexRelease::WhenNoProperty { key: None },
    });
    if fulltext {
        node.fulltext.push(FulltextEntry {
            predicate: shape.predicate.as_str().to_string(),
            value: literal.value().to_string(),
        });
    }
}
