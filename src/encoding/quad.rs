//! Verbose-quad topology: a middle node per triple, fanned out to one context
//! vertex per named context.

use crate::error::FragmentError;
use crate::fragment::{
    EdgeKind, Fragment, FragmentNode, FulltextEntry, IndexEntry, IndexRelease, NodeRef, NodeTag,
};
use crate::model::Literal;
use crate::vocab::encode_literal;

use super::{Shape, literal_identity, middle_identity};

/// `S -p-> M -p-> O`, `M -_context-> C`.
pub(super) fn object(
    fragment: &mut Fragment,
    shape: &Shape<'_>,
    subject: NodeRef,
    object: NodeRef,
) -> Result<(), FragmentError> {
    let middle = fragment.add_node(FragmentNode::unkeyed(
        middle_identity(shape.vocab, None),
        NodeTag::Middle,
    ));
    let label = shape.predicate.as_str();
    fragment.add_edge(subject, label, middle, EdgeKind::Structural)?;
    fragment.add_edge(middle, label, object, EdgeKind::Structural)?;
    fan_out(fragment, shape, middle)
}

/// `S -p-> M -p-> L`, `M -_context-> C`, where `L` is a literal vertex.
pub(super) fn literal(
    fragment: &mut Fragment,
    shape: &Shape<'_>,
    subject: NodeRef,
    literal: &Literal,
    fulltext: bool,
) -> Result<(), FragmentError> {
    let vocab = shape.vocab;
    let middle = fragment.add_node(FragmentNode::unkeyed(
        middle_identity(vocab, None),
        NodeTag::Middle,
    ));
    let mut node = FragmentNode::unkeyed(literal_identity(vocab, literal), NodeTag::Literal);
    node.index_entries.push(IndexEntry {
        key: vocab.literal_index_key.clone(),
        value: encode_literal(literal),
        release: IndexRelease::WithVertex,
    });
    if fulltext {
        node.fulltext.push(FulltextEntry {
            predicate: shape.predicate.as_str().to_string(),
            value: literal.value().to_string(),
        });
    }
    let literal = fragment.add_node(node);
    let label = shape.predicate.as_str();
    fragment.add_edge(subject, label, middle, EdgeKind::Structural)?;
    fragment.add_edge(middle, label, literal, EdgeKind::Structural)?;
    fan_out(fragment, shape, middle)
}

fn fan_out(fragment: &mut Fragment, shape: &Shape<'_>, middle: NodeRef) -> Result<(), FragmentError> {
    let vocab = shape.vocab;
    for ctx in shape.context_uris() {
        let node = fragment.add_node(
            FragmentNode::keyed(&vocab.uri_key, ctx.as_str(), NodeTag::Context).optional(),
        );
        fragment.add_edge(middle, &vocab.context_edge_label, node, EdgeKind::Context)?;
    }
    Ok(())
}
