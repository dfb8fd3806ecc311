//! Always-middle topology: every triple gets a middle node that records its
//! own contexts and, for literals, its own value.

use crate::error::FragmentError;
use crate::fragment::{
    EdgeKind, Fragment, FragmentNode, FulltextEntry, IndexEntry, IndexRelease, NodeRef, NodeTag,
};
use crate::model::Literal;
use crate::vocab::encode_literal;

use super::{Shape, middle_identity};

/// `S -p-> M -p-> O`.
pub(super) fn object(
    fragment: &mut Fragment,
    shape: &Shape<'_>,
    subject: NodeRef,
    object: NodeRef,
) -> Result<(), FragmentError> {
    let middle = fragment.add_node(middle_node(shape, None));
    let label = shape.predicate.as_str();
    fragment.add_edge(subject, label, middle, EdgeKind::Structural)?;
    fragment.add_edge(middle, label, object, EdgeKind::Structural)?;
    Ok(())
}

/// `S -p-> M`, the literal stored on `M`.
pub(super) fn literal(
    fragment: &mut Fragment,
    shape: &Shape<'_>,
    subject: NodeRef,
    literal: &Literal,
    fulltext: bool,
) -> Result<(), FragmentError> {
    let mut node = middle_node(shape, Some(literal));
    node.index_entries.push(IndexEntry {
        key: shape.vocab.literal_index_key.clone(),
        value: encode_literal(literal),
        release: IndexRelease::WithVertex,
    });
    if fulltext {
        node.fulltext.push(FulltextEntry {
            predicate: shape.predicate.as_str().to_string(),
            value: literal.value().to_string(),
        });
    }
    let middle = fragment.add_node(node);
    fragment.add_edge(subject, shape.predicate.as_str(), middle, EdgeKind::Structural)?;
    Ok(())
}

fn middle_node(shape: &Shape<'_>, literal: Option<&Literal>) -> FragmentNode {
    let vocab = shape.vocab;
    let mut node = FragmentNode::unkeyed(middle_identity(vocab, literal), NodeTag::Middle);
    for ctx in shape.context_uris() {
        node.add_property(&vocab.contexts_key, ctx.as_str());
        node.index_entries.push(IndexEntry {
            key: vocab.context_index_key.clone(),
            value: ctx.as_str().to_string(),
            release: IndexRelease::WhenNoProperty {
                key: Some(vocab.contexts_key.clone()),
            },
        });
    }
    node
}
