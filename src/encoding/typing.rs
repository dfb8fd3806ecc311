//! The type rule, shared by every policy: `S -type-> Class` as a direct edge.

use crate::error::FragmentError;
use crate::fragment::{EdgeKind, Fragment, IndexEntry, IndexRelease, NodeRef};

use super::{EncodingPolicy, Shape};

pub(super) fn type_edge(
    fragment: &mut Fragment,
    shape: &Shape<'_>,
    policy: EncodingPolicy,
    subject: NodeRef,
    class: NodeRef,
) -> Result<(), FragmentError> {
    let vocab = shape.vocab;
    let edge = fragment.add_edge(subject, shape.predicate.as_str(), class, EdgeKind::Relation)?;
    for ctx in shape.context_uris() {
        fragment
            .edge_mut(edge)
            .add_property(&vocab.contexts_key, ctx.as_str());
    }
    if policy.supports_context_scan() {
        // Type edges bypass the middle node, so context scans find them
        // through the subject.
        let entries: Vec<IndexEntry> = shape
            .context_uris()
            .map(|ctx| IndexEntry {
                key: vocab.context_index_key.clone(),
                value: ctx.as_str().to_string(),
                release: IndexRelease::WhenNoEdgeProperty {
                    label: shape.predicate.as_str().to_string(),
                    key: vocab.contexts_key.clone(),
                },
            })
            .collect();
        fragment.node_mut(subject).index_entries.extend(entries);
    }
    Ok(())
}
