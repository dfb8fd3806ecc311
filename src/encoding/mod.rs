//! Encoding strategies: how one statement maps onto property-graph topology.
//!
//! [`StatementEncoder::to_fragment`] is the single dispatcher. It applies the
//! type rule first, then classifies the object as resource or literal, and
//! only then hands the topology step to the active [`EncodingPolicy`]:
//!
//! - [`EncodingPolicy::Dense`]: direct `S -p-> O` edges, literals as subject
//!   properties. Two nodes, no context vertices.
//! - [`EncodingPolicy::VerboseQuad`]: `S -p-> M -p-> O` through a middle node,
//!   which fans out to one context vertex per named context.
//! - [`EncodingPolicy::AlwaysMiddle`]: `S -p-> M -p-> O`; contexts and literal
//!   values live on the middle node itself.
//!
//! The inverse direction (reassembling statements from the graph) lives in
//! [`inverse`].

mod dense;
pub mod inverse;
mod middle;
mod quad;
mod typing;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::FulltextConfig;
use crate::error::{ConfigError, FragmentError};
use crate::fragment::{Fragment, FragmentNode, NodeRef, NodeTag};
use crate::model::{CompleteStatement, Context, Literal, Resource, Uri, Value};
use crate::schema::Schema;
use crate::vocab::{LITERAL_KIND, MIDDLE_KIND, Vocabulary};

/// The physical layout used for statements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncodingPolicy {
    Dense,
    #[default]
    VerboseQuad,
    AlwaysMiddle,
}

impl EncodingPolicy {
    pub const ALL: [EncodingPolicy; 3] = [
        EncodingPolicy::Dense,
        EncodingPolicy::VerboseQuad,
        EncodingPolicy::AlwaysMiddle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EncodingPolicy::Dense => "dense",
            EncodingPolicy::VerboseQuad => "verbose-quad",
            EncodingPolicy::AlwaysMiddle => "always-middle",
        }
    }

    /// Whether statements can be found starting from a context alone.
    pub fn supports_context_scan(self) -> bool {
        !matches!(self, EncodingPolicy::Dense)
    }
}

impl fmt::Display for EncodingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EncodingPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| ConfigError::UnknownEncoding { name: s.to_string() })
    }
}

/// What the policy modules need to lay out one statement.
pub(crate) struct Shape<'a> {
    pub vocab: &'a Vocabulary,
    pub predicate: &'a Uri,
    pub contexts: &'a [Context],
}

impl Shape<'_> {
    pub fn context_uris(&self) -> impl Iterator<Item = &Uri> {
        self.contexts.iter().filter_map(Context::uri)
    }
}

/// Turns statements into fragments under one policy.
#[derive(Clone)]
pub struct StatementEncoder {
    policy: EncodingPolicy,
    vocab: Arc<Vocabulary>,
    schema: Option<Arc<dyn Schema>>,
    fulltext: FulltextConfig,
}

impl fmt::Debug for StatementEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementEncoder")
            .field("policy", &self.policy)
            .field("has_schema", &self.schema.is_some())
            .field("fulltext", &self.fulltext)
            .finish()
    }
}

impl StatementEncoder {
    pub fn new(policy: EncodingPolicy, vocab: Arc<Vocabulary>) -> Self {
        Self {
            policy,
            vocab,
            schema: None,
            fulltext: FulltextConfig::default(),
        }
    }

    pub fn with_schema(mut self, schema: Arc<dyn Schema>) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_fulltext(mut self, fulltext: FulltextConfig) -> Self {
        self.fulltext = fulltext;
        self
    }

    pub fn policy(&self) -> EncodingPolicy {
        self.policy
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// The object as it will be stored.
    ///
    /// A plain literal whose lexical form is a URI becomes a resource when
    /// the schema says the predicate ranges over resources.
    pub fn classify(&self, predicate: &Uri, object: &Value) -> Value {
        if let Value::Literal(lit) = object {
            let object_typed = self
                .schema
                .as_ref()
                .and_then(|s| s.is_object_typed(predicate))
                .unwrap_or(false);
            if object_typed && lit.is_plain() {
                if let Ok(uri) = Uri::new(lit.value()) {
                    return Value::Resource(Resource::Uri(uri));
                }
            }
        }
        object.clone()
    }

    /// Describe `statement` as a fragment.
    pub fn to_fragment(&self, statement: &CompleteStatement) -> Result<Fragment, FragmentError> {
        let vocab = self.vocab.as_ref();
        let predicate = statement.predicate();
        let shape = Shape {
            vocab,
            predicate,
            contexts: statement.contexts(),
        };
        let mut fragment = Fragment::new();
        let subject = fragment.add_node(resource_node(vocab, statement.subject(), NodeTag::Subject));

        match self.classify(predicate, statement.object()) {
            Value::Resource(class) if vocab.is_type_predicate(predicate) => {
                let class = fragment.add_node(resource_node(vocab, &class, NodeTag::Class));
                typing::type_edge(&mut fragment, &shape, self.policy, subject, class)?;
            }
            Value::Resource(object) => {
                let object = fragment.add_node(resource_node(vocab, &object, NodeTag::Object));
                match self.policy {
                    EncodingPolicy::Dense => dense::object(&mut fragment, &shape, subject, object)?,
                    EncodingPolicy::VerboseQuad => {
                        quad::object(&mut fragment, &shape, subject, object)?
                    }
                    EncodingPolicy::AlwaysMiddle => {
                        middle::object(&mut fragment, &shape, subject, object)?
                    }
                }
            }
            Value::Literal(literal) => {
                let fulltext = self.fulltext.covers(predicate);
                match self.policy {
                    EncodingPolicy::Dense => {
                        dense::literal(&mut fragment, &shape, subject, &literal, fulltext)
                    }
                    EncodingPolicy::VerboseQuad => {
                        quad::literal(&mut fragment, &shape, subject, &literal, fulltext)?
                    }
                    EncodingPolicy::AlwaysMiddle => {
                        middle::literal(&mut fragment, &shape, subject, &literal, fulltext)?
                    }
                }
            }
        }
        Ok(fragment)
    }
}

/// A keyed node for a URI or blank node.
pub(crate) fn resource_node(vocab: &Vocabulary, resource: &Resource, tag: NodeTag) -> FragmentNode {
    match resource {
        Resource::Uri(uri) => FragmentNode::keyed(&vocab.uri_key, uri.as_str(), tag),
        Resource::Blank(b) => FragmentNode::keyed(&vocab.blank_key, b.id(), tag),
    }
}

/// Identity of a middle node. Object middles require the literal keys to
/// be absent; always-middle literal middles carry them.
pub(crate) fn middle_identity(
    vocab: &Vocabulary,
    literal: Option<&Literal>,
) -> BTreeMap<String, Option<String>> {
    with_literal_parts(vocab, MIDDLE_KIND, literal)
}

/// Identity of a verbose-quad literal vertex.
pub(crate) fn literal_identity(vocab: &Vocabulary, literal: &Literal) -> BTreeMap<String, Option<String>> {
    with_literal_parts(vocab, LITERAL_KIND, Some(literal))
}

fn with_literal_parts(
    vocab: &Vocabulary,
    kind: &str,
    literal: Option<&Literal>,
) -> BTreeMap<String, Option<String>> {
    BTreeMap::from([
        (vocab.kind_key.clone(), Some(kind.to_string())),
        (
            vocab.literal_value_key.clone(),
            literal.map(|l| l.value().to_string()),
        ),
        (
            vocab.literal_datatype_key.clone(),
            literal.and_then(|l| l.datatype()).map(|d| d.as_str().to_string()),
        ),
        (
            vocab.literal_language_key.clone(),
            literal.and_then(|l| l.language()).map(str::to_string),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::{EdgeKind, IndexRelease};
    use crate::model::BlankNode;
    use crate::schema::StaticSchema;

    fn uri(s: &str) -> Uri {
        Uri::new(s).unwrap()
    }

    fn encoder(policy: EncodingPolicy) -> StatementEncoder {
        StatementEncoder::new(policy, Arc::new(Vocabulary::default()))
    }

    fn knows(contexts: Vec<Context>) -> CompleteStatement {
        CompleteStatement::new(
            uri("http://ex.org/emil"),
            uri("http://ex.org/knows"),
            uri("http://ex.org/johan"),
            contexts,
        )
    }

    #[test]
    fn policy_names_round_trip() {
        for policy in EncodingPolicy::ALL {
            assert_eq!(policy.name().parse::<EncodingPolicy>().unwrap(), policy);
        }
        assert!(matches!(
            "sparse".parse::<EncodingPolicy>(),
            Err(ConfigError::UnknownEncoding { .. })
        ));
    }

    #[test]
    fn type_rule_is_shared_by_all_policies() {
        let st = CompleteStatement::in_default_graph(
            uri("http://ex.org/emil"),
            uri(crate::vocab::RDF_TYPE),
            uri("http://xmlns.com/foaf/0.1/Person"),
        );
        for policy in EncodingPolicy::ALL {
            let f = encoder(policy).to_fragment(&st).unwrap();
            assert_eq!(f.node_count(), 2, "{policy}");
            assert_eq!(f.edges().len(), 1);
            assert_eq!(f.edges()[0].kind, EdgeKind::Relation);
            assert!(f.find_tagged(NodeTag::Class).is_some());
        }
    }

    #[test]
    fn dense_object_is_one_edge_with_contexts() {
        let f = encoder(EncodingPolicy::Dense)
            .to_fragment(&knows(vec![Context::named(uri("urn:ctx:public"))]))
            .unwrap();
        assert_eq!(f.node_count(), 2);
        let edge = &f.edges()[0];
        assert_eq!(edge.kind, EdgeKind::Relation);
        assert!(edge.properties["_contexts"].contains("urn:ctx:public"));
    }

    #[test]
    fn quad_object_fans_out_to_contexts() {
        let f = encoder(EncodingPolicy::VerboseQuad)
            .to_fragment(&knows(vec![
                Context::named(uri("urn:ctx:public")),
                Context::named(uri("urn:ctx:private")),
            ]))
            .unwrap();
        // subject, object, middle, two contexts
        assert_eq!(f.node_count(), 5);
        let ctx_edges = f.edges().iter().filter(|e| e.kind == EdgeKind::Context).count();
        assert_eq!(ctx_edges, 2);
        let ctx = f.find_tagged(NodeTag::Context).unwrap();
        assert!(f.node(ctx).optional);
    }

    #[test]
    fn quad_without_contexts_still_has_a_middle() {
        let f = encoder(EncodingPolicy::VerboseQuad)
            .to_fragment(&knows(Vec::new()))
            .unwrap();
        assert!(f.find_tagged(NodeTag::Middle).is_some());
        assert!(f.edges().iter().all(|e| e.kind != EdgeKind::Context));
    }

    #[test]
    fn self_loop_reuses_the_subject_node() {
        let st = CompleteStatement::in_default_graph(
            uri("http://ex.org/emil"),
            uri("http://ex.org/knows"),
            uri("http://ex.org/emil"),
        );
        for policy in EncodingPolicy::ALL {
            let f = encoder(policy).to_fragment(&st).unwrap();
            let keyed = f.nodes().filter(|(_, n)| n.is_keyed()).count();
            assert_eq!(keyed, 1, "{policy}");
        }
    }

    #[test]
    fn dense_literal_is_a_guarded_subject_property() {
        let st = CompleteStatement::new(
            uri("http://ex.org/emil"),
            uri("http://ex.org/nick"),
            Literal::plain("Emil"),
            vec![Context::named(uri("urn:ctx:public"))],
        );
        let f = encoder(EncodingPolicy::Dense).to_fragment(&st).unwrap();
        assert_eq!(f.node_count(), 1);
        let (_, subject) = f.nodes().next().unwrap();
        assert_eq!(subject.guarded.len(), 1);
        let guard = &subject.guarded[0];
        assert!(subject.properties[&guard.guard_key].contains("urn:ctx:public"));
        assert_eq!(
            subject.index_entries[0].release,
            IndexRelease::WhenNoProperty { key: None }
        );
    }

    #[test]
    fn always_middle_literal_lives_on_the_middle() {
        let st = CompleteStatement::in_default_graph(
            BlankNode::new("b0").unwrap(),
            uri("http://ex.org/nick"),
            Literal::with_language("Empa", "sv").unwrap(),
        );
        let f = encoder(EncodingPolicy::AlwaysMiddle).to_fragment(&st).unwrap();
        assert_eq!(f.node_count(), 2);
        let m = f.find_tagged(NodeTag::Middle).unwrap();
        let crate::fragment::NodeIdentity::Unkeyed { properties } = &f.node(m).identity else {
            panic!("middle must be unkeyed");
        };
        assert_eq!(properties["_language"].as_deref(), Some("sv"));
        assert!(f.find_tagged(NodeTag::Literal).is_none());
    }

    #[test]
    fn schema_turns_uri_literals_into_objects() {
        let homepage = uri("http://xmlns.com/foaf/0.1/homepage");
        let enc = encoder(EncodingPolicy::Dense)
            .with_schema(Arc::new(StaticSchema::new().object_predicate(homepage.clone())));
        let st = CompleteStatement::in_default_graph(
            uri("http://ex.org/emil"),
            homepage.clone(),
            Literal::plain("http://emil.example"),
        );
        let f = enc.to_fragment(&st).unwrap();
        assert_eq!(f.node_count(), 2);
        assert!(f.find_tagged(NodeTag::Object).is_some());

        // typed literals are never coerced
        let typed = Literal::typed("http://emil.example", uri("http://www.w3.org/2001/XMLSchema#anyURI"));
        let v = enc.classify(&homepage, &Value::Literal(typed.clone()));
        assert_eq!(v, Value::Literal(typed));
    }

    #[test]
    fn fulltext_flag_marks_the_value_holder() {
        let name = uri("http://xmlns.com/foaf/0.1/name");
        let st = CompleteStatement::in_default_graph(
            uri("http://ex.org/emil"),
            name.clone(),
            Literal::plain("Emil Eifrem"),
        );
        let fulltext = FulltextConfig {
            all: false,
            predicates: [name].into(),
        };
        let f = encoder(EncodingPolicy::VerboseQuad)
            .with_fulltext(fulltext)
            .to_fragment(&st)
            .unwrap();
        let lit = f.find_tagged(NodeTag::Literal).unwrap();
        assert_eq!(f.node(lit).fulltext[0].value, "Emil Eifrem");
    }
}
