//! Query resolution: wildcard patterns to stored statements.
//!
//! A [`Pattern`] has four positions that are each bound or open, giving 16
//! shapes. [`plan`] collapses them into a handful of [`AccessPath`]s, every
//! one of which starts from a bound term (a subject or object vertex, the
//! literal index, or a context), so no query ever scans the whole graph.
//! Shapes without an access path fail with
//! [`QueryError::UnsupportedPattern`].

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::encoding::inverse::{GraphReader, Occurrence};
use crate::encoding::{EncodingPolicy, StatementEncoder};
use crate::error::{QuadResult, QueryError};
use crate::model::{CompleteStatement, Context, Resource, Slot, Uri, Value, WildcardStatement};
use crate::store::PropertyGraph;

/// Which contexts a pattern accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ContextFilter {
    #[default]
    Any,
    /// Occurrences in any listed context. [`Context::NULL`] matches
    /// default-graph occurrences.
    In(BTreeSet<Context>),
}

impl ContextFilter {
    /// Restrict an occurrence's contexts; `None` if it doesn't match.
    fn restrict(&self, contexts: &BTreeSet<Context>) -> Option<BTreeSet<Context>> {
        match self {
            ContextFilter::Any => Some(contexts.clone()),
            ContextFilter::In(wanted) => {
                if contexts.is_empty() {
                    return wanted.contains(&Context::NULL).then(BTreeSet::new);
                }
                let kept: BTreeSet<Context> = contexts.intersection(wanted).cloned().collect();
                (!kept.is_empty()).then_some(kept)
            }
        }
    }
}

/// A single-statement query over all four positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pattern {
    pub subject: Option<Resource>,
    pub predicate: Option<Uri>,
    pub object: Option<Value>,
    pub contexts: ContextFilter,
}

impl Pattern {
    /// The all-wildcard pattern.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(mut self, subject: impl Into<Resource>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn predicate(mut self, predicate: Uri) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn object(mut self, object: impl Into<Value>) -> Self {
        self.object = Some(object.into());
        self
    }

    pub fn in_contexts(mut self, contexts: impl IntoIterator<Item = Context>) -> Self {
        self.contexts = ContextFilter::In(contexts.into_iter().collect());
        self
    }

    /// `(s, p, ?, ?)`-style rendering of which positions are bound.
    pub fn shape(&self) -> String {
        let mark = |bound: bool, name: &'static str| if bound { name } else { "?" };
        format!(
            "({}, {}, {}, {})",
            mark(self.subject.is_some(), "s"),
            mark(self.predicate.is_some(), "p"),
            mark(self.object.is_some(), "o"),
            mark(matches!(self.contexts, ContextFilter::In(_)), "c"),
        )
    }
}

impl From<&WildcardStatement> for Pattern {
    fn from(query: &WildcardStatement) -> Self {
        let contexts = match query.contexts() {
            Slot::Any(_) => ContextFilter::Any,
            Slot::Bound(list) if list.is_empty() => ContextFilter::In([Context::NULL].into()),
            Slot::Bound(list) => ContextFilter::In(list.iter().cloned().collect()),
        };
        Pattern {
            subject: query.subject().bound().cloned(),
            predicate: Some(query.predicate().clone()),
            object: query.object().bound().cloned(),
            contexts,
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn slot<T: fmt::Display>(f: &mut fmt::Formatter<'_>, v: &Option<T>) -> fmt::Result {
            match v {
                Some(v) => write!(f, "{v}"),
                None => write!(f, "?"),
            }
        }
        slot(f, &self.subject)?;
        write!(f, " ")?;
        slot(f, &self.predicate)?;
        write!(f, " ")?;
        slot(f, &self.object)?;
        match &self.contexts {
            ContextFilter::Any => write!(f, " ?"),
            ContextFilter::In(set) => {
                for ctx in set {
                    write!(f, " {ctx}")?;
                }
                Ok(())
            }
        }
    }
}

/// How a pattern is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPath {
    /// Subject, predicate and object bound.
    Exists,
    /// Subject and predicate bound: the subject's `p` edges and literals.
    SubjectPredicate,
    /// Subject and object bound: subject edges filtered by object.
    SubjectObject,
    /// Subject bound only.
    Subject,
    /// Resource object bound: incoming edges of the object vertex.
    Object,
    /// Literal object bound: the literal value index.
    Literal,
    /// Only named contexts bound.
    Context,
}

/// Pick the access path for `pattern` under `policy`.
pub fn plan(pattern: &Pattern, policy: EncodingPolicy) -> Result<AccessPath, QueryError> {
    let path = match (&pattern.subject, &pattern.predicate, &pattern.object) {
        (Some(_), Some(_), Some(_)) => Some(AccessPath::Exists),
        (Some(_), Some(_), None) => Some(AccessPath::SubjectPredicate),
        (Some(_), None, Some(_)) => Some(AccessPath::SubjectObject),
        (Some(_), None, None) => Some(AccessPath::Subject),
        (None, _, Some(Value::Resource(_))) => Some(AccessPath::Object),
        (None, _, Some(Value::Literal(_))) => Some(AccessPath::Literal),
        (None, _, None) => match &pattern.contexts {
            ContextFilter::In(set)
                if policy.supports_context_scan()
                    && !set.is_empty()
                    && set.iter().all(|c| !c.is_default()) =>
            {
                Some(AccessPath::Context)
            }
            _ => None,
        },
    };
    path.ok_or_else(|| QueryError::UnsupportedPattern {
        shape: pattern.shape(),
        encoding: policy.name().to_string(),
    })
}

/// Answers patterns against a graph.
pub struct QueryResolver<'e> {
    encoder: &'e StatementEncoder,
}

impl<'e> QueryResolver<'e> {
    pub fn new(encoder: &'e StatementEncoder) -> Self {
        Self { encoder }
    }

    /// Every stored statement matching `pattern`, one per distinct
    /// (subject, predicate, object), in traversal order.
    pub fn resolve<G: PropertyGraph + ?Sized>(
        &self,
        graph: &G,
        pattern: &Pattern,
    ) -> QuadResult<Vec<CompleteStatement>> {
        let pattern = self.normalize(pattern);
        let path = plan(&pattern, self.encoder.policy())?;
        tracing::trace!(?path, %pattern, "resolving pattern");

        let reader = GraphReader::new(graph, self.encoder.vocab());
        let predicate = pattern.predicate.as_ref();
        let occurrences = match path {
            AccessPath::Exists
            | AccessPath::SubjectPredicate
            | AccessPath::SubjectObject
            | AccessPath::Subject => {
                let Some(subject) = &pattern.subject else {
                    return Ok(Vec::new());
                };
                match reader.vertex_of(subject)? {
                    Some(v) => reader.from_subject(v, predicate)?,
                    None => Vec::new(),
                }
            }
            AccessPath::Object => match &pattern.object {
                Some(Value::Resource(object)) => match reader.vertex_of(object)? {
                    Some(v) => reader.to_object(v, predicate)?,
                    None => Vec::new(),
                },
                _ => Vec::new(),
            },
            AccessPath::Literal => match &pattern.object {
                Some(Value::Literal(literal)) => reader.with_literal(literal)?,
                _ => Vec::new(),
            },
            AccessPath::Context => {
                let mut found = Vec::new();
                if let ContextFilter::In(set) = &pattern.contexts {
                    for uri in set.iter().filter_map(Context::uri) {
                        found.extend(reader.in_context(uri)?);
                    }
                }
                found
            }
        };
        Ok(merge(&pattern, occurrences))
    }

    /// Apply the encoder's object classification to a bound literal so it
    /// is compared the way it was stored.
    fn normalize(&self, pattern: &Pattern) -> Pattern {
        let mut pattern = pattern.clone();
        if let (Some(p), Some(o)) = (&pattern.predicate, &pattern.object) {
            pattern.object = Some(self.encoder.classify(p, o));
        }
        pattern
    }
}

fn merge(pattern: &Pattern, occurrences: Vec<Occurrence>) -> Vec<CompleteStatement> {
    let mut order: Vec<(Resource, Uri, Value)> = Vec::new();
    let mut contexts: HashMap<(Resource, Uri, Value), BTreeSet<Context>> = HashMap::new();
    for occ in occurrences {
        if pattern.subject.as_ref().is_some_and(|s| *s != occ.subject)
            || pattern.predicate.as_ref().is_some_and(|p| *p != occ.predicate)
            || pattern.object.as_ref().is_some_and(|o| *o != occ.object)
        {
            continue;
        }
        let Some(kept) = pattern.contexts.restrict(&occ.contexts) else {
            continue;
        };
        let key = (occ.subject, occ.predicate, occ.object);
        match contexts.get_mut(&key) {
            Some(existing) => existing.extend(kept),
            None => {
                order.push(key.clone());
                contexts.insert(key, kept);
            }
        }
    }
    order
        .into_iter()
        .map(|key| {
            let ctxs = contexts.remove(&key).unwrap_or_default();
            let (s, p, o) = key;
            CompleteStatement::new(s, p, o, ctxs.into_iter().collect())
        })
        .collect()
}
