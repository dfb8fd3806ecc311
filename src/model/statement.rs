//! Statement shapes: the raw four-slot [`Statement`] and its validated forms.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StatementError;

use super::term::{Context, Resource, Uri, Value, Wildcard};

/// One statement position: either bound to a concrete term or left open.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot<T> {
    Bound(T),
    Any(Wildcard),
}

impl<T> Slot<T> {
    /// An anonymous wildcard.
    pub fn any() -> Self {
        Slot::Any(Wildcard::new())
    }

    /// The bound term, if any.
    pub fn bound(&self) -> Option<&T> {
        match self {
            Slot::Bound(v) => Some(v),
            Slot::Any(_) => None,
        }
    }

    pub fn into_bound(self) -> Option<T> {
        match self {
            Slot::Bound(v) => Some(v),
            Slot::Any(_) => None,
        }
    }

    /// Whether this position is left open.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Slot::Any(_))
    }
}

impl<T> From<T> for Slot<T> {
    fn from(value: T) -> Self {
        Slot::Bound(value)
    }
}

impl<T: fmt::Display> fmt::Display for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Bound(v) => v.fmt(f),
            Slot::Any(w) => w.fmt(f),
        }
    }
}

/// A raw statement in which any position may be a wildcard.
///
/// This is the unvalidated input shape; convert it into a
/// [`CompleteStatement`] for writes or a [`WildcardStatement`] for queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Statement {
    pub subject: Slot<Resource>,
    pub predicate: Slot<Uri>,
    pub object: Slot<Value>,
    pub contexts: Slot<Vec<Context>>,
}

fn sort_contexts(contexts: Vec<Context>) -> Vec<Context> {
    let mut named: Vec<Context> = contexts.into_iter().filter(|c| !c.is_default()).collect();
    named.sort();
    named.dedup();
    named
}

/// A fully bound statement, asserted in zero or more named contexts.
///
/// The context list is kept sorted and free of duplicates. An empty list
/// means the statement lives in the default graph only; [`Context::NULL`]
/// entries are folded into that meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "CompleteRepr")]
pub struct CompleteStatement {
    subject: Resource,
    predicate: Uri,
    object: Value,
    contexts: Vec<Context>,
}

#[derive(Deserialize)]
struct CompleteRepr {
    subject: Resource,
    predicate: Uri,
    object: Value,
    #[serde(default)]
    contexts: Vec<Context>,
}

impl TryFrom<CompleteRepr> for CompleteStatement {
    type Error = StatementError;

    fn try_from(repr: CompleteRepr) -> Result<Self, Self::Error> {
        Ok(CompleteStatement::new(
            repr.subject,
            repr.predicate,
            repr.object,
            repr.contexts,
        ))
    }
}

impl CompleteStatement {
    /// Build a statement; `contexts` is normalized.
    pub fn new(
        subject: impl Into<Resource>,
        predicate: Uri,
        object: impl Into<Value>,
        contexts: Vec<Context>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate,
            object: object.into(),
            contexts: sort_contexts(contexts),
        }
    }

    /// A statement in the default graph only.
    pub fn in_default_graph(
        subject: impl Into<Resource>,
        predicate: Uri,
        object: impl Into<Value>,
    ) -> Self {
        Self::new(subject, predicate, object, Vec::new())
    }

    pub fn subject(&self) -> &Resource {
        &self.subject
    }

    pub fn predicate(&self) -> &Uri {
        &self.predicate
    }

    /// The object as given, before any schema reclassification.
    pub fn object(&self) -> &Value {
        &self.object
    }

    /// Named contexts, sorted. Empty means the default graph.
    pub fn contexts(&self) -> &[Context] {
        &self.contexts
    }

    /// Iterate the named context URIs.
    pub fn context_uris(&self) -> impl Iterator<Item = &Uri> {
        self.contexts.iter().filter_map(Context::uri)
    }

    /// The same triple in a different set of contexts.
    pub fn with_contexts(&self, contexts: Vec<Context>) -> Self {
        Self::new(
            self.subject.clone(),
            self.predicate.clone(),
            self.object.clone(),
            contexts,
        )
    }

    /// Whether two statements describe the same (subject, predicate, object).
    pub fn same_triple(&self, other: &CompleteStatement) -> bool {
        self.subject == other.subject
            && self.predicate == other.predicate
            && self.object == other.object
    }

    /// The fully bound query matching exactly this statement.
    pub fn to_wildcard(&self) -> WildcardStatement {
        WildcardStatement {
            subject: Slot::Bound(self.subject.clone()),
            predicate: self.predicate.clone(),
            object: Slot::Bound(self.object.clone()),
            contexts: Slot::Bound(self.contexts.clone()),
        }
    }
}

impl TryFrom<Statement> for CompleteStatement {
    type Error = StatementError;

    fn try_from(statement: Statement) -> Result<Self, Self::Error> {
        let Statement {
            subject,
            predicate,
            object,
            contexts,
        } = statement;
        let predicate = predicate.into_bound().ok_or_else(|| StatementError::InvalidStatement {
            reason: "predicate must not be a wildcard".into(),
        })?;
        let subject = subject.into_bound().ok_or_else(|| StatementError::InvalidStatement {
            reason: "a complete statement needs a bound subject".into(),
        })?;
        let object = object.into_bound().ok_or_else(|| StatementError::InvalidStatement {
            reason: "a complete statement needs a bound object".into(),
        })?;
        let contexts = contexts.into_bound().ok_or_else(|| StatementError::InvalidStatement {
            reason: "a complete statement needs a concrete context list".into(),
        })?;
        Ok(Self::new(subject, predicate, object, contexts))
    }
}

impl From<CompleteStatement> for Statement {
    fn from(statement: CompleteStatement) -> Self {
        Statement {
            subject: Slot::Bound(statement.subject),
            predicate: Slot::Bound(statement.predicate),
            object: Slot::Bound(statement.object),
            contexts: Slot::Bound(statement.contexts),
        }
    }
}

impl fmt::Display for CompleteStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)?;
        for ctx in &self.contexts {
            write!(f, " {ctx}")?;
        }
        Ok(())
    }
}

/// A query statement: subject, object and contexts may be wildcards.
///
/// The predicate is always a concrete URI. A bound context list matches
/// statements in any of the listed contexts; a bound empty list (or one
/// containing only [`Context::NULL`]) matches default-graph statements.
///
/// ```
/// use quadgraph::model::{Slot, Uri, WildcardStatement};
///
/// let knows = Uri::new("http://ex.org/knows").unwrap();
/// let query = WildcardStatement::new(Slot::any(), knows.clone(), Slot::any(), Slot::any());
/// assert_eq!(query.predicate(), &knows);
/// assert!(query.subject().is_wildcard());
/// assert_eq!(query.object().bound(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WildcardStatement {
    subject: Slot<Resource>,
    predicate: Uri,
    object: Slot<Value>,
    contexts: Slot<Vec<Context>>,
}

impl WildcardStatement {
    /// Build a query statement around a concrete predicate.
    pub fn new(
        subject: Slot<Resource>,
        predicate: Uri,
        object: Slot<Value>,
        contexts: Slot<Vec<Context>>,
    ) -> Self {
        Self {
            subject,
            predicate,
            object,
            contexts,
        }
    }

    /// The subject position.
    pub fn subject(&self) -> &Slot<Resource> {
        &self.subject
    }

    /// The predicate, always bound.
    pub fn predicate(&self) -> &Uri {
        &self.predicate
    }

    /// The object position.
    pub fn object(&self) -> &Slot<Value> {
        &self.object
    }

    /// The context position, as given.
    pub fn contexts(&self) -> &Slot<Vec<Context>> {
        &self.contexts
    }
}

impl TryFrom<Statement> for WildcardStatement {
    type Error = StatementError;

    fn try_from(statement: Statement) -> Result<Self, Self::Error> {
        let predicate = statement
            .predicate
            .into_bound()
            .ok_or_else(|| StatementError::InvalidStatement {
                reason: "predicate must not be a wildcard".into(),
            })?;
        Ok(Self {
            subject: statement.subject,
            predicate,
            object: statement.object,
            contexts: statement.contexts,
        })
    }
}

impl fmt::Display for WildcardStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)?;
        match &self.contexts {
            Slot::Any(w) => write!(f, " {w}"),
            Slot::Bound(list) => {
                for ctx in list {
                    write!(f, " {ctx}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Literal;

    fn uri(s: &str) -> Uri {
        Uri::new(s).unwrap()
    }

    #[test]
    fn contexts_are_sorted_deduplicated_and_null_free() {
        let st = CompleteStatement::new(
            uri("http://ex.org/emil"),
            uri("http://ex.org/knows"),
            uri("http://ex.org/johan"),
            vec![
                Context::named(uri("urn:ctx:public")),
                Context::NULL,
                Context::named(uri("urn:ctx:private")),
                Context::named(uri("urn:ctx:public")),
            ],
        );
        let names: Vec<&str> = st.context_uris().map(Uri::as_str).collect();
        assert_eq!(names, vec!["urn:ctx:private", "urn:ctx:public"]);
    }

    #[test]
    fn null_only_means_default_graph() {
        let st = CompleteStatement::new(
            uri("http://ex.org/emil"),
            uri("http://ex.org/nick"),
            Literal::plain("Emil"),
            vec![Context::NULL],
        );
        assert!(st.contexts().is_empty());
    }

    #[test]
    fn wildcard_predicate_is_rejected_everywhere() {
        let raw = Statement {
            subject: Slot::Bound(uri("http://ex.org/emil").into()),
            predicate: Slot::any(),
            object: Slot::any(),
            contexts: Slot::any(),
        };
        assert!(matches!(
            CompleteStatement::try_from(raw.clone()),
            Err(StatementError::InvalidStatement { .. })
        ));
        assert!(matches!(
            WildcardStatement::try_from(raw),
            Err(StatementError::InvalidStatement { .. })
        ));
    }

    #[test]
    fn complete_statement_requires_every_slot() {
        let raw = Statement {
            subject: Slot::Bound(uri("http://ex.org/emil").into()),
            predicate: Slot::Bound(uri("http://ex.org/knows")),
            object: Slot::any(),
            contexts: Slot::Bound(vec![]),
        };
        assert!(CompleteStatement::try_from(raw.clone()).is_err());
        assert!(WildcardStatement::try_from(raw).is_ok());
    }

    #[test]
    fn statements_round_trip_through_json() {
        let st = CompleteStatement::new(
            uri("http://ex.org/emil"),
            uri("http://ex.org/nick"),
            Literal::with_language("Empa", "sv").unwrap(),
            vec![Context::named(uri("urn:ctx:public"))],
        );
        let json = serde_json::to_string(&st).unwrap();
        let back: CompleteStatement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, st);
    }

    #[test]
    fn json_without_contexts_defaults_to_default_graph() {
        let json = r#"{
            "subject": {"uri": "http://ex.org/emil"},
            "predicate": "http://ex.org/knows",
            "object": {"resource": {"uri": "http://ex.org/johan"}}
        }"#;
        let st: CompleteStatement = serde_json::from_str(json).unwrap();
        assert!(st.contexts().is_empty());
    }

    #[test]
    fn queries_work_as_set_keys() {
        let query = |name: &str| {
            WildcardStatement::new(
                Slot::Any(Wildcard::named(name)),
                uri("http://ex.org/knows"),
                Slot::Bound(uri("http://ex.org/johan").into()),
                Slot::any(),
            )
        };
        let hashed: std::collections::HashSet<WildcardStatement> =
            [query("s"), query("who")].into_iter().collect();
        assert_eq!(hashed.len(), 1);
        let ordered: std::collections::BTreeSet<Statement> = [
            Statement {
                subject: Slot::any(),
                predicate: Slot::Bound(uri("http://ex.org/knows")),
                object: Slot::any(),
                contexts: Slot::any(),
            },
            Statement {
                subject: Slot::Any(Wildcard::named("s")),
                predicate: Slot::Bound(uri("http://ex.org/knows")),
                object: Slot::any(),
                contexts: Slot::any(),
            },
        ]
        .into_iter()
        .collect();
        assert_eq!(ordered.len(), 1);
    }

    #[test]
    fn wildcard_statements_round_trip_through_json() {
        let query = WildcardStatement::new(
            Slot::Bound(uri("http://ex.org/emil").into()),
            uri("http://ex.org/nick"),
            Slot::Any(Wildcard::named("name")),
            Slot::Bound(vec![Context::named(uri("urn:ctx:public"))]),
        );
        let json = serde_json::to_string(&query).unwrap();
        let back: WildcardStatement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, query);
        assert_eq!(back.object().clone().into_bound(), None);
        assert_eq!(back.to_string(), query.to_string());
    }
}
