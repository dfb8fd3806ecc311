//! RDF terms: URIs, blank nodes, literals and contexts.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::StatementError;

static URI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[A-Za-z][A-Za-z0-9+.\-]*:[^\s<>"{}|\\^`]*$"#).expect("valid URI regex")
});

static LANGUAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z]{1,8}(-[A-Za-z0-9]{1,8})*$").expect("valid language regex")
});

/// An absolute URI. Equality is by string value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uri(String);

impl Uri {
    /// Validate and wrap a URI string.
    pub fn new(uri: impl Into<String>) -> Result<Self, StatementError> {
        let uri = uri.into();
        if URI_RE.is_match(&uri) {
            Ok(Self(uri))
        } else {
            Err(StatementError::InvalidUri { uri })
        }
    }

    /// Whether `candidate` would be accepted by [`Uri::new`].
    pub fn is_valid(candidate: &str) -> bool {
        URI_RE.is_match(candidate)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Uri {
    type Error = StatementError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Uri> for String {
    fn from(uri: Uri) -> Self {
        uri.0
    }
}

impl AsRef<str> for Uri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

/// A resource without a URI, identified by an internal id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlankNode(String);

impl BlankNode {
    pub fn new(id: impl Into<String>) -> Result<Self, StatementError> {
        let id = id.into();
        if id.is_empty() || id.chars().any(char::is_whitespace) {
            return Err(StatementError::InvalidStatement {
                reason: format!("blank node id {id:?} must be non-empty and contain no whitespace"),
            });
        }
        Ok(Self(id))
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BlankNode {
    type Error = StatementError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BlankNode> for String {
    fn from(node: BlankNode) -> Self {
        node.0
    }
}

impl fmt::Display for BlankNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_:{}", self.0)
    }
}

/// A literal value with an optional datatype or language tag.
///
/// Two literals are equal iff value, datatype and language all match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "LiteralRepr")]
pub struct Literal {
    value: String,
    datatype: Option<Uri>,
    language: Option<String>,
}

#[derive(Deserialize)]
struct LiteralRepr {
    value: String,
    #[serde(default)]
    datatype: Option<Uri>,
    #[serde(default)]
    language: Option<String>,
}

impl TryFrom<LiteralRepr> for Literal {
    type Error = StatementError;

    fn try_from(repr: LiteralRepr) -> Result<Self, Self::Error> {
        Literal::from_parts(repr.value, repr.datatype, repr.language)
    }
}

impl Literal {
    /// A plain literal with neither datatype nor language.
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn typed(value: impl Into<String>, datatype: Uri) -> Self {
        Self {
            value: value.into(),
            datatype: Some(datatype),
            language: None,
        }
    }

    /// A language-tagged literal. The tag is normalized to lower case.
    pub fn with_language(
        value: impl Into<String>,
        language: impl Into<String>,
    ) -> Result<Self, StatementError> {
        let language = language.into();
        if !LANGUAGE_RE.is_match(&language) {
            return Err(StatementError::InvalidLanguageTag { tag: language });
        }
        Ok(Self {
            value: value.into(),
            datatype: None,
            language: Some(language.to_ascii_lowercase()),
        })
    }

    /// Rebuild a literal from its three stored parts.
    pub fn from_parts(
        value: impl Into<String>,
        datatype: Option<Uri>,
        language: Option<String>,
    ) -> Result<Self, StatementError> {
        match (datatype, language) {
            (Some(_), Some(_)) => Err(StatementError::InvalidStatement {
                reason: "a literal cannot carry both a datatype and a language tag".into(),
            }),
            (Some(dt), None) => Ok(Self::typed(value, dt)),
            (None, Some(lang)) => Self::with_language(value, lang),
            (None, None) => Ok(Self::plain(value)),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn datatype(&self) -> Option<&Uri> {
        self.datatype.as_ref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Neither datatype nor language.
    pub fn is_plain(&self) -> bool {
        self.datatype.is_none() && self.language.is_none()
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"")?;
        for c in self.value.chars() {
            match c {
                '"' => write!(f, "\\\"")?,
                '\\' => write!(f, "\\\\")?,
                '\n' => write!(f, "\\n")?,
                '\r' => write!(f, "\\r")?,
                _ => write!(f, "{c}")?,
            }
        }
        write!(f, "\"")?;
        if let Some(dt) = &self.datatype {
            write!(f, "^^{dt}")?;
        }
        if let Some(lang) = &self.language {
            write!(f, "@{lang}")?;
        }
        Ok(())
    }
}

/// A subject-capable term: a URI or a blank node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Uri(Uri),
    Blank(BlankNode),
}

impl Resource {
    pub fn as_uri(&self) -> Option<&Uri> {
        match self {
            Resource::Uri(uri) => Some(uri),
            Resource::Blank(_) => None,
        }
    }
}

impl From<Uri> for Resource {
    fn from(uri: Uri) -> Self {
        Resource::Uri(uri)
    }
}

impl From<BlankNode> for Resource {
    fn from(node: BlankNode) -> Self {
        Resource::Blank(node)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Uri(uri) => uri.fmt(f),
            Resource::Blank(node) => node.fmt(f),
        }
    }
}

/// An object-capable term: a resource or a literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Resource(Resource),
    Literal(Literal),
}

impl Value {
    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            Value::Resource(r) => Some(r),
            Value::Literal(_) => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Value::Literal(l) => Some(l),
            Value::Resource(_) => None,
        }
    }
}

impl From<Resource> for Value {
    fn from(r: Resource) -> Self {
        Value::Resource(r)
    }
}

impl From<Uri> for Value {
    fn from(uri: Uri) -> Self {
        Value::Resource(Resource::Uri(uri))
    }
}

impl From<BlankNode> for Value {
    fn from(node: BlankNode) -> Self {
        Value::Resource(Resource::Blank(node))
    }
}

impl From<Literal> for Value {
    fn from(l: Literal) -> Self {
        Value::Literal(l)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Resource(r) => r.fmt(f),
            Value::Literal(l) => l.fmt(f),
        }
    }
}

/// A graph partition. [`Context::NULL`] is the default, unnamed graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Context {
    Default,
    Named(Uri),
}

impl Context {
    /// The default graph.
    pub const NULL: Context = Context::Default;

    pub fn named(uri: Uri) -> Self {
        Context::Named(uri)
    }

    pub fn uri(&self) -> Option<&Uri> {
        match self {
            Context::Named(uri) => Some(uri),
            Context::Default => None,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Context::Default)
    }
}

impl From<Uri> for Context {
    fn from(uri: Uri) -> Self {
        Context::Named(uri)
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Context::Default => write!(f, "<default>"),
            Context::Named(uri) => uri.fmt(f),
        }
    }
}

/// An unbound statement position, optionally named (`?x`).
///
/// Names are cosmetic: any two wildcards compare and hash equal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Wildcard {
    name: Option<String>,
}

impl Wildcard {
    pub fn new() -> Self {
        Self { name: None }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl PartialEq for Wildcard {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for Wildcard {}

impl std::hash::Hash for Wildcard {
    fn hash<H: std::hash::Hasher>(&self, _state: &mut H) {}
}

impl PartialOrd for Wildcard {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Wildcard {
    fn cmp(&self, _other: &Self) -> std::cmp::Ordering {
        std::cmp::Ordering::Equal
    }
}

impl fmt::Display for Wildcard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "?{name}"),
            None => write!(f, "?"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_requires_scheme() {
        assert!(Uri::new("http://example.org/emil").is_ok());
        assert!(Uri::new("urn:ctx:public").is_ok());
        assert!(Uri::new("emil").is_err());
        assert!(Uri::new("_uri").is_err());
        assert!(Uri::new("http://example.org/a b").is_err());
        assert!(Uri::new("").is_err());
    }

    #[test]
    fn literal_equality_covers_all_parts() {
        let xsd_string = Uri::new("http://www.w3.org/2001/XMLSchema#string").unwrap();
        let plain = Literal::plain("Emil");
        let typed = Literal::typed("Emil", xsd_string);
        let tagged = Literal::with_language("Emil", "sv").unwrap();
        assert_ne!(plain, typed);
        assert_ne!(plain, tagged);
        assert_ne!(typed, tagged);
        assert_eq!(plain, Literal::plain("Emil"));
    }

    #[test]
    fn language_tags_are_normalized_and_validated() {
        let lit = Literal::with_language("colour", "en-GB").unwrap();
        assert_eq!(lit.language(), Some("en-gb"));
        assert!(matches!(
            Literal::with_language("x", "not a tag"),
            Err(StatementError::InvalidLanguageTag { .. })
        ));
    }

    #[test]
    fn literal_rejects_datatype_and_language() {
        let dt = Uri::new("http://www.w3.org/2001/XMLSchema#string").unwrap();
        assert!(Literal::from_parts("x", Some(dt), Some("en".into())).is_err());
    }

    #[test]
    fn literal_display_escapes() {
        let lit = Literal::plain("say \"hi\"\n");
        assert_eq!(lit.to_string(), r#""say \"hi\"\n""#);
        let tagged = Literal::with_language("hej", "sv").unwrap();
        assert_eq!(tagged.to_string(), "\"hej\"@sv");
    }

    #[test]
    fn wildcards_compare_equal_regardless_of_name() {
        assert_eq!(Wildcard::named("x"), Wildcard::new());
        assert_eq!(Wildcard::named("x").to_string(), "?x");
    }

    #[test]
    fn wildcards_hash_and_order_as_equal() {
        let set: std::collections::HashSet<Wildcard> =
            [Wildcard::named("x"), Wildcard::named("y"), Wildcard::new()]
                .into_iter()
                .collect();
        assert_eq!(set.len(), 1);
        assert_eq!(
            Wildcard::named("a").cmp(&Wildcard::named("b")),
            std::cmp::Ordering::Equal
        );
    }

    #[test]
    fn uri_serde_validates() {
        let ok: Uri = serde_json::from_str("\"http://example.org/a\"").unwrap();
        assert_eq!(ok.as_str(), "http://example.org/a");
        assert!(serde_json::from_str::<Uri>("\"nope\"").is_err());
    }
}
