//! Rich diagnostic error types for quadgraph.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so callers know exactly
//! what went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for quadgraph.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the caller.
#[derive(Debug, Error, Diagnostic)]
pub enum QuadError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Statement(#[from] StatementError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Fragment(#[from] FragmentError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Interop(#[from] InteropError),
}

// ---------------------------------------------------------------------------
// Statement errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum StatementError {
    #[error("invalid statement: {reason}")]
    #[diagnostic(
        code(quadgraph::statement::invalid),
        help(
            "Complete statements need a bound subject, predicate, object and context list. \
             Wildcard statements may leave subject, object or contexts open, \
             but the predicate must always be a concrete URI."
        )
    )]
    InvalidStatement { reason: String },

    #[error("invalid URI: {uri:?}")]
    #[diagnostic(
        code(quadgraph::statement::invalid_uri),
        help(
            "URIs must be absolute (start with a scheme such as `http:` or `urn:`) \
             and must not contain whitespace or any of <>\"{{}}|\\^`."
        )
    )]
    InvalidUri { uri: String },

    #[error("invalid language tag: {tag:?}")]
    #[diagnostic(
        code(quadgraph::statement::invalid_language),
        help("Language tags follow BCP 47, e.g. `en`, `sv`, `en-GB`.")
    )]
    InvalidLanguageTag { tag: String },
}

// ---------------------------------------------------------------------------
// Fragment errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum FragmentError {
    #[error("edge {label:?} references node {node} outside a fragment of {len} nodes")]
    #[diagnostic(
        code(quadgraph::fragment::dangling_edge),
        help(
            "Every fragment edge must connect nodes created by the same fragment. \
             Use the NodeRef returned by `Fragment::add_node` on this fragment."
        )
    )]
    DanglingEdge {
        label: String,
        node: usize,
        len: usize,
    },
}

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum QueryError {
    #[error("unsupported pattern {shape} for the {encoding} encoding")]
    #[diagnostic(
        code(quadgraph::query::unsupported_pattern),
        help(
            "Bind the subject or the object, or (for the verbose-quad and always-middle \
             encodings) one or more named contexts. Full scans and predicate-only \
             lookups have no access path."
        )
    )]
    UnsupportedPattern { shape: String, encoding: String },

    #[error("corrupt encoded value in graph: {message}")]
    #[diagnostic(
        code(quadgraph::query::corrupt_encoding),
        help(
            "A vertex holds a property that does not decode as a statement value. \
             The graph was probably written with a different vocabulary or encoding."
        )
    )]
    CorruptEncoding { message: String },
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum StoreError {
    #[error("vertex not found: {id}")]
    #[diagnostic(
        code(quadgraph::store::vertex_not_found),
        help("The vertex was deleted, possibly by a concurrent transaction.")
    )]
    VertexNotFound { id: u64 },

    #[error("edge not found: {id}")]
    #[diagnostic(
        code(quadgraph::store::edge_not_found),
        help("The edge was deleted, possibly by a concurrent transaction.")
    )]
    EdgeNotFound { id: u64 },

    #[error("graph lock poisoned")]
    #[diagnostic(
        code(quadgraph::store::poisoned),
        help(
            "A thread panicked while holding the graph lock. \
             The in-memory graph can no longer be trusted; rebuild the store."
        )
    )]
    LockPoisoned,

    #[error("cannot {operation} through a read-only snapshot")]
    #[diagnostic(
        code(quadgraph::store::read_only),
        help("Snapshots serve queries only. Open a transaction with `begin()` to write.")
    )]
    ReadOnly { operation: &'static str },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    #[diagnostic(
        code(quadgraph::config::io),
        help("Check that the configuration file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {message}")]
    #[diagnostic(
        code(quadgraph::config::parse),
        help("The configuration must be valid TOML. See `StoreConfig` for the accepted fields.")
    )]
    Parse { message: String },

    #[error("unknown encoding: {name:?}")]
    #[diagnostic(
        code(quadgraph::config::unknown_encoding),
        help("Valid encodings are: dense, verbose-quad, always-middle.")
    )]
    UnknownEncoding { name: String },

    #[error("invalid vocabulary: {message}")]
    #[diagnostic(
        code(quadgraph::config::invalid_vocabulary),
        help(
            "Internal keys and labels must start with `_` and be pairwise distinct, \
             so they can never collide with predicate URIs."
        )
    )]
    InvalidVocabulary { message: String },

    #[error("predicate {predicate} is declared both object-typed and literal-typed")]
    #[diagnostic(
        code(quadgraph::config::conflicting_schema),
        help("List the predicate under either `schema.object_predicates` or `schema.literal_predicates`.")
    )]
    ConflictingSchema { predicate: String },
}

// ---------------------------------------------------------------------------
// Interop errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum InteropError {
    #[error("cannot convert {term} to an RDF term: {message}")]
    #[diagnostic(
        code(quadgraph::interop::term),
        help("oxigraph rejected the term. Check the IRI, blank node id or language tag.")
    )]
    Term { term: String, message: String },

    #[error("failed to write N-Quads: {source}")]
    #[diagnostic(code(quadgraph::interop::io), help("Check that the output is writable."))]
    Io {
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for functions returning quadgraph results.
pub type QuadResult<T> = std::result::Result<T, QuadError>;
