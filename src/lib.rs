// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # quadgraph
//!
//! RDF statements (subject, predicate, object, contexts) stored in a
//! labelled property graph.
//!
//! ## Architecture
//!
//! - **Value model** (`model`): URIs, blank nodes, literals, contexts and the
//!   statement shapes built from them
//! - **Fragments** (`fragment`): a staging graph describing one statement
//! - **Encodings** (`encoding`): statement → fragment under the dense,
//!   verbose-quad and always-middle policies, plus the policy-agnostic reader
//! - **Executor** (`executor`): idempotent merge and reference-counted removal
//!   of fragments
//! - **Queries** (`query`): wildcard patterns → access paths → statements
//! - **Store** (`store`): the property-graph seam and an in-memory,
//!   transactional implementation on petgraph
//!
//! ## Library usage
//!
//! ```no_run
//! use quadgraph::config::StoreConfig;
//! use quadgraph::model::{CompleteStatement, Context, Slot, Uri, WildcardStatement};
//! use quadgraph::RdfStore;
//!
//! let store = RdfStore::in_memory(StoreConfig::default()).unwrap();
//! let emil = Uri::new("http://ex.org/emil").unwrap();
//! let knows = Uri::new("http://ex.org/knows").unwrap();
//! let johan = Uri::new("http://ex.org/johan").unwrap();
//! let public = Context::named(Uri::new("urn:ctx:public").unwrap());
//! store
//!     .add_statement(&CompleteStatement::new(emil.clone(), knows.clone(), johan, vec![public]))
//!     .unwrap();
//! let query = WildcardStatement::new(Slot::Bound(emil.into()), knows, Slot::any(), Slot::any());
//! assert_eq!(store.get_statements(&query).unwrap().len(), 1);
//! ```

pub mod config;
pub mod encoding;
pub mod error;
pub mod executor;
pub mod fragment;
pub mod fulltext;
pub mod interop;
pub mod model;
pub mod query;
pub mod repository;
pub mod schema;
pub mod store;
pub mod vocab;

pub use encoding::{EncodingPolicy, StatementEncoder};
pub use error::{QuadError, QuadResult};
pub use repository::RdfStore;
