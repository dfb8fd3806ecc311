//! Value model: immutable RDF terms and the statement shapes built from them.
//!
//! - [`Uri`], [`BlankNode`], [`Literal`], [`Context`] and [`Wildcard`] are the terms.
//! - [`Statement`] is the raw four-slot shape; [`CompleteStatement`] (writes)
//!   and [`WildcardStatement`] (queries) are validated eagerly on construction.

pub mod statement;
pub mod term;

pub use statement::{CompleteStatement, Slot, Statement, WildcardStatement};
pub use term::{BlankNode, Context, Literal, Resource, Uri, Value, Wildcard};
