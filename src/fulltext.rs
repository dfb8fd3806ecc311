//! Fulltext-index collaborator.
//!
//! The executor calls [`TextIndex::index`] / [`TextIndex::remove`] as a side
//! effect of adding or removing a flagged literal. Calls are fire-and-forget:
//! a failure is logged and never rolls back the graph mutation.

use std::collections::BTreeSet;

use dashmap::DashMap;
use miette::Diagnostic;
use thiserror::Error;

use crate::store::VertexId;

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum TextIndexError {
    #[error("fulltext index unavailable: {message}")]
    #[diagnostic(
        code(quadgraph::fulltext::unavailable),
        help("The graph mutation was kept; reindex the affected literals once the index is back.")
    )]
    Unavailable { message: String },
}

pub type TextIndexResult<T> = std::result::Result<T, TextIndexError>;

/// Receives literal values of flagged predicates.
pub trait TextIndex: Send + Sync {
    fn index(&self, vertex: VertexId, predicate: &str, value: &str) -> TextIndexResult<()>;
    fn remove(&self, vertex: VertexId, predicate: &str, value: &str) -> TextIndexResult<()>;
}

/// A hit from [`MemTextIndex::search`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextHit {
    pub vertex: VertexId,
    pub predicate: String,
    pub value: String,
}

/// In-memory token index.
#[derive(Debug, Default)]
pub struct MemTextIndex {
    /// token → entries containing it
    tokens: DashMap<String, BTreeSet<TextHit>>,
    entries: DashMap<TextHit, ()>,
}

fn tokenize(value: &str) -> BTreeSet<String> {
    value
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

impl MemTextIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed (vertex, predicate, value) entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries containing every token of `query`, sorted.
    pub fn search(&self, query: &str) -> Vec<TextHit> {
        let mut result: Option<BTreeSet<TextHit>> = None;
        for token in tokenize(query) {
            let hits = self
                .tokens
                .get(&token)
                .map(|h| h.value().clone())
                .unwrap_or_default();
            result = Some(match result {
                Some(acc) => acc.intersection(&hits).cloned().collect(),
                None => hits,
            });
        }
        result.unwrap_or_default().into_iter().collect()
    }
}

impl TextIndex for MemTextIndex {
    fn index(&self, vertex: VertexId, predicate: &str, value: &str) -> TextIndexResult<()> {
        let hit = TextHit {
            vertex,
            predicate: predicate.to_string(),
            value: value.to_string(),
        };
        if self.entries.insert(hit.clone(), ()).is_some() {
            return Ok(());
        }
        for token in tokenize(value) {
            self.tokens.entry(token).or_default().insert(hit.clone());
        }
        Ok(())
    }

    fn remove(&self, vertex: VertexId, predicate: &str, value: &str) -> TextIndexResult<()> {
        let hit = TextHit {
            vertex,
            predicate: predicate.to_string(),
            value: value.to_string(),
        };
        if self.entries.remove(&hit).is_none() {
            return Ok(());
        }
        for token in tokenize(value) {
            if let Some(mut hits) = self.tokens.get_mut(&token) {
                hits.remove(&hit);
            }
            self.tokens.remove_if(&token, |_, hits| hits.is_empty());
        }
        Ok(())
    }
}
