//! `RdfStore`: statements in, statements out.
//!
//! Ties the encoder, executor and resolver to a transactional graph store.
//! Every public operation runs in its own transaction; batch operations
//! share one, so a failure part-way leaves the store unchanged.

use std::sync::Arc;

use crate::config::StoreConfig;
use crate::encoding::{EncodingPolicy, StatementEncoder};
use crate::error::QuadResult;
use crate::executor::{ApplyReport, GraphExecutor};
use crate::fulltext::TextIndex;
use crate::model::{CompleteStatement, WildcardStatement};
use crate::query::{Pattern, QueryResolver};
use crate::schema::Schema;
use crate::store::{GraphStore, MemGraph, Transaction};

/// A statement store over a property graph.
pub struct RdfStore<S: GraphStore = MemGraph> {
    store: S,
    encoder: StatementEncoder,
    executor: GraphExecutor,
}

impl<S: GraphStore + std::fmt::Debug> std::fmt::Debug for RdfStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RdfStore")
            .field("store", &self.store)
            .field("encoder", &self.encoder)
            .finish()
    }
}

impl RdfStore<MemGraph> {
    /// A store over a fresh in-memory graph.
    pub fn in_memory(config: StoreConfig) -> QuadResult<Self> {
        Self::new(MemGraph::new(), config)
    }
}

impl<S: GraphStore> RdfStore<S> {
    /// Validate `config` and build a store over `store`.
    pub fn new(store: S, config: StoreConfig) -> QuadResult<Self> {
        config.validate()?;
        let vocab = Arc::new(config.vocabulary);
        let mut encoder =
            StatementEncoder::new(config.encoding, vocab.clone()).with_fulltext(config.fulltext);
        if let Some(schema) = config.schema.to_schema() {
            encoder = encoder.with_schema(Arc::new(schema));
        }
        tracing::debug!(encoding = %config.encoding, "opened statement store");
        Ok(Self {
            store,
            encoder,
            executor: GraphExecutor::new(vocab),
        })
    }

    /// Replace the configured schema.
    pub fn with_schema(self, schema: Arc<dyn Schema>) -> Self {
        Self {
            encoder: self.encoder.with_schema(schema),
            ..self
        }
    }

    /// Forward literal values to a fulltext index.
    pub fn with_text_index(self, index: Arc<dyn TextIndex>) -> Self {
        Self {
            executor: self.executor.with_text_index(index),
            ..self
        }
    }

    /// The encoding policy statements are written with.
    pub fn policy(&self) -> EncodingPolicy {
        self.encoder.policy()
    }

    /// The underlying graph store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn encoder(&self) -> &StatementEncoder {
        &self.encoder
    }

    /// Add one statement in its own transaction.
    pub fn add_statement(&self, statement: &CompleteStatement) -> QuadResult<ApplyReport> {
        self.add_statements([statement])
    }

    /// Add many statements in one transaction.
    pub fn add_statements<'a>(
        &self,
        statements: impl IntoIterator<Item = &'a CompleteStatement>,
    ) -> QuadResult<ApplyReport> {
        let mut tx = self.store.begin()?;
        let mut total = ApplyReport::default();
        let mut count = 0usize;
        for statement in statements {
            let fragment = self.encoder.to_fragment(statement)?;
            let report = self.executor.apply(&mut tx, &fragment)?;
            total.created_vertices += report.created_vertices;
            total.created_edges += report.created_edges;
            count += 1;
        }
        tx.commit()?;
        tracing::debug!(
            statements = count,
            created_vertices = total.created_vertices,
            created_edges = total.created_edges,
            "added statements"
        );
        Ok(total)
    }

    /// Remove one statement from its listed contexts (or from the default
    /// graph). Returns whether anything changed.
    pub fn remove_statement(&self, statement: &CompleteStatement) -> QuadResult<bool> {
        let mut tx = self.store.begin()?;
        let fragment = self.encoder.to_fragment(statement)?;
        let report = self.executor.remove(&mut tx, &fragment)?;
        tx.commit()?;
        Ok(report.removed)
    }

    /// Remove everything matching `query`. Returns the number of statements
    /// that were removed.
    pub fn remove_statements(&self, query: &WildcardStatement) -> QuadResult<usize> {
        let mut tx = self.store.begin()?;
        let matches = QueryResolver::new(&self.encoder).resolve(&tx, &Pattern::from(query))?;
        let mut removed = 0;
        for statement in &matches {
            let fragment = self.encoder.to_fragment(statement)?;
            if self.executor.remove(&mut tx, &fragment)?.removed {
                removed += 1;
            }
        }
        tx.commit()?;
        tracing::debug!(matched = matches.len(), removed, "removed matching statements");
        Ok(removed)
    }

    /// Statements matching a wildcard statement.
    pub fn get_statements(&self, query: &WildcardStatement) -> QuadResult<Vec<CompleteStatement>> {
        self.find(&Pattern::from(query))
    }

    /// Resolve an arbitrary pattern, including predicate wildcards, against
    /// a snapshot of the committed state.
    pub fn find(&self, pattern: &Pattern) -> QuadResult<Vec<CompleteStatement>> {
        let snapshot = self.store.snapshot()?;
        QueryResolver::new(&self.encoder).resolve(&snapshot, pattern)
    }

    /// Whether the statement is stored in every context it lists.
    pub fn contains(&self, statement: &CompleteStatement) -> QuadResult<bool> {
        let stored = self.encoder.classify(statement.predicate(), statement.object());
        let wanted = statement.contexts();
        Ok(self
            .get_statements(&statement.to_wildcard())?
            .iter()
            .any(|found| {
                found.subject() == statement.subject()
                    && found.object() == &stored
                    && wanted.iter().all(|c| found.contexts().contains(c))
            }))
    }
}
