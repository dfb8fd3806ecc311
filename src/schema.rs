//! Optional schema collaborator: which predicates range over resources.

use std::collections::BTreeSet;

use crate::model::Uri;

/// Property-range lookup consulted when classifying a statement's object.
pub trait Schema: Send + Sync {
    /// `Some(true)` if the predicate ranges over resources, `Some(false)` if
    /// it ranges over literals, `None` if the schema doesn't know.
    fn is_object_typed(&self, predicate: &Uri) -> Option<bool>;
}

/// A fixed schema built from two predicate lists.
#[derive(Debug, Clone, Default)]
pub struct StaticSchema {
    object_predicates: BTreeSet<Uri>,
    literal_predicates: BTreeSet<Uri>,
}

impl StaticSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object_predicate(mut self, predicate: Uri) -> Self {
        self.literal_predicates.remove(&predicate);
        self.object_predicates.insert(predicate);
        self
    }

    pub fn literal_predicate(mut self, predicate: Uri) -> Self {
        self.object_predicates.remove(&predicate);
        self.literal_predicates.insert(predicate);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.object_predicates.is_empty() && self.literal_predicates.is_empty()
    }
}

impl Schema for StaticSchema {
    fn is_object_typed(&self, predicate: &Uri) -> Option<bool> {
        if self.object_predicates.contains(predicate) {
            Some(true)
        } else if self.literal_predicates.contains(predicate) {
            Some(false)
        } else {
            None
        }
    }
}
