//! Encoding vocabulary: every property key and edge label the encodings use.
//!
//! Keys and labels are plain strings in the property graph, so they are
//! collected here and passed explicitly instead of being scattered as
//! literals. All internal names start with `_`; a valid [`Uri`] always
//! starts with a scheme letter, so internal names never collide with
//! predicate URIs.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{Literal, Uri};

/// `rdf:type`.
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// Marker value of `kind_key` on middle vertices.
pub const MIDDLE_KIND: &str = "middle";
/// Marker value of `kind_key` on literal vertices.
pub const LITERAL_KIND: &str = "literal";

/// Property keys and edge labels shared by all encodings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    /// Identity key of URI vertices.
    pub uri_key: String,
    /// Identity key of blank-node vertices.
    pub blank_key: String,
    /// Marker property on synthesized vertices.
    pub kind_key: String,
    /// Middle → context vertex edge label.
    pub context_edge_label: String,
    /// Context set on direct edges and always-middle vertices.
    pub contexts_key: String,
    pub literal_value_key: String,
    pub literal_datatype_key: String,
    pub literal_language_key: String,
    /// Prefix of the dense per-literal context property.
    pub literal_context_prefix: String,
    /// Secondary index key for literal reverse lookup.
    pub literal_index_key: String,
    /// Secondary index key for context lookup without context vertices.
    pub context_index_key: String,
    /// The reserved "type" predicate.
    pub type_predicate: Uri,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            uri_key: "_uri".into(),
            blank_key: "_blank".into(),
            kind_key: "_kind".into(),
            context_edge_label: "_context".into(),
            contexts_key: "_contexts".into(),
            literal_value_key: "_value".into(),
            literal_datatype_key: "_datatype".into(),
            literal_language_key: "_language".into(),
            literal_context_prefix: "_contexts:".into(),
            literal_index_key: "_literal".into(),
            context_index_key: "_in_context".into(),
            type_predicate: Uri::new(RDF_TYPE).expect("rdf:type is a valid URI"),
        }
    }
}

impl Vocabulary {
    /// Check that every internal name is `_`-prefixed and unique.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = [
            ("uri_key", &self.uri_key),
            ("blank_key", &self.blank_key),
            ("kind_key", &self.kind_key),
            ("context_edge_label", &self.context_edge_label),
            ("contexts_key", &self.contexts_key),
            ("literal_value_key", &self.literal_value_key),
            ("literal_datatype_key", &self.literal_datatype_key),
            ("literal_language_key", &self.literal_language_key),
            ("literal_context_prefix", &self.literal_context_prefix),
            ("literal_index_key", &self.literal_index_key),
            ("context_index_key", &self.context_index_key),
        ];
        for (field, name) in &names {
            if !name.starts_with('_') || name.len() < 2 {
                return Err(ConfigError::InvalidVocabulary {
                    message: format!("{field} = {name:?} must start with `_` and be non-trivial"),
                });
            }
        }
        for (i, (field_a, a)) in names.iter().enumerate() {
            for (field_b, b) in &names[i + 1..] {
                if a == b {
                    return Err(ConfigError::InvalidVocabulary {
                        message: format!("{field_a} and {field_b} are both {a:?}"),
                    });
                }
            }
        }
        // The per-literal prefix must not swallow the other keys.
        for (field, name) in names
            .iter()
            .filter(|(field, _)| *field != "literal_context_prefix")
        {
            if name.starts_with(self.literal_context_prefix.as_str()) {
                return Err(ConfigError::InvalidVocabulary {
                    message: format!(
                        "{field} = {name:?} starts with literal_context_prefix {:?}",
                        self.literal_context_prefix
                    ),
                });
            }
        }
        Ok(())
    }

    /// Whether a property key or edge label belongs to the engine rather
    /// than naming a predicate.
    pub fn is_internal(&self, name: &str) -> bool {
        name.starts_with('_')
    }

    pub fn is_type_predicate(&self, predicate: &Uri) -> bool {
        *predicate == self.type_predicate
    }

    /// Dense encoding: the property holding the contexts of one literal value
    /// of one predicate.
    pub fn literal_context_key(&self, predicate: &Uri, encoded: &str) -> String {
        format!("{}{}#{}", self.literal_context_prefix, predicate.as_str(), encoded)
    }
}

/// Stable string form of a literal, used as a property value and index key.
pub fn encode_literal(literal: &Literal) -> String {
    serde_json::to_string(literal).expect("a literal is plain strings and always serializes")
}

/// Inverse of [`encode_literal`].
pub fn decode_literal(encoded: &str) -> Result<Literal, serde_json::Error> {
    serde_json::from_str(encoded)
}
