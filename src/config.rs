//! Store configuration, loaded from TOML.
//!
//! ```toml
//! encoding = "always-middle"
//!
//! [vocabulary]
//! uri_key = "_iri"
//!
//! [schema]
//! object_predicates = ["http://xmlns.com/foaf/0.1/homepage"]
//!
//! [fulltext]
//! predicates = ["http://xmlns.com/foaf/0.1/name"]
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::encoding::EncodingPolicy;
use crate::error::ConfigError;
use crate::model::Uri;
use crate::schema::StaticSchema;
use crate::vocab::Vocabulary;

/// Result type for configuration loading.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Predicate ranges known up front.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub object_predicates: Vec<Uri>,
    pub literal_predicates: Vec<Uri>,
}

impl SchemaConfig {
    /// Build the schema, or `None` when no predicate is declared.
    pub fn to_schema(&self) -> Option<StaticSchema> {
        let schema = self
            .object_predicates
            .iter()
            .fold(StaticSchema::new(), |s, p| s.object_predicate(p.clone()));
        let schema = self
            .literal_predicates
            .iter()
            .fold(schema, |s, p| s.literal_predicate(p.clone()));
        (!schema.is_empty()).then_some(schema)
    }
}

/// Which literal predicates are handed to the fulltext index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FulltextConfig {
    /// Index every literal predicate.
    pub all: bool,
    pub predicates: BTreeSet<Uri>,
}

impl FulltextConfig {
    pub fn covers(&self, predicate: &Uri) -> bool {
        self.all || self.predicates.contains(predicate)
    }

    pub fn is_enabled(&self) -> bool {
        self.all || !self.predicates.is_empty()
    }
}

/// Everything needed to build an `RdfStore`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub encoding: EncodingPolicy,
    pub vocabulary: Vocabulary,
    pub schema: SchemaConfig,
    pub fulltext: FulltextConfig,
}

impl StoreConfig {
    /// Default configuration with a different encoding.
    pub fn with_encoding(encoding: EncodingPolicy) -> Self {
        Self {
            encoding,
            ..Default::default()
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: StoreConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content)
    }

    /// Serialize back to TOML.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.vocabulary.validate()?;
        let objects: BTreeSet<&Uri> = self.schema.object_predicates.iter().collect();
        if let Some(p) = self
            .schema
            .literal_predicates
            .iter()
            .find(|p| objects.contains(p))
        {
            return Err(ConfigError::ConflictingSchema {
                predicate: p.to_string(),
            });
        }
        Ok(())
    }
}
