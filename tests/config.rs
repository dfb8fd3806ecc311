//! Loading store configuration from disk.

use std::io::Write;

use quadgraph::config::StoreConfig;
use quadgraph::error::{ConfigError, QuadError};
use quadgraph::model::{CompleteStatement, Literal, Slot, Uri, WildcardStatement};
use quadgraph::store::{GraphStore, PropertyGraph};
use quadgraph::{EncodingPolicy, RdfStore};

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn loaded_config_drives_the_store() {
    let file = write_config(
        r#"
        encoding = "always-middle"

        [vocabulary]
        uri_key = "_iri"

        [schema]
        object_predicates = ["http://xmlns.com/foaf/0.1/homepage"]
        "#,
    );
    let config = StoreConfig::load(file.path()).unwrap();
    let store = RdfStore::in_memory(config).unwrap();
    assert_eq!(store.policy(), EncodingPolicy::AlwaysMiddle);

    let emil = Uri::new("http://ex.org/emil").unwrap();
    let homepage = Uri::new("http://xmlns.com/foaf/0.1/homepage").unwrap();
    store
        .add_statement(&CompleteStatement::in_default_graph(
            emil.clone(),
            homepage.clone(),
            Literal::plain("http://emil.example.org/"),
        ))
        .unwrap();

    let tx = store.store().begin().unwrap();
    assert!(tx.lookup_vertex("_iri", emil.as_str()).unwrap().is_some());
    assert!(tx.lookup_vertex("_uri", emil.as_str()).unwrap().is_none());
    drop(tx);

    let found = store
        .get_statements(&WildcardStatement::new(
            Slot::Bound(emil.into()),
            homepage,
            Slot::any(),
            Slot::any(),
        ))
        .unwrap();
    assert_eq!(found.len(), 1);
    assert!(found[0].object().as_resource().is_some());
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let err = StoreConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn invalid_vocabulary_is_rejected_by_the_store() {
    let mut config = StoreConfig::default();
    config.vocabulary.contexts_key = config.vocabulary.uri_key.clone();
    let err = RdfStore::in_memory(config).unwrap_err();
    assert!(matches!(
        err,
        QuadError::Config(ConfigError::InvalidVocabulary { .. })
    ));
}

#[test]
fn saved_config_loads_back() {
    let config = StoreConfig::with_encoding(EncodingPolicy::Dense);
    let file = write_config(&config.to_toml_string().unwrap());
    assert_eq!(StoreConfig::load(file.path()).unwrap(), config);
}
