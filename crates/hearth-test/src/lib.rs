//! hearth-test — the mock plugin and fixtures backing hearth's tests.
//!
//! The mock plugin serves one thing class, a "virtual switch", with enough
//! schema surface to exercise the whole core: a writable cached bool state,
//! numeric and bool sensor states, a writable string state with an allowed
//! set, a button event, and configurable setup/action/discovery behavior.

#![deny(unsafe_code)]
#![deny(missing_docs)]

mod mock_plugin;

pub use mock_plugin::{ActionBehavior, MockPlugin, ids, mock_metadata};

use std::sync::Arc;

use hearth_types::{PluginMetadata, TypeCatalogue};

/// A catalogue with the mock plugin's metadata registered.
///
/// # Panics
///
/// Panics when the embedded metadata is defective — a test-fixture bug.
#[must_use]
pub fn mock_catalogue() -> Arc<TypeCatalogue> {
    let mut catalogue = TypeCatalogue::new();
    catalogue
        .register_plugin(&mock_metadata())
        .expect("mock metadata must register");
    Arc::new(catalogue)
}

/// Parse arbitrary metadata JSON, panicking on fixture bugs.
///
/// # Panics
///
/// Panics when the document is malformed.
#[must_use]
pub fn metadata_fixture(json: serde_json::Value) -> PluginMetadata {
    PluginMetadata::from_json(json).expect("metadata fixture must parse")
}
