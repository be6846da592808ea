//! Database connection boundary.
//!
//! The hub never talks to a document store directly. It hands each built
//! schema to a [`Connection`], which binds it to a collection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Error;
use crate::schema::Schema;

/// URL scheme of the in-memory connection.
pub const MEMORY_SCHEME: &str = "memory://";

/// A collection a model was bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    /// Model name.
    pub model: String,
    /// Collection name.
    pub name: String,
}

impl Collection {
    /// Create a collection binding.
    pub fn new(model: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            name: name.into(),
        }
    }
}

/// A document-database connection that can bind model schemas.
pub trait Connection: Send + Sync {
    /// Bind `schema` as model `name`, optionally overriding the collection name.
    fn bind_model(
        &self,
        name: &str,
        schema: &Schema,
        collection: Option<&str>,
    ) -> Result<Collection, Error>;

    /// Toggle verbose logging of database operations.
    fn set_debug(&self, _debug: bool) {}
}

/// Shared connection handle.
pub type SharedConnection = Arc<dyn Connection>;

/// Open a connection for a URL.
///
/// Only `memory://` URLs are served in-process; anything else must be
/// provided through [`crate::ModelHub::with_connection`].
pub fn connect(url: &str) -> Result<SharedConnection, Error> {
    match url.strip_prefix(MEMORY_SCHEME) {
        Some(database) => Ok(Arc::new(MemoryConnection::new(database))),
        None => Err(Error::Config(format!(
            "unsupported connection url {}: no driver is registered for this scheme",
            url
        ))),
    }
}

/// Derive the default collection name for a model.
///
/// Lowercases the name and applies simple English pluralization.
pub fn collection_name(model: &str) -> String {
    let lower = model.to_lowercase();
    if lower.ends_with('s') {
        return lower;
    }
    if let Some(stem) = lower.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{}ies", stem);
        }
    }
    if lower.ends_with(['x', 'z']) || lower.ends_with("ch") || lower.ends_with("sh") {
        return format!("{}es", lower);
    }
    format!("{}s", lower)
}

/// In-process connection that records bindings.
pub struct MemoryConnection {
    database: String,
    debug: AtomicBool,
    bindings: Mutex<HashMap<String, Collection>>,
}

impl MemoryConnection {
    /// Create a connection for the named database.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            debug: AtomicBool::new(false),
            bindings: Mutex::new(HashMap::new()),
        }
    }

    /// Database name.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Whether debug logging is on.
    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    /// Collection bound to a model, if any.
    pub fn binding(&self, model: &str) -> Option<Collection> {
        self.bindings.lock().get(model).cloned()
    }

    /// Number of bound models.
    pub fn binding_count(&self) -> usize {
        self.bindings.lock().len()
    }
}

impl Connection for MemoryConnection {
    fn bind_model(
        &self,
        name: &str,
        schema: &Schema,
        collection: Option<&str>,
    ) -> Result<Collection, Error> {
        let mut bindings = self.bindings.lock();
        if bindings.contains_key(name) {
            return Err(Error::Connection(format!(
                "cannot overwrite model {} once bound",
                name
            )));
        }

        let binding = Collection::new(
            name,
            collection.map_or_else(|| collection_name(name), str::to_string),
        );

        if self.is_debug() {
            tracing::info!(
                database = %self.database,
                model = name,
                collection = %binding.name,
                fields = schema.len(),
                "bind model"
            );
        }

        bindings.insert(name.to_string(), binding.clone());
        Ok(binding)
    }

    fn set_debug(&self, debug: bool) {
        self.debug.store(debug, Ordering::Relaxed);
    }
}
