//! Model registry: name → lazy loading record.
//!
//! Records are created before any definition runs, either by scanning a
//! directory or by registering a source directly. Each record carries an
//! empty schema that other models can reference before the record's own
//! definition has executed.

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::discovery;
use crate::error::Error;
use crate::model::Model;
use crate::schema::Schema;
use crate::source::{FileSource, ModelSource};

/// Lifecycle of a record: `Unloaded → Loading → Built`.
///
/// `Executed` marks a source that ran to completion without building its
/// model. A failed load goes back to `Unloaded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Source not triggered yet (or the last attempt failed).
    Unloaded,
    /// Source is executing.
    Loading,
    /// Source ran but did not build the model.
    Executed,
    /// Model is built.
    Built,
}

/// One registered model.
pub struct ModelRecord {
    name: String,
    location: String,
    source: Option<Arc<dyn ModelSource>>,
    state: LoadState,
    handle: Option<Model>,
    schema: Schema,
}

impl ModelRecord {
    fn new(name: &str, source: Option<Arc<dyn ModelSource>>) -> Self {
        Self {
            name: name.to_string(),
            location: source
                .as_ref()
                .map_or_else(|| "<inline>".to_string(), |s| s.location()),
            source,
            state: LoadState::Unloaded,
            handle: None,
            schema: Schema::new(name),
        }
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the definition comes from.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Current load state.
    pub fn state(&self) -> LoadState {
        self.state
    }

    /// The built model, if any.
    pub fn handle(&self) -> Option<&Model> {
        self.handle.as_ref()
    }

    /// The model's schema. Empty until the model is built.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// What the caller of [`ModelRegistry::begin_load`] must do next.
pub(crate) enum LoadStep {
    /// Nothing to execute; return this handle.
    Ready(Option<Model>),
    /// Execute this source, then call [`ModelRegistry::finish_load`].
    Trigger(Arc<dyn ModelSource>),
}

/// Registry of models keyed by name.
#[derive(Default)]
pub struct ModelRegistry {
    records: RwLock<IndexMap<String, ModelRecord>>,
}

impl ModelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every definition file under `root`.
    ///
    /// Returns the number of models found. Finding none is logged as a
    /// warning. A name found twice, or one that is already registered, is an
    /// error and leaves the registry unchanged.
    pub fn discover(&self, root: &Path) -> Result<usize, Error> {
        let found = discovery::scan(root)?;
        if found.is_empty() {
            tracing::warn!(path = %root.display(), "no models found");
        }

        let mut records = self.records.write();
        let mut batch: IndexMap<String, ModelRecord> = IndexMap::with_capacity(found.len());
        for model in &found {
            let existing = records.get(&model.name).or_else(|| batch.get(&model.name));
            if let Some(existing) = existing {
                return Err(Error::DuplicateModel {
                    name: model.name.clone(),
                    existing: existing.location.clone(),
                });
            }
            let source: Arc<dyn ModelSource> = Arc::new(FileSource::new(&model.path));
            let record = ModelRecord::new(&model.name, Some(source));
            batch.insert(model.name.clone(), record);
        }

        for record in batch.values() {
            tracing::debug!(model = %record.name, location = %record.location, "model registered");
        }
        records.extend(batch);

        tracing::info!(path = %root.display(), models = found.len(), "model discovery complete");
        Ok(found.len())
    }

    /// Register a source under `name`.
    pub fn register(&self, name: &str, source: Arc<dyn ModelSource>) -> Result<(), Error> {
        let mut records = self.records.write();
        if let Some(existing) = records.get(name) {
            return Err(Error::DuplicateModel {
                name: name.to_string(),
                existing: existing.location.clone(),
            });
        }

        let record = ModelRecord::new(name, Some(source));
        tracing::debug!(model = name, location = %record.location, "model registered");
        records.insert(name.to_string(), record);
        Ok(())
    }

    /// Check whether a name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.records.read().contains_key(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.records.read().keys().cloned().collect()
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Load state of a model.
    pub fn state(&self, name: &str) -> Option<LoadState> {
        self.records.read().get(name).map(|r| r.state)
    }

    /// Check whether a model is built.
    pub fn is_built(&self, name: &str) -> bool {
        self.state(name) == Some(LoadState::Built)
    }

    /// The built model, without triggering its source.
    pub fn handle(&self, name: &str) -> Option<Model> {
        self.records.read().get(name).and_then(|r| r.handle.clone())
    }

    /// The schema of a registered model, built or not.
    pub fn schema(&self, name: &str) -> Option<Schema> {
        self.records.read().get(name).map(|r| r.schema.clone())
    }

    /// Where a model's definition comes from.
    pub fn location(&self, name: &str) -> Option<String> {
        self.records.read().get(name).map(|r| r.location.clone())
    }

    /// Run `f` against a record.
    pub fn with_record<R>(&self, name: &str, f: impl FnOnce(&ModelRecord) -> R) -> Option<R> {
        self.records.read().get(name).map(f)
    }

    /// Decide whether `name` needs its source executed, marking it `Loading` if so.
    pub(crate) fn begin_load(&self, name: &str) -> Result<LoadStep, Error> {
        let mut records = self.records.write();
        let record = records
            .get_mut(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;

        match (record.state, &record.source) {
            (LoadState::Unloaded, Some(source)) => {
                record.state = LoadState::Loading;
                Ok(LoadStep::Trigger(source.clone()))
            }
            _ => Ok(LoadStep::Ready(record.handle.clone())),
        }
    }

    /// Record the outcome of executing a source.
    pub(crate) fn finish_load(&self, name: &str, succeeded: bool) -> Option<Model> {
        let mut records = self.records.write();
        let record = records.get_mut(name)?;

        if record.state == LoadState::Loading {
            record.state = match (succeeded, record.handle.is_some()) {
                (_, true) => LoadState::Built,
                (true, false) => {
                    tracing::warn!(
                        model = name,
                        location = %record.location,
                        "source finished without building its model"
                    );
                    LoadState::Executed
                }
                (false, false) => LoadState::Unloaded,
            };
        }
        record.handle.clone()
    }

    /// Schema a build of `name` should fill in.
    ///
    /// Unregistered names get a fresh schema; the record is created when the
    /// build is stored.
    pub(crate) fn prepare_build(&self, name: &str) -> Result<Schema, Error> {
        let records = self.records.read();
        match records.get(name) {
            Some(record) if record.handle.is_some() => Err(Error::DuplicateModel {
                name: name.to_string(),
                existing: record.location.clone(),
            }),
            Some(record) => Ok(record.schema.clone()),
            None => Ok(Schema::new(name)),
        }
    }

    /// Store a built model. The handle is set exactly once.
    pub(crate) fn store(&self, model: &Model) -> Result<(), Error> {
        let mut records = self.records.write();
        let name = model.name();
        let record = records
            .entry(name.to_string())
            .or_insert_with(|| ModelRecord {
                schema: model.schema().clone(),
                ..ModelRecord::new(name, None)
            });

        if record.handle.is_some() {
            return Err(Error::DuplicateModel {
                name: name.to_string(),
                existing: record.location.clone(),
            });
        }
        record.handle = Some(model.clone());
        record.state = LoadState::Built;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::ModelHub;
    use crate::source::FnSource;

    fn noop_source() -> Arc<dyn ModelSource> {
        Arc::new(FnSource::new(|_: &str, _: &ModelHub| Ok(())))
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ModelRegistry::new();
        registry.register("User", noop_source()).unwrap();

        assert!(registry.contains("User"));
        assert_eq!(registry.state("User"), Some(LoadState::Unloaded));
        assert!(!registry.is_built("User"));
        assert!(registry.handle("User").is_none());
        assert!(registry.schema("User").unwrap().is_empty());
        assert_eq!(registry.location("User").as_deref(), Some("<inline>"));
        assert_eq!(registry.names(), vec!["User"]);
    }

    #[test]
    fn test_duplicate_registration() {
        let registry = ModelRegistry::new();
        registry.register("User", noop_source()).unwrap();

        let err = registry.register("User", noop_source()).unwrap_err();
        assert!(matches!(err, Error::DuplicateModel { ref name, .. } if name == "User"));
    }

    #[test]
    fn test_begin_load_is_idempotent() {
        let registry = ModelRegistry::new();
        registry.register("User", noop_source()).unwrap();

        assert!(matches!(registry.begin_load("User").unwrap(), LoadStep::Trigger(_)));
        assert_eq!(registry.state("User"), Some(LoadState::Loading));
        assert!(matches!(registry.begin_load("User").unwrap(), LoadStep::Ready(None)));
    }

    #[test]
    fn test_begin_load_unknown() {
        let registry = ModelRegistry::new();
        assert!(matches!(registry.begin_load("Ghost"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_finish_load_transitions() {
        let registry = ModelRegistry::new();
        registry.register("A", noop_source()).unwrap();
        registry.register("B", noop_source()).unwrap();

        registry.begin_load("A").unwrap();
        assert!(registry.finish_load("A", true).is_none());
        assert_eq!(registry.state("A"), Some(LoadState::Executed));

        registry.begin_load("B").unwrap();
        registry.finish_load("B", false);
        assert_eq!(registry.state("B"), Some(LoadState::Unloaded));
        assert!(matches!(registry.begin_load("B").unwrap(), LoadStep::Trigger(_)));
    }

    #[test]
    fn test_discover_duplicate_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a")).unwrap();
        std::fs::create_dir_all(dir.path().join("b")).unwrap();
        std::fs::write(dir.path().join("a/User.json"), "{}").unwrap();
        std::fs::write(dir.path().join("b/User.json"), "{}").unwrap();

        let registry = ModelRegistry::new();
        let err = registry.discover(dir.path()).unwrap_err();
        assert!(matches!(err, Error::DuplicateModel { .. }));
    }

    #[test]
    fn test_discover_failure_registers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("b")).unwrap();
        std::fs::write(dir.path().join("Alpha.json"), "{}").unwrap();
        std::fs::write(dir.path().join("Beta.json"), "{}").unwrap();
        std::fs::write(dir.path().join("b/Alpha.json"), "{}").unwrap();

        let registry = ModelRegistry::new();
        match registry.discover(dir.path()).unwrap_err() {
            Error::DuplicateModel { name, existing } => {
                assert_eq!(name, "Alpha");
                assert!(existing.ends_with("Alpha.json"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(registry.is_empty());
        assert!(!registry.contains("Beta"));
    }

    #[test]
    fn test_discover_clash_with_registered_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Account.json"), "{}").unwrap();
        std::fs::write(dir.path().join("User.json"), "{}").unwrap();

        let registry = ModelRegistry::new();
        registry.register("User", noop_source()).unwrap();

        let err = registry.discover(dir.path()).unwrap_err();
        assert!(matches!(err, Error::DuplicateModel { ref name, .. } if name == "User"));
        assert_eq!(registry.names(), vec!["User"]);
        assert_eq!(registry.location("User").unwrap(), "<inline>");
    }

    #[test]
    fn test_discover_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new();
        assert_eq!(registry.discover(dir.path()).unwrap(), 0);
        assert!(registry.is_empty());
    }
}
