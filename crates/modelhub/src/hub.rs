//! The model hub: registry, builder and bus behind one handle.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;

use crate::assembler::{Assembly, SchemaAssembler};
use crate::bus::{NotificationBus, PendingSubscription};
use crate::config::HubConfig;
use crate::connection::{self, SharedConnection};
use crate::definition::ModelDefinition;
use crate::error::Error;
use crate::model::Model;
use crate::registry::{LoadStep, ModelRegistry};
use crate::schema::{ScalarType, Schema, VirtualBinder, VirtualSpec};
use crate::source::ModelSource;
use crate::types::{self, TypePlugin, TypeRegistry};

/// A schema plugin: mutates a schema while its model is being built.
pub type SchemaPlugin = Arc<dyn Fn(&Schema) -> Result<(), Error> + Send + Sync>;

/// Lazily loaded model registry.
///
/// Sources are registered up front (by discovery or by hand) and executed
/// on first access. Each source calls [`ModelHub::create`], which assembles
/// the schema, binds it through the connection and announces the model so
/// that references waiting on it are patched in.
///
/// Locks are never held while sources, plugins or bus callbacks run, so a
/// source may load other models while it is being loaded.
pub struct ModelHub {
    registry: ModelRegistry,
    bus: NotificationBus<Model>,
    types: TypeRegistry,
    type_plugins: RwLock<IndexMap<String, Arc<dyn TypePlugin>>>,
    schema_plugins: DashMap<String, SchemaPlugin>,
    connection: RwLock<Option<SharedConnection>>,
    config: RwLock<Option<HubConfig>>,
    initialized: AtomicBool,
}

impl ModelHub {
    /// Create an uninitialized hub.
    pub fn new() -> Self {
        Self {
            registry: ModelRegistry::new(),
            bus: NotificationBus::new(),
            types: TypeRegistry::new(),
            type_plugins: RwLock::new(IndexMap::new()),
            schema_plugins: DashMap::new(),
            connection: RwLock::new(None),
            config: RwLock::new(None),
            initialized: AtomicBool::new(false),
        }
    }

    /// Use `connection` instead of opening one from the configured URL.
    pub fn with_connection(self, connection: SharedConnection) -> Self {
        *self.connection.write() = Some(connection);
        self
    }

    /// Make a type plugin available to [`HubConfig::types`].
    ///
    /// Registered plugins shadow built-ins of the same name.
    pub fn register_type_plugin(&self, plugin: Arc<dyn TypePlugin>) {
        let name = plugin.name().to_string();
        tracing::debug!(plugin = %name, "type plugin registered");
        self.type_plugins.write().insert(name, plugin);
    }

    /// Initialize the hub. Can only be called once.
    ///
    /// Opens the connection, loads type plugins in configured order, then
    /// discovers models under `model_path`.
    pub fn init(&self, config: &HubConfig) -> Result<(), Error> {
        if self
            .initialized
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::DuplicateInit);
        }

        tracing::info!(
            version = env!("CARGO_PKG_VERSION"),
            url = %config.url,
            debug = config.debug,
            "initializing model hub"
        );
        *self.config.write() = Some(config.clone());

        let connection = {
            let mut slot = self.connection.write();
            match slot.as_ref() {
                Some(existing) => existing.clone(),
                None => {
                    let opened = connection::connect(&config.url)?;
                    *slot = Some(opened.clone());
                    opened
                }
            }
        };
        connection.set_debug(config.debug);

        for name in &config.types {
            let plugin = self.type_plugin(name)?;
            plugin.load(self)?;
            tracing::debug!(plugin = %name, "type plugin loaded");
        }

        if let Some(path) = &config.model_path {
            self.discover(path)?;
        }
        Ok(())
    }

    /// Check whether [`ModelHub::init`] has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// The configuration passed to `init`.
    pub fn config(&self) -> Option<HubConfig> {
        self.config.read().clone()
    }

    /// Register every definition file under `root`.
    pub fn discover(&self, root: impl AsRef<Path>) -> Result<usize, Error> {
        self.registry.discover(root.as_ref())
    }

    /// Register a source for `name`. It runs on first access.
    pub fn register_source(
        &self,
        name: &str,
        source: impl ModelSource + 'static,
    ) -> Result<(), Error> {
        self.registry.register(name, Arc::new(source))
    }

    /// Register a custom type.
    pub fn register_type(&self, id: impl Into<String>, storage: ScalarType) {
        self.types.register(id, storage);
    }

    /// Install the virtual builder for a custom type.
    ///
    /// Unknown types are registered with `Mixed` storage.
    pub fn install_virtuals(
        &self,
        type_id: impl Into<String>,
        builder: impl Fn(&str) -> Vec<(String, VirtualSpec)> + Send + Sync + 'static,
    ) {
        self.types.install_virtuals(type_id, Arc::new(builder));
    }

    /// Install a schema plugin under `name`.
    ///
    /// Definitions opt in by listing the name in their `plugins`.
    pub fn install_plugin(
        &self,
        name: impl Into<String>,
        plugin: impl Fn(&Schema) -> Result<(), Error> + Send + Sync + 'static,
    ) {
        let name = name.into();
        tracing::debug!(plugin = %name, "schema plugin installed");
        self.schema_plugins.insert(name, Arc::new(plugin));
    }

    /// Get a model, executing its source if it has not run yet.
    ///
    /// Returns `None` when the source ran without building the model, or
    /// when the model is requested while its own source is still running.
    pub fn get(&self, name: &str) -> Result<Option<Model>, Error> {
        match self.registry.begin_load(name)? {
            LoadStep::Ready(handle) => Ok(handle),
            LoadStep::Trigger(source) => {
                tracing::debug!(model = name, location = %source.location(), "loading model");
                let result = source.load(name, self);
                let handle = self.registry.finish_load(name, result.is_ok());
                if let Err(e) = result {
                    tracing::warn!(model = name, error = %e, "model source failed");
                    return Err(e);
                }
                Ok(handle)
            }
        }
    }

    /// Get a model that must be built.
    pub fn require(&self, name: &str) -> Result<Model, Error> {
        self.get(name)?
            .ok_or_else(|| Error::malformed(name, "source did not build the model"))
    }

    /// Build and register a model from a definition.
    ///
    /// References to models that are not built yet are added to the schema
    /// when those models are created.
    pub fn create(&self, name: &str, definition: ModelDefinition) -> Result<Model, Error> {
        if !self.is_initialized() {
            return Err(Error::NotInitialized);
        }
        let connection = self
            .connection
            .read()
            .clone()
            .ok_or(Error::NotInitialized)?;

        let schema = self.registry.prepare_build(name)?;
        let assembly = match &definition.schema {
            Some(raw) => SchemaAssembler::new(name, &schema, &self.registry, &self.types)
                .assemble(raw)?,
            None => Assembly::default(),
        };

        let bound = self
            .commit(name, &schema, &assembly, &definition)
            .and_then(|()| connection.bind_model(name, &schema, definition.collection.as_deref()));
        let collection = match bound {
            Ok(collection) => collection,
            Err(e) => {
                schema.clear();
                return Err(e);
            }
        };

        let mut properties: IndexMap<String, Value> = definition
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (key, value) in &definition.statics {
            properties.insert(key.clone(), value.clone());
        }

        let model = Model::new(
            name,
            schema.clone(),
            collection,
            properties,
            definition.static_methods.clone(),
        );
        self.registry.store(&model)?;

        for binding in assembly.deferred {
            let owner = schema.clone();
            let label = binding.label();
            let target = binding.target.clone();
            self.bus.subscribe_once(&target, label, move |built: &Model| {
                owner.add_field(binding.resolve(built.schema()));
            });
        }

        tracing::debug!(
            model = name,
            collection = model.collection(),
            fields = schema.len(),
            "model built"
        );
        self.bus.announce(name, &model);
        Ok(model)
    }

    /// Check that every deferred reference has been resolved.
    pub fn verify(&self) -> Result<(), Error> {
        let pending = self.bus.pending();
        if pending.is_empty() {
            return Ok(());
        }
        Err(Error::UnresolvedReferences(
            pending.into_iter().map(|p| p.label).collect(),
        ))
    }

    /// Deferred references still waiting on their target.
    pub fn pending_references(&self) -> Vec<PendingSubscription> {
        self.bus.pending()
    }

    /// The model registry.
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// The custom type registry.
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// The notification bus models are announced on.
    pub fn bus(&self) -> &NotificationBus<Model> {
        &self.bus
    }

    /// The connection, once the hub is initialized.
    pub fn connection(&self) -> Option<SharedConnection> {
        self.connection.read().clone()
    }

    /// Installed schema plugin names, sorted.
    pub fn plugin_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schema_plugins.iter().map(|p| p.key().clone()).collect();
        names.sort();
        names
    }

    fn type_plugin(&self, name: &str) -> Result<Arc<dyn TypePlugin>, Error> {
        if let Some(plugin) = self.type_plugins.read().get(name) {
            return Ok(plugin.clone());
        }
        types::builtin_plugin(name).ok_or_else(|| Error::UnknownPlugin(name.to_string()))
    }

    /// Write the assembled definition into the pending schema.
    fn commit(
        &self,
        name: &str,
        schema: &Schema,
        assembly: &Assembly,
        definition: &ModelDefinition,
    ) -> Result<(), Error> {
        schema.set_options(definition.options);
        schema.add_fields(assembly.fields.iter().cloned());
        if definition.options.timestamps {
            schema.add_timestamps();
        }

        for (path, field) in VirtualBinder::bind_fields(&assembly.fields, &self.types) {
            schema.add_virtual(path, field);
        }
        if definition.options.id {
            schema.add_id_virtual();
        }
        for (method, func) in &definition.methods {
            schema.add_method(method.clone(), func.clone());
        }

        for plugin_name in &definition.plugins {
            let plugin = self
                .schema_plugins
                .get(plugin_name)
                .map(|p| p.value().clone())
                .ok_or_else(|| Error::UnknownPlugin(plugin_name.clone()))?;
            plugin(schema)?;
            schema.mark_plugin(plugin_name.clone());
            tracing::trace!(model = name, plugin = %plugin_name, "schema plugin applied");
        }
        Ok(())
    }
}

impl Default for ModelHub {
    fn default() -> Self {
        Self::new()
    }
}
