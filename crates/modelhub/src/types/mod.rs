//! Custom field types and the plugins that provide them.
//!
//! A custom type is a named storage type with an optional virtual builder.
//! Type plugins are loaded during hub initialization, in configured order,
//! and register their types through the hub.

mod email;
mod fullname;
mod url;

use std::sync::Arc;

use dashmap::DashMap;

use crate::error::Error;
use crate::hub::ModelHub;
use crate::schema::{FieldType, ScalarType, VirtualBuilder};

pub use email::EmailType;
pub use fullname::FullNameType;
pub use url::UrlType;

/// A registered custom type.
#[derive(Clone)]
pub struct CustomType {
    /// Type id used in schema definitions.
    pub id: String,
    /// How values are stored.
    pub storage: ScalarType,
    /// Virtual builder, if the type contributes computed fields.
    pub virtuals: Option<VirtualBuilder>,
}

impl std::fmt::Debug for CustomType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomType")
            .field("id", &self.id)
            .field("storage", &self.storage)
            .field("virtuals", &self.virtuals.is_some())
            .finish()
    }
}

/// A loadable bundle of custom types.
pub trait TypePlugin: Send + Sync {
    /// Name used in [`crate::HubConfig::types`].
    fn name(&self) -> &str;

    /// Register the plugin's types on the hub.
    fn load(&self, hub: &ModelHub) -> Result<(), Error>;
}

/// Look up a built-in type plugin.
pub fn builtin_plugin(name: &str) -> Option<Arc<dyn TypePlugin>> {
    match name {
        "email" => Some(Arc::new(EmailType)),
        "url" => Some(Arc::new(UrlType)),
        "fullname" => Some(Arc::new(FullNameType)),
        _ => None,
    }
}

/// Registry of custom types, keyed by id.
#[derive(Default)]
pub struct TypeRegistry {
    types: DashMap<String, CustomType>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom type. Re-registering keeps an installed virtual builder.
    pub fn register(&self, id: impl Into<String>, storage: ScalarType) {
        let id = id.into();
        self.types
            .entry(id.clone())
            .and_modify(|t| t.storage = storage)
            .or_insert_with(|| CustomType {
                id,
                storage,
                virtuals: None,
            });
    }

    /// Install the virtual builder for a type, registering it as `Mixed` if unknown.
    pub fn install_virtuals(&self, id: impl Into<String>, builder: VirtualBuilder) {
        let id = id.into();
        self.types
            .entry(id.clone())
            .and_modify(|t| t.virtuals = Some(builder.clone()))
            .or_insert_with(|| CustomType {
                id,
                storage: ScalarType::Mixed,
                virtuals: Some(builder),
            });
    }

    /// Get a custom type by id.
    pub fn get(&self, id: &str) -> Option<CustomType> {
        self.types.get(id).map(|t| t.value().clone())
    }

    /// Check whether a custom type is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.types.contains_key(id)
    }

    /// Registered type ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.types.iter().map(|t| t.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Resolve a type name to a built-in scalar or a registered custom type.
    pub fn resolve(&self, type_name: &str) -> Option<FieldType> {
        if let Some(scalar) = ScalarType::from_name(type_name) {
            return Some(FieldType::Scalar(scalar));
        }
        self.contains(type_name)
            .then(|| FieldType::Custom(type_name.to_string()))
    }
}
