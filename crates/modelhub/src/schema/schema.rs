//! Shared, incrementally extensible schema object.

use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::field::{FieldKind, SchemaField};
use super::types::ScalarType;
use super::virtuals::{VirtualField, VirtualSpec};
use crate::model::{Document, InstanceMethod};

/// Document key every stored document carries.
pub const KEY_FIELD: &str = "_id";

/// Path of the virtual added by [`SchemaOptions::id`].
pub const ID_VIRTUAL: &str = "id";

/// Options carried by a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct SchemaOptions {
    /// Reject document keys that are not declared fields.
    pub strict: bool,
    /// Add `createdAt` and `updatedAt` date fields.
    pub timestamps: bool,
    /// Add an `id` virtual exposing the document key `_id` as a string.
    pub id: bool,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            strict: true,
            timestamps: false,
            id: true,
        }
    }
}

/// A model schema.
///
/// `Schema` is a cheap handle: clones share the same field table. A schema
/// is created empty when its model is registered and filled in when the
/// model is built, so other models can hold a handle to it before that
/// happens. Fields can be added after construction, which is how deferred
/// references are patched in.
#[derive(Clone)]
pub struct Schema {
    inner: Arc<RwLock<SchemaInner>>,
}

/// A non-owning handle to a [`Schema`].
///
/// Reference fields hold one of these so that models referring to each
/// other (or to themselves) do not keep each other alive.
#[derive(Clone)]
pub struct WeakSchema {
    inner: Weak<RwLock<SchemaInner>>,
}

impl WeakSchema {
    /// Get the schema back, if it is still alive.
    pub fn upgrade(&self) -> Option<Schema> {
        self.inner.upgrade().map(|inner| Schema { inner })
    }

    /// Check whether this handle points at `schema`.
    pub fn points_to(&self, schema: &Schema) -> bool {
        Weak::ptr_eq(&self.inner, &Arc::downgrade(&schema.inner))
    }
}

impl std::fmt::Debug for WeakSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.upgrade() {
            Some(schema) => write!(f, "WeakSchema({})", schema.model_name()),
            None => f.write_str("WeakSchema(<dropped>)"),
        }
    }
}

struct SchemaInner {
    model: String,
    fields: IndexMap<String, SchemaField>,
    virtuals: IndexMap<String, VirtualField>,
    methods: IndexMap<String, InstanceMethod>,
    options: SchemaOptions,
    plugins: Vec<String>,
}

impl Schema {
    /// Create an empty schema owned by `model`.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SchemaInner {
                model: model.into(),
                fields: IndexMap::new(),
                virtuals: IndexMap::new(),
                methods: IndexMap::new(),
                options: SchemaOptions::default(),
                plugins: Vec::new(),
            })),
        }
    }

    /// Name of the owning model.
    pub fn model_name(&self) -> String {
        self.inner.read().model.clone()
    }

    /// Check whether two handles point at the same schema.
    pub fn same(&self, other: &Schema) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Create a non-owning handle to this schema.
    pub fn downgrade(&self) -> WeakSchema {
        WeakSchema {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Add (or replace) a field.
    pub fn add_field(&self, field: SchemaField) {
        let mut inner = self.inner.write();
        inner.fields.insert(field.name.clone(), field);
    }

    /// Add several fields, keeping their order.
    pub fn add_fields(&self, fields: impl IntoIterator<Item = SchemaField>) {
        let mut inner = self.inner.write();
        for field in fields {
            inner.fields.insert(field.name.clone(), field);
        }
    }

    /// Get a field by path.
    pub fn field(&self, name: &str) -> Option<SchemaField> {
        self.inner.read().fields.get(name).cloned()
    }

    /// Check whether a field exists.
    pub fn has_field(&self, name: &str) -> bool {
        self.inner.read().fields.contains_key(name)
    }

    /// All fields in insertion order.
    pub fn fields(&self) -> Vec<SchemaField> {
        self.inner.read().fields.values().cloned().collect()
    }

    /// All field paths in insertion order.
    pub fn field_names(&self) -> Vec<String> {
        self.inner.read().fields.keys().cloned().collect()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.inner.read().fields.len()
    }

    /// Check if the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.inner.read().fields.is_empty()
    }

    /// `(field, target)` pairs for every reference field.
    pub fn references(&self) -> Vec<(String, String)> {
        self.inner
            .read()
            .fields
            .values()
            .filter_map(|f| f.target().map(|t| (f.name.clone(), t.to_string())))
            .collect()
    }

    /// Add (or replace) a virtual field.
    pub fn add_virtual(&self, path: impl Into<String>, field: VirtualField) {
        self.inner.write().virtuals.insert(path.into(), field);
    }

    /// Get a virtual field by path.
    pub fn virtual_field(&self, path: &str) -> Option<VirtualField> {
        self.inner.read().virtuals.get(path).cloned()
    }

    /// All virtual paths in insertion order.
    pub fn virtual_names(&self) -> Vec<String> {
        self.inner.read().virtuals.keys().cloned().collect()
    }

    /// Add (or replace) an instance method.
    pub fn add_method(&self, name: impl Into<String>, method: InstanceMethod) {
        self.inner.write().methods.insert(name.into(), method);
    }

    /// Get an instance method.
    pub fn method(&self, name: &str) -> Option<InstanceMethod> {
        self.inner.read().methods.get(name).cloned()
    }

    /// All instance method names.
    pub fn method_names(&self) -> Vec<String> {
        self.inner.read().methods.keys().cloned().collect()
    }

    /// Schema options.
    pub fn options(&self) -> SchemaOptions {
        self.inner.read().options
    }

    /// Replace the schema options.
    pub fn set_options(&self, options: SchemaOptions) {
        self.inner.write().options = options;
    }

    /// Record that a schema plugin ran against this schema.
    pub fn mark_plugin(&self, name: impl Into<String>) {
        self.inner.write().plugins.push(name.into());
    }

    /// Names of the plugins applied so far.
    pub fn plugins(&self) -> Vec<String> {
        self.inner.read().plugins.clone()
    }

    /// Describe the schema as JSON. References are shown by model name.
    pub fn describe(&self) -> Value {
        let inner = self.inner.read();
        let fields: serde_json::Map<String, Value> = inner
            .fields
            .values()
            .map(|f| {
                let mut desc = json!({
                    "type": f.type_label(),
                    "required": f.required,
                    "index": f.indexed,
                });
                if let Some(default) = &f.default {
                    desc["default"] = default.clone();
                }
                (f.name.clone(), desc)
            })
            .collect();

        json!({
            "model": inner.model,
            "fields": fields,
            "virtuals": inner.virtuals.keys().collect::<Vec<_>>(),
            "methods": inner.methods.keys().collect::<Vec<_>>(),
            "plugins": inner.plugins,
            "options": inner.options,
        })
    }

    /// Drop everything committed by a build that did not complete.
    pub(crate) fn clear(&self) {
        let mut inner = self.inner.write();
        inner.fields.clear();
        inner.virtuals.clear();
        inner.methods.clear();
        inner.options = SchemaOptions::default();
        inner.plugins.clear();
    }

    pub(crate) fn add_timestamps(&self) {
        let mut inner = self.inner.write();
        for name in ["createdAt", "updatedAt"] {
            inner.fields.insert(
                name.to_string(),
                SchemaField::new(name, FieldKind::Scalar(ScalarType::Date)),
            );
        }
    }

    /// Add the `id` virtual unless `id` is already a field or virtual.
    pub(crate) fn add_id_virtual(&self) {
        let mut inner = self.inner.write();
        if inner.fields.contains_key(ID_VIRTUAL) || inner.virtuals.contains_key(ID_VIRTUAL) {
            return;
        }
        let spec = VirtualSpec::new()
            .getter(|doc: &Document| match doc.get(KEY_FIELD) {
                Some(Value::String(s)) => Value::String(s.clone()),
                Some(Value::Null) | None => Value::Null,
                Some(other) => Value::String(other.to_string()),
            })
            .setter(|doc: &mut Document, value: Value| {
                doc.insert(KEY_FIELD.to_string(), value);
            });
        inner
            .virtuals
            .insert(ID_VIRTUAL.to_string(), VirtualField::from_spec(spec));
    }
}

impl std::fmt::Debug for Schema {
    // Reference fields can point back at this schema, so only names are printed.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Schema")
            .field("model", &inner.model)
            .field("fields", &inner.fields.keys().collect::<Vec<_>>())
            .field("virtuals", &inner.virtuals.keys().collect::<Vec<_>>())
            .finish()
    }
}
