//! Bound model handles.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::connection::Collection;
use crate::error::Error;
use crate::schema::Schema;

/// A document as seen by virtuals and methods.
pub type Document = serde_json::Map<String, Value>;

/// A method callable on documents of a model.
pub type InstanceMethod = Arc<dyn Fn(&Document, &[Value]) -> Result<Value, Error> + Send + Sync>;

/// A method callable on the model itself.
pub type StaticMethod = Arc<dyn Fn(&Model, &[Value]) -> Result<Value, Error> + Send + Sync>;

/// A built model: a schema bound to a collection, plus static properties.
///
/// Cloning is cheap and clones refer to the same model.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

struct ModelInner {
    name: String,
    schema: Schema,
    collection: Collection,
    properties: IndexMap<String, Value>,
    static_methods: IndexMap<String, StaticMethod>,
}

impl Model {
    pub(crate) fn new(
        name: impl Into<String>,
        schema: Schema,
        collection: Collection,
        properties: IndexMap<String, Value>,
        static_methods: IndexMap<String, StaticMethod>,
    ) -> Self {
        Self {
            inner: Arc::new(ModelInner {
                name: name.into(),
                schema,
                collection,
                properties,
                static_methods,
            }),
        }
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The model's schema.
    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// Name of the bound collection.
    pub fn collection(&self) -> &str {
        &self.inner.collection.name
    }

    /// Check whether two handles refer to the same model.
    pub fn same(&self, other: &Model) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Get a static property.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.inner.properties.get(key)
    }

    /// All static property names.
    pub fn property_names(&self) -> Vec<&str> {
        self.inner.properties.keys().map(String::as_str).collect()
    }

    /// All static method names.
    pub fn static_method_names(&self) -> Vec<&str> {
        self.inner.static_methods.keys().map(String::as_str).collect()
    }

    /// Call a static method.
    pub fn call_static(&self, method: &str, args: &[Value]) -> Result<Value, Error> {
        let func = self
            .inner
            .static_methods
            .get(method)
            .ok_or_else(|| self.unknown_method(method))?;
        func(self, args)
    }

    /// Call an instance method on a document.
    pub fn call_method(
        &self,
        method: &str,
        doc: &Document,
        args: &[Value],
    ) -> Result<Value, Error> {
        let func = self
            .inner
            .schema
            .method(method)
            .ok_or_else(|| self.unknown_method(method))?;
        func(doc, args)
    }

    /// Compute a virtual field. Returns `None` if the path is not a virtual.
    pub fn get_virtual(&self, doc: &Document, path: &str) -> Option<Value> {
        self.inner.schema.virtual_field(path).map(|v| v.get(doc))
    }

    /// Write through a virtual field. Returns `false` if the path is not a virtual.
    pub fn set_virtual(&self, doc: &mut Document, path: &str, value: Value) -> bool {
        match self.inner.schema.virtual_field(path) {
            Some(v) => {
                v.set(doc, value);
                true
            }
            None => false,
        }
    }

    fn unknown_method(&self, method: &str) -> Error {
        Error::UnknownMethod {
            model: self.inner.name.clone(),
            method: method.to_string(),
        }
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.inner.name)
            .field("collection", &self.inner.collection.name)
            .field("schema", &self.inner.schema)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ScalarType, SchemaField, VirtualField, VirtualSpec};
    use serde_json::json;

    fn sample_model() -> Model {
        let schema = Schema::new("User");
        schema.add_field(SchemaField::scalar("name", ScalarType::String));
        schema.add_virtual(
            "name.length",
            VirtualField::from_spec(VirtualSpec::new().getter(|doc| {
                json!(doc.get("name").and_then(Value::as_str).map_or(0, str::len))
            })),
        );
        schema.add_method(
            "greet",
            Arc::new(|doc: &Document, _: &[Value]| {
                let name = doc.get("name").and_then(Value::as_str).unwrap_or("stranger");
                Ok(json!(format!("hello {}", name)))
            }),
        );

        let mut properties = IndexMap::new();
        properties.insert("label".to_string(), json!("People"));

        let mut statics: IndexMap<String, StaticMethod> = IndexMap::new();
        statics.insert(
            "describe".to_string(),
            Arc::new(|model: &Model, _: &[Value]| Ok(json!(model.collection()))),
        );

        Model::new("User", schema, Collection::new("User", "users"), properties, statics)
    }

    #[test]
    fn test_static_properties() {
        let model = sample_model();
        assert_eq!(model.property("label"), Some(&json!("People")));
        assert!(model.property("missing").is_none());
        assert_eq!(model.property_names(), vec!["label"]);
    }

    #[test]
    fn test_call_static() {
        let model = sample_model();
        assert_eq!(model.call_static("describe", &[]).unwrap(), json!("users"));
        assert!(matches!(
            model.call_static("nope", &[]),
            Err(Error::UnknownMethod { .. })
        ));
    }

    #[test]
    fn test_call_method_and_virtuals() {
        let model = sample_model();
        let doc = json!({ "name": "ada" }).as_object().unwrap().clone();

        assert_eq!(model.call_method("greet", &doc, &[]).unwrap(), json!("hello ada"));
        assert_eq!(model.get_virtual(&doc, "name.length"), Some(json!(3)));
        assert_eq!(model.get_virtual(&doc, "name.other"), None);
    }
}
