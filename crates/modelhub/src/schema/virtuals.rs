//! Virtual (computed) fields contributed by custom types.

use std::sync::Arc;

use serde_json::Value;

use super::field::{FieldKind, SchemaField};
use crate::model::Document;
use crate::types::TypeRegistry;

/// Reads a computed value from a document.
pub type Getter = Arc<dyn Fn(&Document) -> Value + Send + Sync>;

/// Writes a computed value back into a document.
pub type Setter = Arc<dyn Fn(&mut Document, Value) + Send + Sync>;

/// Produces the virtual fields for one schema field of a custom type.
///
/// The argument is the owning field key. Returned keys that start with `.`
/// are relative to that key.
pub type VirtualBuilder = Arc<dyn Fn(&str) -> Vec<(String, VirtualSpec)> + Send + Sync>;

/// Getter/setter pair as returned by a builder. Either half may be missing.
#[derive(Clone, Default)]
pub struct VirtualSpec {
    /// Optional getter.
    pub get: Option<Getter>,
    /// Optional setter.
    pub set: Option<Setter>,
}

impl VirtualSpec {
    /// Create an empty spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the getter.
    pub fn getter(mut self, get: impl Fn(&Document) -> Value + Send + Sync + 'static) -> Self {
        self.get = Some(Arc::new(get));
        self
    }

    /// Set the setter.
    pub fn setter(mut self, set: impl Fn(&mut Document, Value) + Send + Sync + 'static) -> Self {
        self.set = Some(Arc::new(set));
        self
    }
}

/// A virtual field bound into a schema.
#[derive(Clone)]
pub struct VirtualField {
    get: Getter,
    set: Setter,
}

impl VirtualField {
    /// Bind a spec, replacing missing halves with no-ops.
    pub fn from_spec(spec: VirtualSpec) -> Self {
        Self {
            get: spec.get.unwrap_or_else(|| Arc::new(|_: &Document| Value::Null)),
            set: spec.set.unwrap_or_else(|| Arc::new(|_: &mut Document, _: Value| {})),
        }
    }

    /// Compute the value for a document.
    pub fn get(&self, doc: &Document) -> Value {
        (self.get)(doc)
    }

    /// Write a value through the setter.
    pub fn set(&self, doc: &mut Document, value: Value) {
        (self.set)(doc, value)
    }
}

impl std::fmt::Debug for VirtualField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualField").finish_non_exhaustive()
    }
}

/// Runs virtual builders for custom-typed fields.
pub struct VirtualBinder;

impl VirtualBinder {
    /// Invoke `builder` for `field_key` and resolve relative keys.
    pub fn bind(field_key: &str, builder: &VirtualBuilder) -> Vec<(String, VirtualField)> {
        builder(field_key)
            .into_iter()
            .map(|(path, spec)| {
                let path = if path.starts_with('.') {
                    format!("{}{}", field_key, path)
                } else {
                    path
                };
                (path, VirtualField::from_spec(spec))
            })
            .collect()
    }

    /// Collect the virtuals of every custom-typed field.
    ///
    /// Custom types without a builder contribute nothing.
    pub fn bind_fields(
        fields: &[SchemaField],
        types: &TypeRegistry,
    ) -> Vec<(String, VirtualField)> {
        let mut bound = Vec::new();
        for field in fields {
            let FieldKind::Custom { type_id, .. } = &field.kind else {
                continue;
            };
            if let Some(builder) = types.get(type_id).and_then(|t| t.virtuals) {
                let virtuals = Self::bind(&field.name, &builder);
                tracing::trace!(
                    field = %field.name,
                    type_id = %type_id,
                    count = virtuals.len(),
                    "virtuals bound"
                );
                bound.extend(virtuals);
            }
        }
        bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn upper_builder() -> VirtualBuilder {
        Arc::new(|key: &str| {
            let key = key.to_string();
            vec![
                (
                    ".upper".to_string(),
                    VirtualSpec::new().getter(move |doc| {
                        doc.get(&key)
                            .and_then(Value::as_str)
                            .map(|s| Value::String(s.to_uppercase()))
                            .unwrap_or(Value::Null)
                    }),
                ),
                ("shout".to_string(), VirtualSpec::new()),
            ]
        })
    }

    #[test]
    fn test_relative_keys_are_prefixed() {
        let bound = VirtualBinder::bind("title", &upper_builder());
        let paths: Vec<&str> = bound.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["title.upper", "shout"]);
    }

    #[test]
    fn test_getter_runs_against_document() {
        let bound = VirtualBinder::bind("title", &upper_builder());
        let doc = json!({ "title": "hello" }).as_object().unwrap().clone();
        assert_eq!(bound[0].1.get(&doc), json!("HELLO"));
    }

    #[test]
    fn test_bind_fields_uses_registered_builders() {
        let types = TypeRegistry::new();
        types.install_virtuals("Title", upper_builder());
        types.register("Email", crate::schema::ScalarType::String);

        let fields = vec![
            SchemaField::new(
                "headline",
                FieldKind::Custom {
                    type_id: "Title".into(),
                    storage: crate::schema::ScalarType::String,
                },
            ),
            SchemaField::new(
                "contact",
                FieldKind::Custom {
                    type_id: "Email".into(),
                    storage: crate::schema::ScalarType::String,
                },
            ),
            SchemaField::scalar("body", crate::schema::ScalarType::String),
        ];

        let bound = VirtualBinder::bind_fields(&fields, &types);
        let paths: Vec<&str> = bound.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["headline.upper", "shout"]);
    }

    #[test]
    fn test_missing_halves_are_noops() {
        let field = VirtualField::from_spec(VirtualSpec::new());
        let mut doc = json!({ "a": 1 }).as_object().unwrap().clone();

        assert_eq!(field.get(&doc), Value::Null);
        field.set(&mut doc, json!(2));
        assert_eq!(doc.get("a"), Some(&json!(1)));
    }
}
