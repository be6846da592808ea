//! Model definitions: the input to the model builder.
//!
//! A definition is either built in Rust with the `with_*`-style methods or
//! parsed from a JSON definition file:
//!
//! ```json
//! {
//!   "schema": {
//!     "title": { "type": "String", "required": true },
//!     "author": { "type": "ObjectId", "ref": "User" },
//!     "parent": { "type": "ObjectId", "ref": "$circular" },
//!     "tags": ["String"]
//!   },
//!   "collection": "articles",
//!   "statics": { "pageSize": 20 }
//! }
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::Error;
use crate::model::{Document, InstanceMethod, Model, StaticMethod};
use crate::schema::{ScalarType, SchemaOptions};

/// Reference marker meaning "the model being defined".
pub const SELF_REFERENCE: &str = "$circular";

/// Target of a reference field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelRef {
    /// The model that owns the field.
    SelfRef,
    /// Another model, by name.
    Named(String),
}

impl ModelRef {
    /// Parse a reference target, recognizing the self marker.
    pub fn parse(target: &str) -> Self {
        if target == SELF_REFERENCE {
            ModelRef::SelfRef
        } else {
            ModelRef::Named(target.to_string())
        }
    }

    /// Resolve the target name for a field owned by `owner`.
    pub fn target_name<'a>(&'a self, owner: &'a str) -> &'a str {
        match self {
            ModelRef::SelfRef => owner,
            ModelRef::Named(name) => name,
        }
    }
}

/// A raw field spec, before type resolution.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct FieldSpec {
    /// Declared type name (`"String"`, `"ObjectId"`, a custom type id...).
    pub type_name: String,
    /// Referenced model, for reference fields.
    pub reference: Option<ModelRef>,
    /// Array of values.
    pub many: bool,
    /// Required flag.
    pub required: bool,
    /// Default value.
    pub default: Option<Value>,
    /// Index flag.
    pub index: bool,
}

const FIELD_OPTION_KEYS: [&str; 5] = ["type", "ref", "required", "default", "index"];

impl FieldSpec {
    /// A field of the named type.
    pub fn of(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            reference: None,
            many: false,
            required: false,
            default: None,
            index: false,
        }
    }

    /// A field of a built-in scalar type.
    pub fn scalar(scalar: ScalarType) -> Self {
        Self::of(scalar.name())
    }

    /// An `ObjectId` reference to `target`. `"$circular"` refers to the owner.
    pub fn reference(target: &str) -> Self {
        Self {
            reference: Some(ModelRef::parse(target)),
            ..Self::scalar(ScalarType::ObjectId)
        }
    }

    /// An `ObjectId` reference to the owning model.
    pub fn self_reference() -> Self {
        Self::reference(SELF_REFERENCE)
    }

    /// Make this an array field.
    pub fn many(mut self) -> Self {
        self.many = true;
        self
    }

    /// Mark as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark as indexed.
    pub fn indexed(mut self) -> Self {
        self.index = true;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Check if this spec is a reference.
    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }

    fn from_options(options: Map<String, Value>) -> Result<Self, String> {
        if let Some(key) = options
            .keys()
            .find(|k| !FIELD_OPTION_KEYS.contains(&k.as_str()))
        {
            return Err(format!("unsupported field option {}", key));
        }

        let reference = match options.get("ref") {
            None | Some(Value::Null) => None,
            Some(Value::String(target)) => Some(ModelRef::parse(target)),
            // Long form: { "$circular": "Name" }
            Some(Value::Object(obj)) => match obj.get(SELF_REFERENCE) {
                Some(Value::String(target)) if obj.len() == 1 => Some(ModelRef::parse(target)),
                _ => return Err(format!("ref object must be {{\"{}\": name}}", SELF_REFERENCE)),
            },
            Some(other) => return Err(format!("ref must be a string, got {}", other)),
        };

        let type_name = match options.get("type") {
            Some(Value::String(name)) => name.clone(),
            None if reference.is_some() => ScalarType::ObjectId.name().to_string(),
            None => return Err("field options need a type".to_string()),
            Some(other) => return Err(format!("type must be a string, got {}", other)),
        };

        let flag = |key: &str| -> Result<bool, String> {
            match options.get(key) {
                None => Ok(false),
                Some(Value::Bool(b)) => Ok(*b),
                Some(other) => Err(format!("{} must be a boolean, got {}", key, other)),
            }
        };

        Ok(Self {
            type_name,
            reference,
            many: false,
            required: flag("required")?,
            default: options.get("default").cloned(),
            index: flag("index")?,
        })
    }
}

impl TryFrom<Value> for FieldSpec {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(type_name) => Ok(FieldSpec::of(type_name)),
            Value::Object(options) => FieldSpec::from_options(options),
            Value::Array(mut items) => match items.len() {
                0 => Ok(FieldSpec::scalar(ScalarType::Mixed).many()),
                1 => {
                    let inner = FieldSpec::try_from(items.remove(0))?;
                    if inner.many {
                        return Err("nested arrays are not supported".to_string());
                    }
                    Ok(inner.many())
                }
                n => Err(format!("array fields take one element type, got {}", n)),
            },
            other => Err(format!("invalid field spec {}", other)),
        }
    }
}

/// Everything needed to build one model.
#[derive(Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelDefinition {
    /// Raw fields in declaration order. `None` builds a field-less model.
    pub schema: Option<IndexMap<String, FieldSpec>>,
    /// Collection override.
    pub collection: Option<String>,
    /// Schema options.
    pub options: SchemaOptions,
    /// Schema plugins to apply, by installed name.
    pub plugins: Vec<String>,
    /// Static values exposed on the model.
    pub statics: IndexMap<String, Value>,
    /// Extra model properties. Statics win on conflicting keys.
    pub metadata: Map<String, Value>,
    /// Instance methods.
    #[serde(skip)]
    pub methods: IndexMap<String, InstanceMethod>,
    /// Static methods.
    #[serde(skip)]
    pub static_methods: IndexMap<String, StaticMethod>,
}

impl ModelDefinition {
    /// Create an empty definition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON definition.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Add a field.
    pub fn field(mut self, key: impl Into<String>, spec: FieldSpec) -> Self {
        self.schema
            .get_or_insert_with(IndexMap::new)
            .insert(key.into(), spec);
        self
    }

    /// Override the collection name.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection = Some(name.into());
        self
    }

    /// Set schema options.
    pub fn options(mut self, options: SchemaOptions) -> Self {
        self.options = options;
        self
    }

    /// Apply a schema plugin.
    pub fn plugin(mut self, name: impl Into<String>) -> Self {
        self.plugins.push(name.into());
        self
    }

    /// Add a static value.
    pub fn static_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.statics.insert(key.into(), value);
        self
    }

    /// Add a metadata property.
    pub fn metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Add an instance method.
    pub fn method(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&Document, &[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    ) -> Self {
        self.methods.insert(name.into(), Arc::new(method));
        self
    }

    /// Add a static method.
    pub fn static_method(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&Model, &[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    ) -> Self {
        self.static_methods.insert(name.into(), Arc::new(method));
        self
    }

    /// Field keys in declaration order.
    pub fn field_keys(&self) -> Vec<&str> {
        self.schema
            .as_ref()
            .map(|s| s.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for ModelDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelDefinition")
            .field("schema", &self.schema)
            .field("collection", &self.collection)
            .field("options", &self.options)
            .field("plugins", &self.plugins)
            .field("statics", &self.statics)
            .field("metadata", &self.metadata)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("static_methods", &self.static_methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(value: Value) -> Result<FieldSpec, String> {
        FieldSpec::try_from(value)
    }

    #[test]
    fn test_shorthand_type() {
        let field = spec(json!("String")).unwrap();
        assert_eq!(field.type_name, "String");
        assert!(!field.many);
        assert!(!field.is_reference());
    }

    #[test]
    fn test_reference_forms() {
        let named = spec(json!({ "type": "ObjectId", "ref": "User" })).unwrap();
        assert_eq!(named.reference, Some(ModelRef::Named("User".into())));

        let marker = spec(json!({ "type": "ObjectId", "ref": "$circular" })).unwrap();
        assert_eq!(marker.reference, Some(ModelRef::SelfRef));

        let long = spec(json!({ "type": "ObjectId", "ref": { "$circular": "Post" } })).unwrap();
        assert_eq!(long.reference, Some(ModelRef::Named("Post".into())));

        let untyped = spec(json!({ "ref": "User" })).unwrap();
        assert_eq!(untyped.type_name, "ObjectId");
    }

    #[test]
    fn test_array_forms() {
        let tags = spec(json!(["String"])).unwrap();
        assert!(tags.many);
        assert_eq!(tags.type_name, "String");

        let refs = spec(json!([{ "type": "ObjectId", "ref": "Comment" }])).unwrap();
        assert!(refs.many);
        assert_eq!(refs.reference, Some(ModelRef::Named("Comment".into())));

        let mixed = spec(json!([])).unwrap();
        assert_eq!(mixed.type_name, "Mixed");

        assert!(spec(json!(["String", "Number"])).is_err());
        assert!(spec(json!([["String"]])).is_err());
    }

    #[test]
    fn test_invalid_specs() {
        assert!(spec(json!(42)).is_err());
        assert!(spec(json!({ "required": true })).is_err());
        assert!(spec(json!({ "type": "String", "unique": true })).is_err());
        assert!(spec(json!({ "type": "String", "required": "yes" })).is_err());
        assert!(spec(json!({ "type": "ObjectId", "ref": { "$circular": 1 } })).is_err());
    }

    #[test]
    fn test_definition_from_json() {
        let def = ModelDefinition::from_json(
            r#"{
                "schema": {
                    "title": { "type": "String", "required": true, "default": "untitled" },
                    "author": { "type": "ObjectId", "ref": "User" }
                },
                "collection": "articles",
                "options": { "timestamps": true },
                "statics": { "pageSize": 20 },
                "metadata": { "owner": "blog" }
            }"#,
        )
        .unwrap();

        assert_eq!(def.field_keys(), vec!["title", "author"]);
        assert_eq!(def.collection.as_deref(), Some("articles"));
        assert!(def.options.timestamps);
        assert!(def.options.strict);
        assert_eq!(def.statics["pageSize"], json!(20));
        assert_eq!(def.metadata["owner"], json!("blog"));

        let title = &def.schema.as_ref().unwrap()["title"];
        assert!(title.required);
        assert_eq!(title.default, Some(json!("untitled")));
    }

    #[test]
    fn test_definition_rejects_unknown_keys() {
        let err = ModelDefinition::from_json(r#"{ "instanceMethods": {} }"#).unwrap_err();
        assert!(matches!(err, Error::Json(_)));

        let err = ModelDefinition::from_json(r#"{ "schema": { "a": 5 } }"#).unwrap_err();
        assert!(err.to_string().contains("invalid field spec"));
    }

    #[test]
    fn test_definition_builder() {
        let def = ModelDefinition::new()
            .field("name", FieldSpec::scalar(ScalarType::String).required())
            .field("parent", FieldSpec::self_reference())
            .collection("people")
            .plugin("audit")
            .static_value("kind", json!("person"))
            .method("noop", |_, _| Ok(Value::Null));

        assert_eq!(def.field_keys(), vec!["name", "parent"]);
        assert_eq!(def.plugins, vec!["audit"]);
        assert!(def.methods.contains_key("noop"));
        assert!(def.schema.as_ref().unwrap()["parent"].is_reference());
    }
}
