//! Field definitions for assembled schemas.

use serde_json::Value;

use super::schema::{Schema, WeakSchema};
use super::types::ScalarType;

/// What a committed field stores.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// A built-in scalar.
    Scalar(ScalarType),
    /// A plugin-provided type, stored as `storage`.
    Custom {
        /// Custom type id.
        type_id: String,
        /// Underlying storage type.
        storage: ScalarType,
    },
    /// A resolved reference to another model.
    Reference {
        /// Referenced model name.
        target: String,
        /// Type of the stored key.
        key_type: ScalarType,
        /// The referenced model's schema.
        schema: WeakSchema,
    },
}

/// A field within an assembled schema.
#[derive(Debug, Clone)]
pub struct SchemaField {
    /// Field path.
    pub name: String,
    /// Field kind.
    pub kind: FieldKind,
    /// Whether the field holds an array of values.
    pub many: bool,
    /// Whether the field is required.
    pub required: bool,
    /// Default value if not provided.
    pub default: Option<Value>,
    /// Whether this field should be indexed.
    pub indexed: bool,
}

impl SchemaField {
    /// Create a scalar field.
    pub fn scalar(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self::new(name, FieldKind::Scalar(scalar))
    }

    /// Create a resolved reference field.
    pub fn reference(name: impl Into<String>, target: impl Into<String>, schema: &Schema) -> Self {
        Self::new(
            name,
            FieldKind::Reference {
                target: target.into(),
                key_type: ScalarType::ObjectId,
                schema: schema.downgrade(),
            },
        )
    }

    /// Create a field of the given kind.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            many: false,
            required: false,
            default: None,
            indexed: false,
        }
    }

    /// Mark as an array field.
    pub fn with_many(mut self, many: bool) -> Self {
        self.many = many;
        self
    }

    /// Mark as required.
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: Option<Value>) -> Self {
        self.default = default;
        self
    }

    /// Mark as indexed.
    pub fn with_index(mut self, indexed: bool) -> Self {
        self.indexed = indexed;
        self
    }

    /// Check if this field is a reference.
    pub fn is_reference(&self) -> bool {
        matches!(self.kind, FieldKind::Reference { .. })
    }

    /// Name of the referenced model, if this is a reference.
    pub fn target(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Reference { target, .. } => Some(target),
            _ => None,
        }
    }

    /// The inlined schema of the referenced model, if this is a reference
    /// and that schema is still alive.
    pub fn referenced_schema(&self) -> Option<Schema> {
        match &self.kind {
            FieldKind::Reference { schema, .. } => schema.upgrade(),
            _ => None,
        }
    }

    /// The type stored for this field.
    pub fn storage_type(&self) -> ScalarType {
        match &self.kind {
            FieldKind::Scalar(s) => *s,
            FieldKind::Custom { storage, .. } => *storage,
            FieldKind::Reference { key_type, .. } => *key_type,
        }
    }

    /// Human-readable type description.
    pub fn type_label(&self) -> String {
        let inner = match &self.kind {
            FieldKind::Scalar(s) => s.to_string(),
            FieldKind::Custom { type_id, .. } => type_id.clone(),
            FieldKind::Reference { target, .. } => format!("ref {}", target),
        };
        if self.many {
            format!("[{}]", inner)
        } else {
            inner
        }
    }
}
