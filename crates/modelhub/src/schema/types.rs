//! Core type definitions for schema fields.

use serde::{Deserialize, Serialize};

/// Scalar types understood by the document layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    /// UTF-8 string.
    String,
    /// Double precision number.
    Number,
    /// Boolean value.
    Boolean,
    /// Timestamp.
    Date,
    /// 12-byte document identifier.
    ObjectId,
    /// Binary data.
    Buffer,
    /// Arbitrary nested value.
    Mixed,
}

/// Field types: a built-in scalar or a plugin-provided custom type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// A built-in scalar.
    Scalar(ScalarType),
    /// A custom type, identified by the id it was registered under.
    Custom(String),
}

impl ScalarType {
    /// All built-in scalars.
    pub const ALL: [ScalarType; 7] = [
        ScalarType::String,
        ScalarType::Number,
        ScalarType::Boolean,
        ScalarType::Date,
        ScalarType::ObjectId,
        ScalarType::Buffer,
        ScalarType::Mixed,
    ];

    /// Canonical type name.
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::String => "String",
            ScalarType::Number => "Number",
            ScalarType::Boolean => "Boolean",
            ScalarType::Date => "Date",
            ScalarType::ObjectId => "ObjectId",
            ScalarType::Buffer => "Buffer",
            ScalarType::Mixed => "Mixed",
        }
    }

    /// Look up a built-in scalar by name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|scalar| scalar.name().eq_ignore_ascii_case(name))
    }

    /// Check if a reference can be keyed by this type.
    pub fn is_reference_key(&self) -> bool {
        matches!(
            self,
            ScalarType::ObjectId | ScalarType::String | ScalarType::Number
        )
    }
}

impl FieldType {
    /// Create a scalar field type.
    pub fn scalar(scalar: ScalarType) -> Self {
        FieldType::Scalar(scalar)
    }

    /// Create a custom field type.
    pub fn custom(id: impl Into<String>) -> Self {
        FieldType::Custom(id.into())
    }

    /// Get the inner scalar type if this is a built-in type.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            FieldType::Scalar(s) => Some(*s),
            FieldType::Custom(_) => None,
        }
    }

    /// Get the custom type id, if any.
    pub fn custom_id(&self) -> Option<&str> {
        match self {
            FieldType::Custom(id) => Some(id),
            FieldType::Scalar(_) => None,
        }
    }
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Scalar(s) => write!(f, "{}", s),
            FieldType::Custom(id) => f.write_str(id),
        }
    }
}
