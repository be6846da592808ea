//! Schema assembly and forward-reference deferral.
//!
//! The assembler turns raw field specs into schema fields. Reference fields
//! are resolved in one of three ways:
//!
//! 1. a reference to the owning model (the `$circular` marker, or its own
//!    name) points at the owner's schema right away;
//! 2. a reference to a model that is already built inlines that model's
//!    schema right away;
//! 3. anything else becomes a [`DeferredBinding`]: the field is left out of
//!    the schema for now and added once the target model is announced.
//!
//! Assembly does not touch the owner's schema. The caller commits the
//! result, so a failed build leaves nothing behind.

use indexmap::IndexMap;
use serde_json::Value;

use crate::definition::{FieldSpec, ModelRef};
use crate::error::Error;
use crate::registry::ModelRegistry;
use crate::schema::{FieldKind, FieldType, ScalarType, Schema, SchemaField};
use crate::types::TypeRegistry;

/// A reference field waiting for its target model to be built.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredBinding {
    /// Model that owns the field.
    pub owner: String,
    /// Field key.
    pub key: String,
    /// Model being waited on.
    pub target: String,
    /// Type of the stored key.
    pub key_type: ScalarType,
    /// Array of references.
    pub many: bool,
    /// Required flag.
    pub required: bool,
    /// Default value.
    pub default: Option<Value>,
    /// Index flag.
    pub indexed: bool,
}

impl DeferredBinding {
    /// Label used for the bus subscription.
    pub fn label(&self) -> String {
        format!("{}.{}", self.owner, self.key)
    }

    /// Build the resolved field once the target's schema is available.
    pub fn resolve(&self, target_schema: &Schema) -> SchemaField {
        SchemaField::new(
            self.key.clone(),
            FieldKind::Reference {
                target: self.target.clone(),
                key_type: self.key_type,
                schema: target_schema.downgrade(),
            },
        )
        .with_many(self.many)
        .with_required(self.required)
        .with_default(self.default.clone())
        .with_index(self.indexed)
    }
}

/// Output of an assembly pass.
#[derive(Debug, Default)]
pub struct Assembly {
    /// Fields resolved now, in declaration order.
    pub fields: Vec<SchemaField>,
    /// Reference fields waiting on another model.
    pub deferred: Vec<DeferredBinding>,
}

impl Assembly {
    /// Check whether any field was deferred.
    pub fn has_deferred(&self) -> bool {
        !self.deferred.is_empty()
    }
}

/// Assembles the schema of one model.
pub struct SchemaAssembler<'a> {
    model: &'a str,
    schema: &'a Schema,
    registry: &'a ModelRegistry,
    types: &'a TypeRegistry,
}

impl<'a> SchemaAssembler<'a> {
    /// Create an assembler for `model`, whose (pending) schema is `schema`.
    pub fn new(
        model: &'a str,
        schema: &'a Schema,
        registry: &'a ModelRegistry,
        types: &'a TypeRegistry,
    ) -> Self {
        Self {
            model,
            schema,
            registry,
            types,
        }
    }

    /// Resolve every field of `raw`.
    pub fn assemble(&self, raw: &IndexMap<String, FieldSpec>) -> Result<Assembly, Error> {
        self.validate_keys(raw)?;

        let mut assembly = Assembly::default();
        for (key, spec) in raw {
            let field_type = self
                .types
                .resolve(&spec.type_name)
                .ok_or_else(|| Error::UnknownType {
                    model: self.model.to_string(),
                    field: key.clone(),
                    type_name: spec.type_name.clone(),
                })?;

            match &spec.reference {
                Some(reference) => {
                    self.assemble_reference(key, spec, reference, field_type, &mut assembly)?
                }
                None => assembly.fields.push(self.plain_field(key, spec, field_type)),
            }
        }

        tracing::debug!(
            model = self.model,
            resolved = assembly.fields.len(),
            deferred = assembly.deferred.len(),
            "schema assembled"
        );
        Ok(assembly)
    }

    fn assemble_reference(
        &self,
        key: &str,
        spec: &FieldSpec,
        reference: &ModelRef,
        field_type: FieldType,
        assembly: &mut Assembly,
    ) -> Result<(), Error> {
        let key_type = match field_type {
            FieldType::Scalar(scalar) if scalar.is_reference_key() => scalar,
            other => {
                return Err(Error::malformed(
                    self.model,
                    format!("field {} cannot reference a model with key type {}", key, other),
                ))
            }
        };

        let target = reference.target_name(self.model);
        let binding = DeferredBinding {
            owner: self.model.to_string(),
            key: key.to_string(),
            target: target.to_string(),
            key_type,
            many: spec.many,
            required: spec.required,
            default: spec.default.clone(),
            indexed: spec.index,
        };

        if target == self.model {
            assembly.fields.push(binding.resolve(&self.schema));
            return Ok(());
        }

        match self.registry.handle(target) {
            Some(built) => {
                tracing::trace!(model = self.model, field = key, target, "reference inlined");
                assembly.fields.push(binding.resolve(built.schema()));
            }
            None => {
                tracing::debug!(model = self.model, field = key, target, "reference deferred");
                assembly.deferred.push(binding);
            }
        }
        Ok(())
    }

    fn plain_field(&self, key: &str, spec: &FieldSpec, field_type: FieldType) -> SchemaField {
        let kind = match field_type {
            FieldType::Scalar(scalar) => FieldKind::Scalar(scalar),
            FieldType::Custom(type_id) => {
                let storage = self
                    .types
                    .get(&type_id)
                    .map_or(ScalarType::Mixed, |t| t.storage);
                FieldKind::Custom { type_id, storage }
            }
        };

        SchemaField::new(key, kind)
            .with_many(spec.many)
            .with_required(spec.required)
            .with_default(spec.default.clone())
            .with_index(spec.index)
    }

    fn validate_keys(&self, raw: &IndexMap<String, FieldSpec>) -> Result<(), Error> {
        for key in raw.keys() {
            if key.is_empty() {
                return Err(Error::malformed(self.model, "empty field key"));
            }
            if key.starts_with('$') {
                return Err(Error::malformed(
                    self.model,
                    format!("field key {} must not start with $", key),
                ));
            }
            if key.split('.').any(str::is_empty) {
                return Err(Error::malformed(
                    self.model,
                    format!("field key {} has an empty path segment", key),
                ));
            }
            if let Some(parent) = raw
                .keys()
                .find(|other| key.len() > other.len() && key.starts_with(&format!("{}.", other)))
            {
                return Err(Error::malformed(
                    self.model,
                    format!("field {} is nested under field {}", key, parent),
                ));
            }
        }
        Ok(())
    }
}
