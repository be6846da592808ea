//! Schema objects for models.
//!
//! A schema is the field-to-type mapping of one model plus its virtual
//! fields and instance methods.

mod field;
mod schema;
mod types;
pub mod virtuals;

pub use field::{FieldKind, SchemaField};
pub use schema::{Schema, SchemaOptions, WeakSchema};
pub use types::{FieldType, ScalarType};
pub use virtuals::{Getter, Setter, VirtualBinder, VirtualBuilder, VirtualField, VirtualSpec};
