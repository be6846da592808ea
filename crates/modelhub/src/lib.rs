//! modelhub - lazy model registry for document-database schemas.
//!
//! Model definitions are discovered on disk (or registered in code) without
//! being executed. A model's source runs the first time the model is
//! requested, and references between models resolve in whatever order the
//! models happen to be built: a reference to a model that does not exist
//! yet is deferred and patched into the schema once that model is
//! announced on the hub's notification bus.
//!
//! ```no_run
//! use modelhub::{HubConfig, ModelHub};
//!
//! # fn main() -> Result<(), modelhub::Error> {
//! let hub = ModelHub::new();
//! hub.init(&HubConfig::default().with_type("email").with_model_path("./models"))?;
//!
//! let user = hub.require("User")?;
//! println!("{} -> {}", user.name(), user.collection());
//! hub.verify()?;
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod bus;
pub mod config;
pub mod connection;
pub mod definition;
pub mod discovery;
pub mod error;
pub mod hub;
pub mod model;
pub mod registry;
pub mod schema;
pub mod source;
pub mod types;

pub use assembler::{Assembly, DeferredBinding, SchemaAssembler};
pub use bus::{Delivery, NotificationBus, PendingSubscription};
pub use config::HubConfig;
pub use connection::{Collection, Connection, MemoryConnection, SharedConnection};
pub use definition::{FieldSpec, ModelDefinition, ModelRef};
pub use error::Error;
pub use hub::{ModelHub, SchemaPlugin};
pub use model::{Document, InstanceMethod, Model, StaticMethod};
pub use registry::{LoadState, ModelRecord, ModelRegistry};
pub use schema::{
    FieldKind, FieldType, ScalarType, Schema, SchemaField, SchemaOptions, VirtualBinder,
    VirtualField, VirtualSpec, WeakSchema,
};
pub use source::{DefinitionSource, FileSource, FnSource, ModelSource};
pub use types::{CustomType, TypePlugin, TypeRegistry};
