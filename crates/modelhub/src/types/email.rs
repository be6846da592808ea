//! Email address type.

use serde_json::Value;

use super::TypePlugin;
use crate::error::Error;
use crate::hub::ModelHub;
use crate::schema::{ScalarType, VirtualSpec};

/// Registers `Email`: a string with a read-only `.domain` virtual.
pub struct EmailType;

impl TypePlugin for EmailType {
    fn name(&self) -> &str {
        "email"
    }

    fn load(&self, hub: &ModelHub) -> Result<(), Error> {
        hub.register_type("Email", ScalarType::String);
        hub.install_virtuals("Email", |key| {
            let key = key.to_string();
            vec![(
                ".domain".to_string(),
                VirtualSpec::new().getter(move |doc| {
                    doc.get(&key)
                        .and_then(Value::as_str)
                        .and_then(|addr| addr.rsplit_once('@'))
                        .map(|(_, domain)| Value::String(domain.to_lowercase()))
                        .unwrap_or(Value::Null)
                }),
            )]
        });
        Ok(())
    }
}
