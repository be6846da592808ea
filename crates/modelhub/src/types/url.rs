//! URL type.

use super::TypePlugin;
use crate::error::Error;
use crate::hub::ModelHub;
use crate::schema::ScalarType;

/// Registers `Url`, stored as a string. It has no virtuals.
pub struct UrlType;

impl TypePlugin for UrlType {
    fn name(&self) -> &str {
        "url"
    }

    fn load(&self, hub: &ModelHub) -> Result<(), Error> {
        hub.register_type("Url", ScalarType::String);
        Ok(())
    }
}
