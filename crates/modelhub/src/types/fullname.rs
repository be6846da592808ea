//! Person name type with a computed full name.

use serde_json::{json, Value};

use super::TypePlugin;
use crate::error::Error;
use crate::hub::ModelHub;
use crate::schema::{ScalarType, VirtualSpec};

/// Registers `FullName`: a `{ "first", "last" }` object with a `.full`
/// virtual that joins and splits the two parts.
pub struct FullNameType;

impl TypePlugin for FullNameType {
    fn name(&self) -> &str {
        "fullname"
    }

    fn load(&self, hub: &ModelHub) -> Result<(), Error> {
        hub.register_type("FullName", ScalarType::Mixed);
        hub.install_virtuals("FullName", |key| {
            let get_key = key.to_string();
            let set_key = key.to_string();
            vec![(
                ".full".to_string(),
                VirtualSpec::new()
                    .getter(move |doc| {
                        let Some(name) = doc.get(&get_key).and_then(Value::as_object) else {
                            return Value::Null;
                        };
                        let parts: Vec<&str> = ["first", "last"]
                            .iter()
                            .filter_map(|part| name.get(*part).and_then(Value::as_str))
                            .filter(|s| !s.is_empty())
                            .collect();
                        Value::String(parts.join(" "))
                    })
                    .setter(move |doc, value| {
                        let full = value.as_str().unwrap_or_default().trim();
                        let (first, last) = full.split_once(' ').unwrap_or((full, ""));
                        doc.insert(
                            set_key.clone(),
                            json!({ "first": first, "last": last.trim() }),
                        );
                    }),
            )]
        });
        Ok(())
    }
}
