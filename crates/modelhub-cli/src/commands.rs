//! Subcommand implementations.

use modelhub::{Error, LoadState, ModelHub};
use serde::Serialize;
use serde_json::{json, Value};

/// One row of `list` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSummary {
    /// Model name.
    pub name: String,
    /// Load state.
    pub state: String,
    /// Definition location.
    pub location: String,
}

/// Result of `check`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    /// Models that built.
    pub built: Vec<String>,
    /// Models that failed, with the error.
    pub failed: Vec<(String, String)>,
    /// Deferred references that never resolved.
    pub unresolved: Vec<String>,
}

impl CheckReport {
    /// Check if every model built and every reference resolved.
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty() && self.unresolved.is_empty()
    }
}

fn state_name(state: LoadState) -> &'static str {
    match state {
        LoadState::Unloaded => "unloaded",
        LoadState::Loading => "loading",
        LoadState::Executed => "executed",
        LoadState::Built => "built",
    }
}

/// List registered models.
pub fn list(hub: &ModelHub) -> Vec<ModelSummary> {
    let registry = hub.registry();
    registry
        .names()
        .into_iter()
        .filter_map(|name| {
            registry.with_record(&name, |record| ModelSummary {
                name: record.name().to_string(),
                state: state_name(record.state()).to_string(),
                location: record.location().to_string(),
            })
        })
        .collect()
}

/// Load one model and describe it.
pub fn show(hub: &ModelHub, name: &str) -> Result<Value, Error> {
    let model = hub.require(name)?;
    let mut description = model.schema().describe();
    description["collection"] = json!(model.collection());

    let properties: serde_json::Map<String, Value> = model
        .property_names()
        .into_iter()
        .filter_map(|key| model.property(key).map(|v| (key.to_string(), v.clone())))
        .collect();
    description["statics"] = Value::Object(properties);
    description["pending"] = json!(hub
        .pending_references()
        .into_iter()
        .filter(|p| p.label.starts_with(&format!("{}.", name)))
        .map(|p| p.label)
        .collect::<Vec<_>>());
    Ok(description)
}

/// Load every registered model, then collect unresolved references.
pub fn check(hub: &ModelHub) -> CheckReport {
    let mut report = CheckReport::default();
    for name in hub.registry().names() {
        match hub.require(&name) {
            Ok(_) => report.built.push(name),
            Err(e) => {
                tracing::debug!(model = %name, error = %e, "model failed to load");
                report.failed.push((name, e.to_string()));
            }
        }
    }

    if let Err(Error::UnresolvedReferences(labels)) = hub.verify() {
        report.unresolved = labels;
    }
    report
}
