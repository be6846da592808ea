//! Hub configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Default connection URL.
pub const DEFAULT_URL: &str = "memory://default";

/// Model hub configuration.
///
/// Can be built in code or read from a JSON file:
///
/// ```json
/// { "url": "memory://app", "debug": true, "types": ["email"], "modelPath": "./models" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct HubConfig {
    /// Connection URL.
    pub url: String,

    /// Verbose logging of database operations.
    pub debug: bool,

    /// Type plugins to load, in order.
    pub types: Vec<String>,

    /// Root directory scanned for model definitions. `None` skips discovery.
    pub model_path: Option<PathBuf>,
}

impl HubConfig {
    /// Create a configuration for the given connection URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            debug: false,
            types: Vec::new(),
            model_path: None,
        }
    }

    /// Read a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Enable or disable debug logging.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Add a type plugin.
    pub fn with_type(mut self, name: impl Into<String>) -> Self {
        self.types.push(name.into());
        self
    }

    /// Replace the type plugin list.
    pub fn with_types(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.types = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the model directory.
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(path.into());
        self
    }

    /// Check if discovery will run.
    pub fn has_model_path(&self) -> bool {
        self.model_path.is_some()
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self::new(DEFAULT_URL)
    }
}
