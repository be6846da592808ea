//! Model definition sources.
//!
//! A source is the lazily executed unit behind a registered model name.
//! When triggered it is expected to call [`ModelHub::create`] for its
//! model; the hub does not look at anything else it does.

use std::path::{Path, PathBuf};

use crate::definition::ModelDefinition;
use crate::error::Error;
use crate::hub::ModelHub;

/// Something that can define a model on demand.
pub trait ModelSource: Send + Sync {
    /// Printable location, used in logs and errors.
    fn location(&self) -> String;

    /// Execute the source. Expected to call `hub.create` for `name`.
    fn load(&self, name: &str, hub: &ModelHub) -> Result<(), Error>;
}

/// A JSON definition file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Create a source for a definition file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the definition file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the definition without building it.
    pub fn read_definition(&self, name: &str) -> Result<ModelDefinition, Error> {
        let contents =
            std::fs::read_to_string(&self.path).map_err(|e| Error::io(&self.path, e))?;
        serde_json::from_str(&contents).map_err(|e| {
            Error::malformed(name, format!("{}: {}", self.path.display(), e))
        })
    }
}

impl ModelSource for FileSource {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self, name: &str, hub: &ModelHub) -> Result<(), Error> {
        let definition = self.read_definition(name)?;
        hub.create(name, definition)?;
        Ok(())
    }
}

/// A source backed by a closure.
pub struct FnSource<F> {
    func: F,
}

impl<F> FnSource<F>
where
    F: Fn(&str, &ModelHub) -> Result<(), Error> + Send + Sync,
{
    /// Wrap a closure.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> ModelSource for FnSource<F>
where
    F: Fn(&str, &ModelHub) -> Result<(), Error> + Send + Sync,
{
    fn location(&self) -> String {
        "<inline>".to_string()
    }

    fn load(&self, name: &str, hub: &ModelHub) -> Result<(), Error> {
        (self.func)(name, hub)
    }
}

/// A source that builds a fixed definition.
pub struct DefinitionSource {
    definition: ModelDefinition,
}

impl DefinitionSource {
    /// Wrap a definition.
    pub fn new(definition: ModelDefinition) -> Self {
        Self { definition }
    }
}

impl ModelSource for DefinitionSource {
    fn location(&self) -> String {
        "<definition>".to_string()
    }

    fn load(&self, name: &str, hub: &ModelHub) -> Result<(), Error> {
        hub.create(name, self.definition.clone())?;
        Ok(())
    }
}
