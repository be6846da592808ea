//! Core error types.

use std::path::PathBuf;

use thiserror::Error;

/// Model hub errors.
#[derive(Debug, Error)]
pub enum Error {
    /// No model is registered under this name.
    #[error("model {0} not found")]
    NotFound(String),

    /// The hub was initialized twice.
    #[error("model hub is already initialized")]
    DuplicateInit,

    /// An operation that needs an initialized hub ran before `init`.
    #[error("model hub is not initialized")]
    NotInitialized,

    /// A schema field names a type that is neither built in nor registered.
    #[error("unknown type {type_name} for field {model}.{field}")]
    UnknownType {
        /// Model being assembled.
        model: String,
        /// Field carrying the type.
        field: String,
        /// The unresolved type identifier.
        type_name: String,
    },

    /// A definition could not be turned into a model.
    #[error("malformed definition for model {model}: {reason}")]
    MalformedDefinition {
        /// Model being defined.
        model: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Two sources or two builds claimed the same model name.
    #[error("model {name} is already defined ({existing})")]
    DuplicateModel {
        /// Model name.
        name: String,
        /// Where the existing definition came from.
        existing: String,
    },

    /// A type plugin or schema plugin name is not installed.
    #[error("unknown plugin {0}")]
    UnknownPlugin(String),

    /// A model has no static or instance method with this name.
    #[error("model {model} has no method {method}")]
    UnknownMethod {
        /// Model name.
        model: String,
        /// Requested method.
        method: String,
    },

    /// Deferred references that never resolved.
    #[error("unresolved references: {}", .0.join(", "))]
    UnresolvedReferences(Vec<String>),

    /// The database connection rejected an operation.
    #[error("connection error: {0}")]
    Connection(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem error while scanning or reading a source.
    #[error("io error at {}: {source}", path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a [`Error::MalformedDefinition`].
    pub fn malformed(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedDefinition {
            model: model.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
