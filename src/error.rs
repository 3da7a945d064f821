//! Error handling module for the build engine
//!
//! Every failure domain gets its own thiserror type. They all convert into
//! `BuildError`, which is what a build pass returns to its caller.
//!
//! A server redirect is not an error; actions return it as
//! `actions::Signal::Redirect`.

use thiserror::Error;

/// A directive's argument shape or types are structurally invalid.
///
/// Raised by `Action::validate()`; never accompanied by a side effect.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid arguments for {action}: {reason}")]
pub struct ValidationError {
    pub action: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            reason: reason.into(),
        }
    }
}

/// A directive's effect failed during `Action::run()`.
///
/// Wraps the collaborator's failure as text so collaborator error types never
/// leak out of the action layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Action {action} failed: {reason}")]
pub struct ActionError {
    pub action: String,
    pub reason: String,
}

impl ActionError {
    pub fn new(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            reason: reason.into(),
        }
    }
}

/// The fact source could not answer a pin lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FactLookupError {
    /// No fact with this name is known to the build
    #[error("Unknown pin attribute '{name}'")]
    UnknownAttribute { name: String },

    /// The fact exists but could not be determined on this machine
    #[error("Pin attribute '{name}' is unavailable: {reason}")]
    Unavailable { name: String, reason: String },
}

/// A directive name has no registered implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown directive '{name}'")]
pub struct UnknownDirectiveError {
    pub name: String,
}

/// Failures of the document transport (reading configs, writing task lists).
#[derive(Error, Debug)]
pub enum TransportError {
    /// The requested document does not exist
    #[error("Document not found: {location}")]
    NotFound { location: String },

    /// The document exists but could not be read or written
    #[error("I/O error on {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    /// The document is not a valid configuration document
    #[error("Failed to parse {location}: {reason}")]
    Parse { location: String, reason: String },

    /// This transport cannot reach the given root
    #[error("Unsupported config root '{root}' (no transport for remote sources)")]
    UnsupportedRoot { root: String },

    /// The task list could not be serialized
    #[error("Failed to serialize task list: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

/// Main error type for a build pass.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error("Pin evaluation failed: {0}")]
    FactLookup(#[from] FactLookupError),

    #[error(transparent)]
    UnknownDirective(#[from] UnknownDirectiveError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A control references something the document does not define
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for build operations
pub type Result<T> = std::result::Result<T, BuildError>;

impl BuildError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
