//! Error types for the extension dispatcher.

use crate::extension::LoadError;
use thiserror::Error;

/// Result type alias using the crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for dispatcher and façade operations.
///
/// Every variant maps onto exactly one [`VpeAlgoErrCode`](crate::status::VpeAlgoErrCode)
/// so the C entry points can report it without losing the category.
#[derive(Error, Debug)]
pub enum Error {
    /// A buffer, parameter or format combination failed validation before
    /// any extension was touched.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// No registered extension advertises the requested capability.
    #[error("no {family} extension supports {key}")]
    CapabilityNotFound {
        /// Operation family that was queried.
        family: &'static str,
        /// Human-readable form of the capability key.
        key: String,
    },

    /// The selected extension's creator did not produce an algorithm object.
    #[error("extension '{name}' failed to create an algorithm instance")]
    ExtensionCreateFailed {
        /// Extension name.
        name: String,
    },

    /// An algorithm object was created but its `init` failed.
    #[error("extension '{name}' failed to initialize: {reason}")]
    ExtensionInitFailed {
        /// Extension name.
        name: String,
        /// Failure reported by the algorithm.
        reason: String,
    },

    /// A resolved algorithm failed while processing.
    #[error("extension '{name}' failed to process: {reason}")]
    ProcessFailed {
        /// Extension name.
        name: String,
        /// Failure reported by the algorithm.
        reason: String,
    },

    /// A resolved algorithm rejected a parameter or format combination.
    #[error("operation not supported: {0}")]
    OperationNotSupported(String),

    /// Every slot of the instance table is occupied.
    #[error("instance table exhausted: no slots available")]
    InstanceTableFull,

    /// The instance id does not refer to a live slot.
    #[error("invalid instance id {0}")]
    InvalidInstance(i32),

    /// The operation is not legal in the object's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Another caller currently owns the creation lock.
    #[error("resource busy, try again later")]
    TryLater,

    /// Creation was disabled after repeated failures.
    #[error("{0} creation disabled after repeated failures")]
    CreationDisabled(&'static str),

    /// Dynamic extension loading failed.
    #[error("extension loading failed: {0}")]
    Load(#[from] LoadError),
}

impl Error {
    /// Shorthand for an [`Error::InvalidValue`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidValue(msg.into())
    }

    /// Shorthand for an [`Error::ProcessFailed`].
    pub fn process_failed(name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ProcessFailed {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true if this error means "nothing is registered for the key".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::CapabilityNotFound { .. })
    }
}
