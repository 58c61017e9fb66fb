//! Thing registry error types.

use thiserror::Error;

use hearth_plugins::PluginError;
use hearth_storage::StorageError;
use hearth_types::{
    PairingTransactionId, StateTypeId, ThingClassId, ThingId, ValidationError,
};

/// Errors from thing registry operations.
#[derive(Debug, Error)]
pub enum ThingError {
    /// No thing with the given id exists.
    #[error("thing not found: {0}")]
    NotFound(ThingId),

    /// No class with the given id exists in the catalogue.
    #[error("thing class not found: {0}")]
    ClassNotFound(ThingClassId),

    /// The referenced parent thing does not exist.
    #[error("parent thing not found: {0}")]
    ParentNotFound(ThingId),

    /// The thing's class does not declare the referenced state.
    #[error("state type {0} not declared on this thing")]
    StateNotFound(StateTypeId),

    /// A param failed validation against its schema.
    #[error(transparent)]
    Param(#[from] ValidationError),

    /// A read-only param would change on reconfiguration.
    #[error("param '{0}' is read only")]
    ReadOnlyParam(String),

    /// No pairing transaction with the given id is in flight.
    #[error("pairing transaction not found: {0}")]
    PairingNotFound(PairingTransactionId),

    /// Persisting or loading a record failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The plugin host rejected the operation synchronously.
    #[error(transparent)]
    Plugin(#[from] PluginError),
}

/// Result type for registry operations.
pub type ThingResult<T> = Result<T, ThingError>;
