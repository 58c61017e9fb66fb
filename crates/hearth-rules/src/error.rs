//! Rule engine error types.

use thiserror::Error;

use hearth_storage::StorageError;
use hearth_time::TimeError;
use hearth_types::{
    ActionTypeId, EventTypeId, RuleId, StateTypeId, ThingId, ValidationError,
};

/// Errors from rule engine operations.
#[derive(Debug, Error)]
pub enum RuleError {
    /// No rule with the given id exists.
    #[error("rule not found: {0}")]
    NotFound(RuleId),

    /// A referenced thing does not exist.
    #[error("rule references unknown thing {0}")]
    ThingNotFound(ThingId),

    /// A referenced event type is not declared by the thing's class.
    #[error("rule references unknown event type {0}")]
    EventTypeNotFound(EventTypeId),

    /// A referenced state type is not declared by the thing's class.
    #[error("rule references unknown state type {0}")]
    StateTypeNotFound(StateTypeId),

    /// A referenced action type is not declared by the thing's class.
    #[error("rule references unknown action type {0}")]
    ActionTypeNotFound(ActionTypeId),

    /// A referenced interface is not in the catalogue.
    #[error("rule references unknown interface '{0}'")]
    InterfaceNotFound(String),

    /// A comparison value cannot be compared with the state's type.
    #[error("comparison value does not fit state type {0}")]
    IncomparableValue(StateTypeId),

    /// The rule's time descriptor is defective.
    #[error(transparent)]
    Time(#[from] TimeError),

    /// A literal action param failed validation.
    #[error(transparent)]
    Param(#[from] ValidationError),

    /// A state reference resolved to a value the target param rejects.
    #[error("state reference of {state_type_id} does not conform to the target param")]
    ParamTypeMismatch {
        /// The referenced source state.
        state_type_id: StateTypeId,
    },

    /// The rule has an empty action list.
    #[error("a rule needs at least one action")]
    NoActions,

    /// Persisting or loading a record failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for rule engine operations.
pub type RuleResult<T> = Result<T, RuleError>;
