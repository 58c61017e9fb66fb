//! Validation and catalogue error types.

use thiserror::Error;

use crate::ids::{ActionTypeId, ParamTypeId, PluginId, StateTypeId, ThingClassId};
use crate::value::{Value, ValueType};

/// Why a value failed validation against its declared param schema.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// The value's tag does not match the declared `valueType`.
    #[error("param '{name}' has the wrong type: expected {expected}, got {value}")]
    BadType {
        /// The param type the value was validated against.
        param_type_id: ParamTypeId,
        /// Schema name of the param.
        name: String,
        /// The declared type.
        expected: ValueType,
        /// The offending value.
        value: Value,
    },

    /// The value lies outside the declared `[minValue, maxValue]` range.
    #[error("param '{name}' is out of range: {value}")]
    OutOfRange {
        /// The param type the value was validated against.
        param_type_id: ParamTypeId,
        /// Schema name of the param.
        name: String,
        /// The offending value.
        value: Value,
    },

    /// The declared allowed-values set is non-empty and does not contain the
    /// value.
    #[error("param '{name}' is not an allowed value: {value}")]
    NotInAllowedValues {
        /// The param type the value was validated against.
        param_type_id: ParamTypeId,
        /// Schema name of the param.
        name: String,
        /// The offending value.
        value: Value,
    },

    /// A required (non-defaulted) param is absent.
    #[error("required param '{name}' is missing")]
    Missing {
        /// The missing param type.
        param_type_id: ParamTypeId,
        /// Schema name of the param.
        name: String,
    },

    /// The param map carries a key the schema does not declare.
    #[error("unknown param: {param_type_id}")]
    UnknownParam {
        /// The undeclared key.
        param_type_id: ParamTypeId,
    },
}

/// Result type for value validation.
pub type ValidationResult = Result<(), ValidationError>;

/// Schema defects rejected when plugin metadata is loaded into the catalogue.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogueError {
    /// Two catalogue entries within one plugin share an id.
    #[error("duplicate id {id} in plugin {plugin_id}")]
    DuplicateId {
        /// The owning plugin.
        plugin_id: PluginId,
        /// The repeated id, rendered hyphenated.
        id: String,
    },

    /// A writable state type has no matching action type.
    #[error("writable state '{name}' ({state_type_id}) lacks the implied action type")]
    MissingStateAction {
        /// The state type in question.
        state_type_id: StateTypeId,
        /// Schema name of the state.
        name: String,
    },

    /// An action type implied by a writable state does not mirror the state's
    /// param schema.
    #[error("action {action_type_id} does not mirror writable state '{name}'")]
    StateActionMismatch {
        /// The mismatched action.
        action_type_id: ActionTypeId,
        /// Schema name of the state.
        name: String,
    },

    /// `minValue > maxValue`.
    #[error("param '{name}' declares an inverted range")]
    InvertedRange {
        /// The defective param type.
        param_type_id: ParamTypeId,
        /// Schema name of the param.
        name: String,
    },

    /// An allowed value does not carry the declared `valueType`.
    #[error("param '{name}' allows a value of the wrong type: {value}")]
    AllowedValueType {
        /// The defective param type.
        param_type_id: ParamTypeId,
        /// Schema name of the param.
        name: String,
        /// The offending allowed value.
        value: Value,
    },

    /// A thing class declares an interface the catalogue does not know.
    #[error("thing class {thing_class_id} declares unknown interface '{interface}'")]
    UnknownInterface {
        /// The declaring class.
        thing_class_id: ThingClassId,
        /// The unknown interface name.
        interface: String,
    },

    /// The metadata document is structurally malformed.
    #[error("malformed plugin metadata: {0}")]
    Metadata(String),

    /// A referenced catalogue entry does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Result type for catalogue operations.
pub type CatalogueResult<T> = Result<T, CatalogueError>;
