//! State schemas and live state values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};
use crate::ids::{ParamTypeId, StateTypeId};
use crate::param::Unit;
use crate::value::{Value, ValueOperator, ValueType};

/// Whether a state is a sensor reading, an actuator setting, or both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IoType {
    /// Not an I/O state.
    #[default]
    None,
    /// A digital input (read-only on the wire).
    DigitalInput,
    /// A digital output.
    DigitalOutput,
    /// An analog input.
    AnalogInput,
    /// An analog output.
    AnalogOutput,
}

/// Change-detection filter applied by the registry on writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StateValueFilter {
    /// Any write that differs from the stored value emits a change.
    #[default]
    None,
    /// Flapping writes that bounce back to the previous value within a short
    /// window are coalesced into no change.
    Adjacent,
}

/// The immutable descriptor of one state.
///
/// Carries the same value schema as a param type plus state-specific
/// attributes. A `writable` state implies an action type with the same id and
/// a single param mirroring this schema; the catalogue enforces that at load
/// time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateType {
    /// Unique id of this descriptor.
    pub id: StateTypeId,
    /// Machine name, stable across releases.
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Ordering hint for UIs.
    #[serde(default)]
    pub index: i32,
    /// The declared value type.
    pub value_type: ValueType,
    /// Value a non-cached state resets to on boot.
    pub default_value: Value,
    /// Inclusive lower bound.
    #[serde(default)]
    pub min_value: Option<Value>,
    /// Inclusive upper bound.
    #[serde(default)]
    pub max_value: Option<Value>,
    /// When non-empty, the value must be an element of this set.
    #[serde(default)]
    pub allowed_values: Vec<Value>,
    /// Physical unit.
    #[serde(default)]
    pub unit: Unit,
    /// I/O classification.
    #[serde(default)]
    pub io_type: IoType,
    /// Whether the state can be written, implying a same-id action type.
    #[serde(default)]
    pub writable: bool,
    /// Whether the last value survives a process restart.
    #[serde(default)]
    pub cached: bool,
    /// Hint that a history logger should record this state.
    #[serde(default)]
    pub suggest_logging: bool,
    /// Change-detection filter.
    #[serde(default)]
    pub filter: StateValueFilter,
    /// Numeric writes within this distance of the stored value are not
    /// changes.
    #[serde(default)]
    pub dead_band: Option<f64>,
}

impl StateType {
    /// Create a descriptor with the given id, name, type, and default;
    /// everything else unset.
    #[must_use]
    pub fn new(
        id: StateTypeId,
        name: impl Into<String>,
        value_type: ValueType,
        default_value: Value,
    ) -> Self {
        let name = name.into();
        Self {
            id,
            display_name: name.clone(),
            name,
            index: 0,
            value_type,
            default_value,
            min_value: None,
            max_value: None,
            allowed_values: Vec::new(),
            unit: Unit::None,
            io_type: IoType::None,
            writable: false,
            cached: false,
            suggest_logging: false,
            filter: StateValueFilter::None,
            dead_band: None,
        }
    }

    /// Mark the state writable.
    #[must_use]
    pub fn writable(mut self) -> Self {
        self.writable = true;
        self
    }

    /// Mark the state cached across restarts.
    #[must_use]
    pub fn cached(mut self) -> Self {
        self.cached = true;
        self
    }

    /// Validate a value against this state's schema, the same way a param
    /// value is validated: type tag, declared range, allowed set.
    ///
    /// # Errors
    ///
    /// Returns the first failing [`ValidationError`].
    pub fn validate(&self, value: &Value) -> ValidationResult {
        let param_type_id = ParamTypeId::from_uuid(self.id.as_uuid());
        if !value.matches(self.value_type) {
            return Err(ValidationError::BadType {
                param_type_id,
                name: self.name.clone(),
                expected: self.value_type,
                value: value.clone(),
            });
        }
        let out_of_range = self
            .min_value
            .as_ref()
            .is_some_and(|min| ValueOperator::Less.evaluate(value, min))
            || self
                .max_value
                .as_ref()
                .is_some_and(|max| ValueOperator::Greater.evaluate(value, max));
        if out_of_range {
            return Err(ValidationError::OutOfRange {
                param_type_id,
                name: self.name.clone(),
                value: value.clone(),
            });
        }
        if !self.allowed_values.is_empty() && !self.allowed_values.contains(value) {
            return Err(ValidationError::NotInAllowedValues {
                param_type_id,
                name: self.name.clone(),
                value: value.clone(),
            });
        }
        Ok(())
    }
}

/// The live value of one state on a configured thing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    /// The state type this value belongs to.
    pub state_type_id: StateTypeId,
    /// The current value.
    pub value: Value,
    /// When the value last changed.
    pub timestamp: DateTime<Utc>,
}

impl State {
    /// Create a state holding the given value, stamped now.
    #[must_use]
    pub fn new(state_type_id: StateTypeId, value: Value) -> Self {
        Self {
            state_type_id,
            value,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let st = StateType::new(
            StateTypeId::new(),
            "power",
            ValueType::Bool,
            Value::Bool(false),
        )
        .writable()
        .cached();
        assert!(st.writable);
        assert!(st.cached);
        assert_eq!(st.display_name, "power");
    }

    #[test]
    fn test_state_serde_round_trip() {
        let state = State::new(StateTypeId::new(), Value::Double(21.5));
        let json = serde_json::to_string(&state).unwrap();
        let back: State = serde_json::from_str(&json).unwrap();
        assert_eq!(state, back);
    }
}
