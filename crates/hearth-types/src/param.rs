//! Param schemas and param values.
//!
//! A [`ParamType`] is the immutable descriptor of one configuration or
//! payload field; a [`Param`] binds a value to a param type id. Validation
//! checks the value's tag against the declared type, the declared range, and
//! the allowed-values set.

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};
use crate::ids::ParamTypeId;
use crate::value::{Value, ValueOperator, ValueType};

/// How a UI should ask for this param.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputType {
    /// No hint.
    #[default]
    None,
    /// A single line of text.
    TextLine,
    /// A multi-line text area.
    TextArea,
    /// A masked secret.
    Password,
    /// A search field.
    Search,
    /// A mail address.
    Mail,
    /// An IPv4 address.
    IPv4,
    /// An IPv6 address.
    IPv6,
    /// A URL.
    Url,
    /// A MAC address.
    MacAddress,
}

/// The physical unit of a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Unit {
    /// Dimensionless.
    #[default]
    None,
    /// Seconds.
    Seconds,
    /// Minutes.
    Minutes,
    /// Hours.
    Hours,
    /// Degrees Celsius.
    DegreeCelsius,
    /// Degrees Fahrenheit.
    DegreeFahrenheit,
    /// Percentage, `0..=100`.
    Percentage,
    /// Lux.
    Lux,
    /// Lumen.
    Lumen,
    /// Watts.
    Watt,
    /// Watt-hours.
    WattHour,
    /// Volts.
    Volt,
    /// Amperes.
    Ampere,
    /// Millibar.
    MilliBar,
    /// Millimeters.
    MilliMeter,
    /// Meters per second.
    MeterPerSecond,
    /// Kilometers per hour.
    KiloMeterPerHour,
    /// Degrees of arc.
    Degree,
    /// Parts per million.
    PartsPerMillion,
    /// Decibel.
    DeciBel,
    /// Mired (reciprocal megakelvin, color temperature).
    Mired,
}

/// The immutable descriptor of one param.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamType {
    /// Unique id of this descriptor.
    pub id: ParamTypeId,
    /// Machine name, stable across releases.
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Ordering hint for UIs.
    #[serde(default)]
    pub index: i32,
    /// The declared value type.
    pub value_type: ValueType,
    /// Default used when the param is omitted. A param without a default is
    /// required.
    #[serde(default)]
    pub default_value: Option<Value>,
    /// Inclusive lower bound.
    #[serde(default)]
    pub min_value: Option<Value>,
    /// Inclusive upper bound.
    #[serde(default)]
    pub max_value: Option<Value>,
    /// Step hint for numeric UIs.
    #[serde(default)]
    pub step_size: Option<f64>,
    /// When non-empty, the value must be an element of this set.
    #[serde(default)]
    pub allowed_values: Vec<Value>,
    /// UI input hint.
    #[serde(default)]
    pub input_type: InputType,
    /// Physical unit.
    #[serde(default)]
    pub unit: Unit,
    /// Whether the param may change after initial setup.
    #[serde(default)]
    pub read_only: bool,
}

impl ParamType {
    /// Create a descriptor with the given id, name, and type; everything else
    /// defaulted.
    #[must_use]
    pub fn new(id: ParamTypeId, name: impl Into<String>, value_type: ValueType) -> Self {
        let name = name.into();
        Self {
            id,
            display_name: name.clone(),
            name,
            index: 0,
            value_type,
            default_value: None,
            min_value: None,
            max_value: None,
            step_size: None,
            allowed_values: Vec::new(),
            input_type: InputType::None,
            unit: Unit::None,
            read_only: false,
        }
    }

    /// Set the default value.
    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default_value = Some(default);
        self
    }

    /// Set the inclusive range.
    #[must_use]
    pub fn with_limits(mut self, min: Value, max: Value) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }

    /// Set the allowed-values set.
    #[must_use]
    pub fn with_allowed_values(mut self, allowed: Vec<Value>) -> Self {
        self.allowed_values = allowed;
        self
    }

    /// Whether a param of this type must be supplied by the caller.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.default_value.is_none()
    }

    /// Validate a value against this descriptor.
    ///
    /// A value is conforming iff its tag matches `value_type`, it lies within
    /// the declared range, and it is an element of `allowed_values` when that
    /// set is non-empty.
    ///
    /// # Errors
    ///
    /// Returns the first failing [`ValidationError`].
    pub fn validate(&self, value: &Value) -> ValidationResult {
        if !value.matches(self.value_type) {
            return Err(ValidationError::BadType {
                param_type_id: self.id,
                name: self.name.clone(),
                expected: self.value_type,
                value: value.clone(),
            });
        }
        if let Some(min) = &self.min_value
            && ValueOperator::Less.evaluate(value, min)
        {
            return Err(self.out_of_range(value));
        }
        if let Some(max) = &self.max_value
            && ValueOperator::Greater.evaluate(value, max)
        {
            return Err(self.out_of_range(value));
        }
        if !self.allowed_values.is_empty() && !self.allowed_values.contains(value) {
            return Err(ValidationError::NotInAllowedValues {
                param_type_id: self.id,
                name: self.name.clone(),
                value: value.clone(),
            });
        }
        Ok(())
    }

    fn out_of_range(&self, value: &Value) -> ValidationError {
        ValidationError::OutOfRange {
            param_type_id: self.id,
            name: self.name.clone(),
            value: value.clone(),
        }
    }
}

/// A value bound to a param type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Param {
    /// The param type this value satisfies.
    pub param_type_id: ParamTypeId,
    /// The value.
    pub value: Value,
}

impl Param {
    /// Bind a value to a param type.
    #[must_use]
    pub fn new(param_type_id: ParamTypeId, value: Value) -> Self {
        Self {
            param_type_id,
            value,
        }
    }
}

/// Find a param type by id.
#[must_use]
pub fn find_param_type(param_types: &[ParamType], id: ParamTypeId) -> Option<&ParamType> {
    param_types.iter().find(|pt| pt.id == id)
}

/// Find a param type by schema name.
#[must_use]
pub fn find_param_type_by_name<'a>(
    param_types: &'a [ParamType],
    name: &str,
) -> Option<&'a ParamType> {
    param_types.iter().find(|pt| pt.name == name)
}

/// Look up a param value by id.
#[must_use]
pub fn param_value(params: &[Param], id: ParamTypeId) -> Option<&Value> {
    params
        .iter()
        .find(|p| p.param_type_id == id)
        .map(|p| &p.value)
}

/// Validate a param map against a param-type list.
///
/// All required (non-defaulted) param types must appear; unknown keys fail;
/// each present value is validated independently.
///
/// # Errors
///
/// Returns the first failing [`ValidationError`].
pub fn validate_params(param_types: &[ParamType], params: &[Param]) -> ValidationResult {
    for param in params {
        let Some(pt) = find_param_type(param_types, param.param_type_id) else {
            return Err(ValidationError::UnknownParam {
                param_type_id: param.param_type_id,
            });
        };
        pt.validate(&param.value)?;
    }
    for pt in param_types {
        if pt.is_required() && param_value(params, pt.id).is_none() {
            return Err(ValidationError::Missing {
                param_type_id: pt.id,
                name: pt.name.clone(),
            });
        }
    }
    Ok(())
}

/// Validate a param map and fill in declared defaults.
///
/// Returns the full param list in schema order.
///
/// # Errors
///
/// Returns the first failing [`ValidationError`].
pub fn normalize_params(
    param_types: &[ParamType],
    params: &[Param],
) -> Result<Vec<Param>, ValidationError> {
    validate_params(param_types, params)?;
    let mut ordered: Vec<&ParamType> = param_types.iter().collect();
    ordered.sort_by_key(|pt| pt.index);
    Ok(ordered
        .into_iter()
        .filter_map(|pt| {
            param_value(params, pt.id)
                .cloned()
                .or_else(|| pt.default_value.clone())
                .map(|value| Param::new(pt.id, value))
        })
        .collect())
}
