//! The value model.
//!
//! Everything that flows through the controller — param values, state values,
//! event payloads — is a [`Value`]. Schemas declare a [`ValueType`] tag and
//! validation matches the tag against the value plus the declared range and
//! allowed-set constraints.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The declared type of a param or state value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueType {
    /// A 128-bit UUID.
    Uuid,
    /// A UTF-8 string.
    String,
    /// A signed 64-bit integer.
    Int,
    /// An unsigned 64-bit integer.
    Uint,
    /// A 64-bit float.
    Double,
    /// A boolean.
    Bool,
    /// An RGBA color.
    Color,
    /// A wall-clock time of day (hour, minute).
    Time,
    /// A list of strings.
    StringList,
    /// A string-keyed map of values.
    Object,
    /// Any value; the schema imposes no tag constraint.
    Variant,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uuid => "uuid",
            Self::String => "string",
            Self::Int => "int",
            Self::Uint => "uint",
            Self::Double => "double",
            Self::Bool => "bool",
            Self::Color => "color",
            Self::Time => "time",
            Self::StringList => "stringList",
            Self::Object => "object",
            Self::Variant => "variant",
        };
        f.write_str(name)
    }
}

/// An RGBA color value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel; 255 is opaque.
    pub a: u8,
}

impl Color {
    /// Create an opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse a `#rrggbb` or `#rrggbbaa` hex string.
    #[must_use]
    pub fn parse_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#')?;
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: byte(6)?,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

/// A wall-clock time of day with minute resolution.
///
/// Serializes as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    /// Create a time of day. Returns `None` if out of range.
    #[must_use]
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    /// The hour, `0..=23`.
    #[must_use]
    pub fn hour(&self) -> u8 {
        self.hour
    }

    /// The minute, `0..=59`.
    #[must_use]
    pub fn minute(&self) -> u8 {
        self.minute
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s
            .split_once(':')
            .ok_or_else(|| format!("invalid time of day: {s}"))?;
        let hour: u8 = h.parse().map_err(|_| format!("invalid hour in: {s}"))?;
        let minute: u8 = m.parse().map_err(|_| format!("invalid minute in: {s}"))?;
        Self::new(hour, minute).ok_or_else(|| format!("time of day out of range: {s}"))
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A dynamically typed value.
///
/// The variants mirror [`ValueType`]; `List` and `Map` back the `Object` and
/// `Variant` schema types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Value {
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// An unsigned integer.
    Uint(u64),
    /// A float.
    Double(f64),
    /// A string.
    String(String),
    /// A list of strings.
    StringList(Vec<String>),
    /// A UUID.
    Uuid(Uuid),
    /// An RGBA color.
    Color(Color),
    /// A time of day.
    Time(TimeOfDay),
    /// A heterogeneous list.
    List(Vec<Value>),
    /// A string-keyed map.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Whether this value carries the given schema tag.
    ///
    /// `Variant` accepts anything; `Object` accepts maps.
    #[must_use]
    pub fn matches(&self, value_type: ValueType) -> bool {
        match value_type {
            ValueType::Variant => true,
            ValueType::Object => matches!(self, Self::Map(_)),
            ValueType::Bool => matches!(self, Self::Bool(_)),
            ValueType::Int => matches!(self, Self::Int(_)),
            ValueType::Uint => matches!(self, Self::Uint(_)),
            ValueType::Double => matches!(self, Self::Double(_)),
            ValueType::String => matches!(self, Self::String(_)),
            ValueType::StringList => matches!(self, Self::StringList(_)),
            ValueType::Uuid => matches!(self, Self::Uuid(_)),
            ValueType::Color => matches!(self, Self::Color(_)),
            ValueType::Time => matches!(self, Self::Time(_)),
        }
    }

    /// The value as a float, coercing integers.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Uint(u) => Some(*u as f64),
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// The value as a bool, without coercion.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The value as a string slice, without coercion.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Order two values, coercing across the numeric variants.
    ///
    /// Returns `None` when the values are not comparable (different
    /// non-numeric kinds, or NaN).
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::StringList(a), Self::StringList(b)) => Some(a.cmp(b)),
            (Self::Uuid(a), Self::Uuid(b)) => Some(a.cmp(b)),
            (Self::Time(a), Self::Time(b)) => Some(a.cmp(b)),
            (Self::Color(a), Self::Color(b)) => (a == b).then_some(Ordering::Equal),
            (Self::List(a), Self::List(b)) => (a == b).then_some(Ordering::Equal),
            (Self::Map(a), Self::Map(b)) => (a == b).then_some(Ordering::Equal),
            _ => {
                let a = self.as_f64()?;
                let b = other.as_f64()?;
                a.partial_cmp(&b)
            },
        }
    }

    /// Interpret a raw JSON value under a declared schema tag.
    ///
    /// This is how plugin metadata expresses defaults, limits, and allowed
    /// values: as naked JSON interpreted per the declared `valueType`.
    #[must_use]
    pub fn from_json(value_type: ValueType, json: &serde_json::Value) -> Option<Self> {
        use serde_json::Value as Json;
        match value_type {
            ValueType::Bool => json.as_bool().map(Self::Bool),
            ValueType::Int => json.as_i64().map(Self::Int),
            ValueType::Uint => json.as_u64().map(Self::Uint),
            ValueType::Double => json.as_f64().map(Self::Double),
            ValueType::String => json.as_str().map(|s| Self::String(s.to_string())),
            ValueType::StringList => json.as_array().and_then(|items| {
                items
                    .iter()
                    .map(|i| i.as_str().map(ToString::to_string))
                    .collect::<Option<Vec<_>>>()
                    .map(Self::StringList)
            }),
            ValueType::Uuid => json
                .as_str()
                .and_then(|s| Uuid::parse_str(s).ok())
                .map(Self::Uuid),
            ValueType::Color => json.as_str().and_then(Color::parse_hex).map(Self::Color),
            ValueType::Time => json.as_str().and_then(|s| s.parse().ok()).map(Self::Time),
            ValueType::Object => match json {
                Json::Object(map) => Some(Self::Map(
                    map.iter()
                        .filter_map(|(k, v)| {
                            Self::from_json(ValueType::Variant, v).map(|v| (k.clone(), v))
                        })
                        .collect(),
                )),
                _ => None,
            },
            ValueType::Variant => match json {
                Json::Null => None,
                Json::Bool(b) => Some(Self::Bool(*b)),
                Json::Number(n) => n
                    .as_i64()
                    .map(Self::Int)
                    .or_else(|| n.as_f64().map(Self::Double)),
                Json::String(s) => Some(Self::String(s.clone())),
                Json::Array(items) => Some(Self::List(
                    items
                        .iter()
                        .filter_map(|i| Self::from_json(ValueType::Variant, i))
                        .collect(),
                )),
                Json::Object(_) => Self::from_json(ValueType::Object, json),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Uint(u) => write!(f, "{u}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::String(s) => f.write_str(s),
            Self::StringList(items) => write!(f, "[{}]", items.join(", ")),
            Self::Uuid(u) => write!(f, "{}", u.as_hyphenated()),
            Self::Color(c) => write!(f, "{c}"),
            Self::Time(t) => write!(f, "{t}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            },
            Self::Map(map) => write!(f, "{{{} entries}}", map.len()),
        }
    }
}

/// A comparison operator over values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueOperator {
    /// `==`
    Equals,
    /// `!=`
    NotEquals,
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterOrEqual,
}

impl ValueOperator {
    /// Apply the operator with `actual` on the left and `reference` on the
    /// right.
    ///
    /// Incomparable values satisfy only `NotEquals`.
    #[must_use]
    pub fn evaluate(&self, actual: &Value, reference: &Value) -> bool {
        let ord = actual.compare(reference);
        match self {
            Self::Equals => ord == Some(Ordering::Equal),
            Self::NotEquals => ord != Some(Ordering::Equal),
            Self::Less => ord == Some(Ordering::Less),
            Self::LessOrEqual => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
            Self::Greater => ord == Some(Ordering::Greater),
            Self::GreaterOrEqual => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
        }
    }
}

impl fmt::Display for ValueOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sym = match self {
            Self::Equals => "==",
            Self::NotEquals => "!=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
        };
        f.write_str(sym)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_tag() {
        assert!(Value::Bool(true).matches(ValueType::Bool));
        assert!(!Value::Bool(true).matches(ValueType::Int));
        assert!(Value::Int(1).matches(ValueType::Variant));
        assert!(Value::Map(BTreeMap::new()).matches(ValueType::Object));
        assert!(!Value::Int(1).matches(ValueType::Double));
    }

    #[test]
    fn test_numeric_coercion_in_compare() {
        assert_eq!(
            Value::Int(5).compare(&Value::Double(5.0)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            Value::Uint(3).compare(&Value::Int(4)),
            Some(Ordering::Less)
        );
        assert_eq!(Value::Int(1).compare(&Value::String("1".into())), None);
    }

    #[test]
    fn test_operator_evaluate() {
        let a = Value::Double(26.0);
        let b = Value::Double(25.0);
        assert!(ValueOperator::Greater.evaluate(&a, &b));
        assert!(!ValueOperator::Less.evaluate(&a, &b));
        assert!(ValueOperator::NotEquals.evaluate(&a, &b));
        assert!(ValueOperator::Equals.evaluate(&a, &a));
    }

    #[test]
    fn test_incomparable_satisfies_only_not_equals() {
        let a = Value::String("on".into());
        let b = Value::Bool(true);
        assert!(ValueOperator::NotEquals.evaluate(&a, &b));
        assert!(!ValueOperator::Equals.evaluate(&a, &b));
        assert!(!ValueOperator::Less.evaluate(&a, &b));
    }

    #[test]
    fn test_color_hex() {
        let c = Color::parse_hex("#ff8800").unwrap();
        assert_eq!(c, Color::rgb(255, 136, 0));
        assert_eq!(c.to_string(), "#ff8800");
        let with_alpha = Color::parse_hex("#ff880080").unwrap();
        assert_eq!(with_alpha.a, 128);
        assert!(Color::parse_hex("ff8800").is_none());
        assert!(Color::parse_hex("#ff88").is_none());
    }

    #[test]
    fn test_time_of_day() {
        let t: TimeOfDay = "08:30".parse().unwrap();
        assert_eq!(t.hour(), 8);
        assert_eq!(t.minute(), 30);
        assert_eq!(t.to_string(), "08:30");
        assert!("24:00".parse::<TimeOfDay>().is_err());
        assert!("8".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_from_json_typed() {
        use serde_json::json;
        assert_eq!(
            Value::from_json(ValueType::Int, &json!(5)),
            Some(Value::Int(5))
        );
        assert_eq!(Value::from_json(ValueType::Int, &json!("5")), None);
        assert_eq!(
            Value::from_json(ValueType::Double, &json!(5)),
            Some(Value::Double(5.0))
        );
        assert_eq!(
            Value::from_json(ValueType::StringList, &json!(["a", "b"])),
            Some(Value::StringList(vec!["a".into(), "b".into()]))
        );
        assert_eq!(
            Value::from_json(ValueType::Time, &json!("07:15")),
            Some(Value::Time(TimeOfDay::new(7, 15).unwrap()))
        );
    }

    #[test]
    fn test_serde_round_trip() {
        let v = Value::Double(21.5);
        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
