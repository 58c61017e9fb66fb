//! Typed identifiers for catalogue entries and runtime instances.
//!
//! Every entity in the controller is identified by a 128-bit UUID, but the
//! logical kinds are not interchangeable: a `ThingId` never stands in for a
//! `RuleId`. Each kind gets its own newtype so cross-assignment is a compile
//! error rather than a runtime surprise.
//!
//! On the wire all ids render as lower-case hyphenated hex without braces.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random id.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            ///
            /// `const` so generated plugin-info modules can declare id
            /// constants.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// The nil id. Used as an absent marker in stored records.
            #[must_use]
            pub const fn nil() -> Self {
                Self(Uuid::nil())
            }

            /// Whether this is the nil id.
            #[must_use]
            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }

            /// The underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.as_hyphenated())
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

typed_id!(
    /// Identifies a plugin.
    PluginId
);
typed_id!(
    /// Identifies a vendor.
    VendorId
);
typed_id!(
    /// Identifies a thing class.
    ThingClassId
);
typed_id!(
    /// Identifies a configured thing.
    ThingId
);
typed_id!(
    /// Identifies a param type within a class schema.
    ParamTypeId
);
typed_id!(
    /// Identifies a state type within a class schema.
    StateTypeId
);
typed_id!(
    /// Identifies an event type within a class schema.
    EventTypeId
);
typed_id!(
    /// Identifies an action type within a class schema.
    ActionTypeId
);
typed_id!(
    /// Identifies a rule.
    RuleId
);
typed_id!(
    /// Identifies a node in a state-evaluator tree.
    StateEvaluatorId
);
typed_id!(
    /// Identifies a calendar item in a time descriptor.
    CalendarItemId
);
typed_id!(
    /// Identifies a time-event item in a time descriptor.
    TimeEventItemId
);
typed_id!(
    /// Identifies an in-flight pairing flow.
    PairingTransactionId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = ThingId::new();
        let b = ThingId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_is_hyphenated_lowercase() {
        let id = RuleId::from_uuid(uuid::uuid!("0D4F53C2-8F7A-4B9E-9C3D-1A2B3C4D5E6F"));
        assert_eq!(id.to_string(), "0d4f53c2-8f7a-4b9e-9c3d-1a2b3c4d5e6f");
    }

    #[test]
    fn test_from_str_round_trip() {
        let id = ThingClassId::new();
        let parsed: ThingClassId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = StateTypeId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let back: StateTypeId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn test_nil() {
        assert!(ThingId::nil().is_nil());
        assert!(!ThingId::new().is_nil());
    }
}
