//! Named capability interfaces.
//!
//! An interface is a contract over schema *names*: a thing class that
//! declares `power` promises a writable bool state named `power`. Rules can
//! then target "anything implementing power" instead of a concrete thing.

use serde::{Deserialize, Serialize};

use crate::thing_class::ThingClass;

/// A named capability set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interface {
    /// The interface name, e.g. `power`.
    pub name: String,
    /// State names an implementing class must declare.
    #[serde(default)]
    pub states: Vec<String>,
    /// Event names an implementing class must declare.
    #[serde(default)]
    pub events: Vec<String>,
    /// Action names an implementing class must declare.
    #[serde(default)]
    pub actions: Vec<String>,
}

impl Interface {
    /// Create an interface with the given name and no members.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            states: Vec::new(),
            events: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// Whether a class declares every member this interface requires.
    #[must_use]
    pub fn is_satisfied_by(&self, class: &ThingClass) -> bool {
        self.states
            .iter()
            .all(|s| class.state_type_by_name(s).is_some())
            && self
                .events
                .iter()
                .all(|e| class.event_type_by_name(e).is_some())
            && self
                .actions
                .iter()
                .all(|a| class.action_type_by_name(a).is_some())
    }
}

/// The interfaces every catalogue knows out of the box.
#[must_use]
pub fn builtin_interfaces() -> Vec<Interface> {
    let iface = |name: &str, states: &[&str], events: &[&str], actions: &[&str]| Interface {
        name: name.to_string(),
        states: states.iter().map(ToString::to_string).collect(),
        events: events.iter().map(ToString::to_string).collect(),
        actions: actions.iter().map(ToString::to_string).collect(),
    };
    vec![
        iface("power", &["power"], &[], &["power"]),
        iface("button", &[], &["pressed"], &[]),
        iface("temperaturesensor", &["temperature"], &[], &[]),
        iface("humiditysensor", &["humidity"], &[], &[]),
        iface("lightsensor", &["lightIntensity"], &[], &[]),
        iface("presencesensor", &["isPresent"], &[], &[]),
        iface("battery", &["batteryLevel", "batteryCritical"], &[], &[]),
        iface("notifications", &[], &[], &["notify"]),
        iface("dimmablelight", &["power", "brightness"], &[], &["power", "brightness"]),
        iface("mediacontroller", &["playbackStatus"], &[], &["play", "pause", "stop"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{PluginId, StateTypeId, ThingClassId, VendorId};
    use crate::state::StateType;
    use crate::thing_class::{SetupMethod, ThingClass};
    use crate::value::{Value, ValueType};

    fn class_with_power_state() -> ThingClass {
        ThingClass {
            id: ThingClassId::new(),
            plugin_id: PluginId::new(),
            vendor_id: VendorId::new(),
            name: "switch".into(),
            display_name: "Switch".into(),
            interfaces: vec!["power".into()],
            create_methods: Vec::new(),
            setup_method: SetupMethod::JustAdd,
            param_types: Vec::new(),
            settings_types: Vec::new(),
            discovery_param_types: Vec::new(),
            state_types: vec![
                StateType::new(
                    StateTypeId::new(),
                    "power",
                    ValueType::Bool,
                    Value::Bool(false),
                )
                .writable(),
            ],
            event_types: Vec::new(),
            action_types: Vec::new(),
            browser_item_action_types: Vec::new(),
            browsable: false,
        }
    }

    #[test]
    fn test_power_interface_requires_action_too() {
        let power = builtin_interfaces()
            .into_iter()
            .find(|i| i.name == "power")
            .unwrap();
        // The class declares the state but not the mirrored action; the
        // catalogue synthesizes that action before checking interfaces.
        let class = class_with_power_state();
        assert!(!power.is_satisfied_by(&class));
    }

    #[test]
    fn test_button_interface() {
        let button = builtin_interfaces()
            .into_iter()
            .find(|i| i.name == "button")
            .unwrap();
        assert!(!button.is_satisfied_by(&class_with_power_state()));
    }
}
