//! Thing classes and vendors.
//!
//! A [`ThingClass`] is the declarative schema of a kind of thing: its
//! configuration params, its states, events, and actions, and how instances
//! get created and set up.

use serde::{Deserialize, Serialize};

use crate::action::ActionType;
use crate::event::EventType;
use crate::ids::{
    ActionTypeId, EventTypeId, ParamTypeId, PluginId, StateTypeId, ThingClassId, VendorId,
};
use crate::param::ParamType;
use crate::state::StateType;

/// How instances of a class come into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CreateMethod {
    /// The user enters the params by hand.
    User,
    /// The plugin materializes instances on its own.
    Auto,
    /// Instances are found by a discovery run.
    Discovery,
}

/// The interaction required to complete setup of a new instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SetupMethod {
    /// No interaction; setup starts immediately.
    #[default]
    JustAdd,
    /// The device shows a pin the user reads back.
    DisplayPin,
    /// The user enters a pin known to the device.
    EnterPin,
    /// The user presses a pairing button on the device.
    PushButton,
    /// An OAuth dance against a vendor cloud.
    OAuth,
}

/// Where a configured thing stands in its setup lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SetupStatus {
    /// Setup has not been dispatched yet.
    #[default]
    None,
    /// The plugin is setting the thing up.
    InProgress,
    /// Setup finished successfully.
    Complete,
    /// Setup finished with an error; the thing is retained for retry.
    Failed,
}

/// A device vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    /// Unique id of this vendor.
    pub id: VendorId,
    /// Machine name.
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
}

/// The declarative schema of a kind of thing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThingClass {
    /// Unique id of this class.
    pub id: ThingClassId,
    /// The plugin implementing this class.
    pub plugin_id: PluginId,
    /// The vendor this class belongs to.
    pub vendor_id: VendorId,
    /// Machine name.
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Named capability sets this class implements, for generic rule
    /// matching.
    #[serde(default)]
    pub interfaces: Vec<String>,
    /// How instances are created.
    #[serde(default)]
    pub create_methods: Vec<CreateMethod>,
    /// Interaction required during setup.
    #[serde(default)]
    pub setup_method: SetupMethod,
    /// Thing configuration schema.
    #[serde(default)]
    pub param_types: Vec<ParamType>,
    /// Tunables changeable after setup without re-running it.
    #[serde(default)]
    pub settings_types: Vec<ParamType>,
    /// Params a discovery run accepts.
    #[serde(default)]
    pub discovery_param_types: Vec<ParamType>,
    /// State schemas.
    #[serde(default)]
    pub state_types: Vec<StateType>,
    /// Event schemas.
    #[serde(default)]
    pub event_types: Vec<EventType>,
    /// Action schemas.
    #[serde(default)]
    pub action_types: Vec<ActionType>,
    /// Actions executable on browser items, when the class is browsable.
    #[serde(default)]
    pub browser_item_action_types: Vec<ActionType>,
    /// Whether instances expose a browsable item tree.
    #[serde(default)]
    pub browsable: bool,
}

impl ThingClass {
    /// Look up a state type by id.
    #[must_use]
    pub fn state_type(&self, id: StateTypeId) -> Option<&StateType> {
        self.state_types.iter().find(|st| st.id == id)
    }

    /// Look up a state type by schema name.
    #[must_use]
    pub fn state_type_by_name(&self, name: &str) -> Option<&StateType> {
        self.state_types.iter().find(|st| st.name == name)
    }

    /// Look up an event type by id.
    #[must_use]
    pub fn event_type(&self, id: EventTypeId) -> Option<&EventType> {
        self.event_types.iter().find(|et| et.id == id)
    }

    /// Look up an event type by schema name.
    #[must_use]
    pub fn event_type_by_name(&self, name: &str) -> Option<&EventType> {
        self.event_types.iter().find(|et| et.name == name)
    }

    /// Look up an action type by id, including browser-item actions.
    #[must_use]
    pub fn action_type(&self, id: ActionTypeId) -> Option<&ActionType> {
        self.action_types
            .iter()
            .chain(&self.browser_item_action_types)
            .find(|at| at.id == id)
    }

    /// Look up an action type by schema name.
    #[must_use]
    pub fn action_type_by_name(&self, name: &str) -> Option<&ActionType> {
        self.action_types.iter().find(|at| at.name == name)
    }

    /// Look up a configuration param type by id.
    #[must_use]
    pub fn param_type(&self, id: ParamTypeId) -> Option<&ParamType> {
        self.param_types.iter().find(|pt| pt.id == id)
    }

    /// Whether this class implements the named interface.
    #[must_use]
    pub fn implements(&self, interface: &str) -> bool {
        self.interfaces.iter().any(|i| i == interface)
    }

    /// Whether instances can be created by the given method.
    #[must_use]
    pub fn supports_create_method(&self, method: CreateMethod) -> bool {
        self.create_methods.contains(&method)
    }
}
