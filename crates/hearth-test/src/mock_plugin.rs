//! The mock plugin: a virtual switch with scriptable behavior.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use hearth_plugins::{
    ActionInfo, DiscoverInfo, HearthPlugin, PairInfo, PluginContext, PluginResult, ReplyStatus,
    ThingDescriptor, ThingSetupInfo,
};
use hearth_types::{Action, Event, Param, PluginMetadata, StateTypeId, ThingId, Value};

/// Fixed ids of the mock plugin's schema, usable as constants from tests.
pub mod ids {
    #![allow(missing_docs)]

    use hearth_types::{
        ActionTypeId, EventTypeId, ParamTypeId, PluginId, StateTypeId, ThingClassId, VendorId,
    };
    use uuid::uuid;

    pub const MOCK_PLUGIN_ID: PluginId =
        PluginId::from_uuid(uuid!("7a1f29e0-6c3b-4f67-9a2e-5d8b0c4e1f23"));
    pub const MOCK_VENDOR_ID: VendorId =
        VendorId::from_uuid(uuid!("f3a9d2c1-0b4e-4a5f-8c6d-7e8f9a0b1c2d"));
    pub const VIRTUAL_SWITCH_CLASS_ID: ThingClassId =
        ThingClassId::from_uuid(uuid!("2b3c4d5e-6f70-4182-93a4-b5c6d7e8f901"));

    pub const ADDRESS_PARAM_ID: ParamTypeId =
        ParamTypeId::from_uuid(uuid!("c1d2e3f4-a5b6-4c7d-8e9f-0a1b2c3d4e5f"));

    pub const POWER_STATE_ID: StateTypeId =
        StateTypeId::from_uuid(uuid!("d2e3f4a5-b6c7-4d8e-9f0a-1b2c3d4e5f60"));
    pub const TEMPERATURE_STATE_ID: StateTypeId =
        StateTypeId::from_uuid(uuid!("a9b8c7d6-e5f4-4a3b-8c1d-0e9f8a7b6c5d"));
    pub const DOOR_OPEN_STATE_ID: StateTypeId =
        StateTypeId::from_uuid(uuid!("b8c7d6e5-f4a3-4b2c-9d0e-1f2a3b4c5d6e"));
    pub const MODE_STATE_ID: StateTypeId =
        StateTypeId::from_uuid(uuid!("c7d6e5f4-a3b2-4c1d-8e9f-2a3b4c5d6e7f"));

    /// Mirror actions share their state's UUID.
    pub const POWER_ACTION_ID: ActionTypeId =
        ActionTypeId::from_uuid(uuid!("d2e3f4a5-b6c7-4d8e-9f0a-1b2c3d4e5f60"));
    pub const POWER_ACTION_PARAM_ID: ParamTypeId =
        ParamTypeId::from_uuid(uuid!("d2e3f4a5-b6c7-4d8e-9f0a-1b2c3d4e5f60"));
    pub const MODE_ACTION_ID: ActionTypeId =
        ActionTypeId::from_uuid(uuid!("c7d6e5f4-a3b2-4c1d-8e9f-2a3b4c5d6e7f"));
    pub const MODE_ACTION_PARAM_ID: ParamTypeId =
        ParamTypeId::from_uuid(uuid!("c7d6e5f4-a3b2-4c1d-8e9f-2a3b4c5d6e7f"));
    pub const BEEP_ACTION_ID: ActionTypeId =
        ActionTypeId::from_uuid(uuid!("e5f4a3b2-c1d0-4e9f-8a7b-3c4d5e6f7a8b"));

    pub const PRESSED_EVENT_ID: EventTypeId =
        EventTypeId::from_uuid(uuid!("e3f4a5b6-c7d8-4e9f-8a1b-2c3d4e5f6071"));
    pub const BUTTON_NAME_PARAM_ID: ParamTypeId =
        ParamTypeId::from_uuid(uuid!("f4a5b6c7-d8e9-4f0a-9b2c-3d4e5f607182"));

    pub const VIRTUAL_LOCK_CLASS_ID: ThingClassId =
        ThingClassId::from_uuid(uuid!("3c4d5e6f-7081-4293-a4b5-c6d7e8f90112"));
    pub const LOCKED_STATE_ID: StateTypeId =
        StateTypeId::from_uuid(uuid!("4d5e6f70-8192-43a4-b5c6-d7e8f9011223"));
}

/// The mock plugin's metadata document.
///
/// # Panics
///
/// Panics when the embedded JSON is malformed — a fixture bug.
#[must_use]
pub fn mock_metadata() -> PluginMetadata {
    PluginMetadata::from_json(json!({
        "id": ids::MOCK_PLUGIN_ID,
        "name": "mock",
        "displayName": "Mock devices",
        "debugCategory": "Mock",
        "vendors": [{
            "id": ids::MOCK_VENDOR_ID,
            "name": "hearth",
            "displayName": "Hearth",
            "thingClasses": [{
                "id": ids::VIRTUAL_SWITCH_CLASS_ID,
                "name": "virtualSwitch",
                "displayName": "Virtual switch",
                "createMethods": ["user", "auto", "discovery"],
                "setupMethod": "justAdd",
                "interfaces": ["power", "button"],
                "paramTypes": [{
                    "id": ids::ADDRESS_PARAM_ID,
                    "name": "address",
                    "type": "int",
                    "defaultValue": 0,
                    "minValue": 0,
                    "maxValue": 255
                }],
                "stateTypes": [
                    {
                        "id": ids::POWER_STATE_ID,
                        "name": "power",
                        "type": "bool",
                        "defaultValue": false,
                        "writable": true,
                        "cached": true
                    },
                    {
                        "id": ids::TEMPERATURE_STATE_ID,
                        "name": "temperature",
                        "type": "double",
                        "defaultValue": 20.0,
                        "minValue": -40.0,
                        "maxValue": 120.0,
                        "unit": "degreeCelsius",
                        "suggestLogging": true,
                        "deadBand": 0.1
                    },
                    {
                        "id": ids::DOOR_OPEN_STATE_ID,
                        "name": "doorOpen",
                        "type": "bool",
                        "defaultValue": false
                    },
                    {
                        "id": ids::MODE_STATE_ID,
                        "name": "mode",
                        "type": "string",
                        "defaultValue": "off",
                        "allowedValues": ["off", "cool", "heat"],
                        "writable": true
                    }
                ],
                "eventTypes": [{
                    "id": ids::PRESSED_EVENT_ID,
                    "name": "pressed",
                    "paramTypes": [{
                        "id": ids::BUTTON_NAME_PARAM_ID,
                        "name": "buttonName",
                        "type": "string",
                        "defaultValue": ""
                    }]
                }],
                "actionTypes": [{
                    "id": ids::BEEP_ACTION_ID,
                    "name": "beep"
                }]
            }, {
                "id": ids::VIRTUAL_LOCK_CLASS_ID,
                "name": "virtualLock",
                "displayName": "Virtual lock",
                "createMethods": ["user"],
                "setupMethod": "displayPin",
                "stateTypes": [{
                    "id": ids::LOCKED_STATE_ID,
                    "name": "locked",
                    "type": "bool",
                    "defaultValue": true,
                    "writable": true
                }]
            }]
        }]
    }))
    .expect("mock metadata must parse")
}

/// How the mock answers `execute_action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionBehavior {
    /// Finish with [`ReplyStatus::Ok`].
    FinishOk,
    /// Finish with the given status.
    FinishWith(ReplyStatus),
    /// Never call `finish`; the host's watchdog takes over.
    Withhold,
}

/// A plugin serving virtual switches, with scriptable behavior.
pub struct MockPlugin {
    metadata: PluginMetadata,
    context: Mutex<Option<PluginContext>>,
    setup_status: Mutex<ReplyStatus>,
    action_behavior: Mutex<ActionBehavior>,
    discovery_results: Mutex<Vec<ThingDescriptor>>,
    executed_actions: Mutex<Vec<Action>>,
    held_actions: Mutex<Vec<ActionInfo>>,
    setup_things: Mutex<Vec<ThingId>>,
    removed_things: Mutex<Vec<ThingId>>,
}

impl MockPlugin {
    /// A mock that sets everything up fine and executes actions fine.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: mock_metadata(),
            context: Mutex::new(None),
            setup_status: Mutex::new(ReplyStatus::Ok),
            action_behavior: Mutex::new(ActionBehavior::FinishOk),
            discovery_results: Mutex::new(Vec::new()),
            executed_actions: Mutex::new(Vec::new()),
            held_actions: Mutex::new(Vec::new()),
            setup_things: Mutex::new(Vec::new()),
            removed_things: Mutex::new(Vec::new()),
        }
    }

    /// Choose the status future `setup_thing` calls finish with.
    pub fn set_setup_status(&self, status: ReplyStatus) {
        *self.setup_status.lock().expect("mock lock") = status;
    }

    /// Choose how future `execute_action` calls behave.
    pub fn set_action_behavior(&self, behavior: ActionBehavior) {
        *self.action_behavior.lock().expect("mock lock") = behavior;
    }

    /// Queue descriptors the next discovery run reports.
    pub fn set_discovery_results(&self, descriptors: Vec<ThingDescriptor>) {
        *self.discovery_results.lock().expect("mock lock") = descriptors;
    }

    /// Actions executed so far.
    #[must_use]
    pub fn executed_actions(&self) -> Vec<Action> {
        self.executed_actions.lock().expect("mock lock").clone()
    }

    /// Actions the mock withheld (no `finish` yet).
    #[must_use]
    pub fn take_held_actions(&self) -> Vec<ActionInfo> {
        std::mem::take(&mut *self.held_actions.lock().expect("mock lock"))
    }

    /// How many actions are currently withheld.
    #[must_use]
    pub fn held_action_count(&self) -> usize {
        self.held_actions.lock().expect("mock lock").len()
    }

    /// Things set up so far.
    #[must_use]
    pub fn setup_things(&self) -> Vec<ThingId> {
        self.setup_things.lock().expect("mock lock").clone()
    }

    /// Things removed so far.
    #[must_use]
    pub fn removed_things(&self) -> Vec<ThingId> {
        self.removed_things.lock().expect("mock lock").clone()
    }

    /// Emit a `pressed` event from a thing, as the transport would.
    ///
    /// # Panics
    ///
    /// Panics when the plugin was never initialized.
    pub fn press_button(&self, thing_id: ThingId, button_name: &str) {
        let context = self.context.lock().expect("mock lock");
        let context = context.as_ref().expect("mock plugin not initialized");
        context.emit_event(Event::new(
            ids::PRESSED_EVENT_ID,
            thing_id,
            vec![Param::new(
                ids::BUTTON_NAME_PARAM_ID,
                Value::String(button_name.to_string()),
            )],
        ));
    }

    /// Report a state value observed on the transport.
    ///
    /// # Panics
    ///
    /// Panics when the plugin was never initialized.
    pub fn report_state(&self, thing_id: ThingId, state_type_id: StateTypeId, value: Value) {
        let context = self.context.lock().expect("mock lock");
        let context = context.as_ref().expect("mock plugin not initialized");
        context.set_state_value(thing_id, state_type_id, value);
    }

    /// Announce auto things, as a monitoring transport would.
    ///
    /// # Panics
    ///
    /// Panics when the plugin was never initialized.
    pub fn announce_auto_things(&self, descriptors: Vec<ThingDescriptor>) {
        let context = self.context.lock().expect("mock lock");
        let context = context.as_ref().expect("mock plugin not initialized");
        context.auto_things_appeared(descriptors);
    }
}

impl Default for MockPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HearthPlugin for MockPlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    async fn init(&self, context: PluginContext) -> PluginResult<()> {
        *self.context.lock().expect("mock lock") = Some(context);
        Ok(())
    }

    async fn setup_thing(&self, info: ThingSetupInfo) {
        self.setup_things.lock().expect("mock lock").push(info.thing.id);
        let status = *self.setup_status.lock().expect("mock lock");
        let message = (!status.is_ok()).then(|| "mock setup refused".to_string());
        let _ = info.finish(status, message);
    }

    async fn discover(&self, info: DiscoverInfo) {
        for descriptor in self.discovery_results.lock().expect("mock lock").drain(..) {
            info.add_descriptor(descriptor);
        }
        let _ = info.finish(ReplyStatus::Ok, None);
    }

    async fn start_pairing(&self, info: PairInfo) {
        // The virtual device "shows" a fixed pin.
        let _ = info.finish(ReplyStatus::Ok, Some("pin: 1234".to_string()));
    }

    async fn confirm_pairing(&self, info: PairInfo) {
        let status = if info.secret.as_deref() == Some("1234") {
            ReplyStatus::Ok
        } else {
            ReplyStatus::SetupFailed
        };
        let _ = info.finish(status, None);
    }

    async fn execute_action(&self, info: ActionInfo) {
        let behavior = *self.action_behavior.lock().expect("mock lock");
        match behavior {
            ActionBehavior::FinishOk => {
                self.executed_actions
                    .lock()
                    .expect("mock lock")
                    .push(info.action.clone());
                let _ = info.finish(ReplyStatus::Ok, None);
            },
            ActionBehavior::FinishWith(status) => {
                let _ = info.finish(status, None);
            },
            ActionBehavior::Withhold => {
                self.held_actions.lock().expect("mock lock").push(info);
            },
        }
    }

    async fn thing_removed(&self, thing_id: ThingId) {
        self.removed_things.lock().expect("mock lock").push(thing_id);
    }
}
