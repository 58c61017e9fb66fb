//! Declarative plugin metadata.
//!
//! Each plugin ships one JSON document describing its vendor, thing classes,
//! and every param/state/event/action schema. The catalogue parses the
//! document at plugin load time; the `hearth-plugininfo` generator turns the
//! same document into typed id constants for plugin authors.
//!
//! Default values, limits, and allowed values are written as naked JSON and
//! interpreted under the entry's declared `type` tag.

use serde::Deserialize;
use serde_json::Value as Json;

use crate::action::ActionType;
use crate::error::{CatalogueError, CatalogueResult};
use crate::event::EventType;
use crate::ids::{
    ActionTypeId, EventTypeId, ParamTypeId, PluginId, StateTypeId, ThingClassId, VendorId,
};
use crate::param::{InputType, ParamType, Unit};
use crate::state::{IoType, StateType, StateValueFilter};
use crate::thing_class::{CreateMethod, SetupMethod, ThingClass, Vendor};
use crate::value::{Value, ValueType};

/// A parsed plugin metadata document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginMetadata {
    /// Unique id of the plugin.
    pub id: PluginId,
    /// Machine name.
    pub name: String,
    /// Human-readable name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Tracing target the plugin logs under.
    #[serde(default)]
    pub debug_category: Option<String>,
    /// Plugin-global configuration schema.
    #[serde(default)]
    pub param_types: Vec<ParamTypeMeta>,
    /// The vendors (and their classes) this plugin provides.
    #[serde(default)]
    pub vendors: Vec<VendorMeta>,
}

impl PluginMetadata {
    /// Parse a metadata document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError::Metadata`] when the document is
    /// structurally malformed.
    pub fn from_json_str(json: &str) -> CatalogueResult<Self> {
        serde_json::from_str(json).map_err(|e| CatalogueError::Metadata(e.to_string()))
    }

    /// Parse a metadata document from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError::Metadata`] when the document is
    /// structurally malformed.
    pub fn from_json(json: Json) -> CatalogueResult<Self> {
        serde_json::from_value(json).map_err(|e| CatalogueError::Metadata(e.to_string()))
    }

    /// The tracing target for this plugin's log lines.
    #[must_use]
    pub fn debug_category(&self) -> &str {
        self.debug_category.as_deref().unwrap_or(&self.name)
    }

    /// The plugin-global configuration schema, resolved.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError::Metadata`] when a declared value does not
    /// parse under its type tag.
    pub fn config_param_types(&self) -> CatalogueResult<Vec<ParamType>> {
        resolve_param_types(&self.param_types)
    }
}

/// A vendor block within a metadata document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorMeta {
    /// Unique id of the vendor.
    pub id: VendorId,
    /// Machine name.
    pub name: String,
    /// Human-readable name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// The thing classes under this vendor.
    #[serde(default)]
    pub thing_classes: Vec<ThingClassMeta>,
}

impl VendorMeta {
    /// Resolve into a catalogue [`Vendor`].
    #[must_use]
    pub fn resolve(&self) -> Vendor {
        Vendor {
            id: self.id,
            name: self.name.clone(),
            display_name: self.display_name.clone().unwrap_or_else(|| self.name.clone()),
        }
    }
}

/// A thing-class block within a metadata document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThingClassMeta {
    /// Unique id of the class.
    pub id: ThingClassId,
    /// Machine name.
    pub name: String,
    /// Human-readable name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Interfaces the class implements.
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
    pub param_types: Vec<ParamTypeMeta>,
    /// Tunables changeable after setup.
    #[serde(default)]
    pub settings_types: Vec<ParamTypeMeta>,
    /// Params a discovery run accepts.
    #[serde(default)]
    pub discovery_param_types: Vec<ParamTypeMeta>,
    /// State schemas.
    #[serde(default)]
    pub state_types: Vec<StateTypeMeta>,
    /// Event schemas.
    #[serde(default)]
    pub event_types: Vec<EventTypeMeta>,
    /// Action schemas.
    #[serde(default)]
    pub action_types: Vec<ActionTypeMeta>,
    /// Browser-item action schemas.
    #[serde(default)]
    pub browser_item_action_types: Vec<ActionTypeMeta>,
    /// Whether instances expose a browsable item tree.
    #[serde(default)]
    pub browsable: bool,
}

impl ThingClassMeta {
    /// Resolve into a catalogue [`ThingClass`].
    ///
    /// Writable states grow their implied mirror action here: an action with
    /// the state's id and a single param of the state's schema. A declared
    /// action with that id must already mirror the state.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogueError`] for unparseable values or a declared
    /// mirror action that does not match its state.
    pub fn resolve(&self, plugin_id: PluginId, vendor_id: VendorId) -> CatalogueResult<ThingClass> {
        let state_types: Vec<StateType> = self
            .state_types
            .iter()
            .map(StateTypeMeta::resolve)
            .collect::<CatalogueResult<_>>()?;
        let mut action_types: Vec<ActionType> = self
            .action_types
            .iter()
            .map(|meta| meta.resolve())
            .collect::<CatalogueResult<_>>()?;

        for st in state_types.iter().filter(|st| st.writable) {
            let implied = implied_action_type(st);
            match action_types.iter().find(|at| at.id == implied.id) {
                None => action_types.push(implied),
                Some(declared) if *declared == implied => {},
                Some(declared) => {
                    return Err(CatalogueError::StateActionMismatch {
                        action_type_id: declared.id,
                        name: st.name.clone(),
                    });
                },
            }
        }

        Ok(ThingClass {
            id: self.id,
            plugin_id,
            vendor_id,
            name: self.name.clone(),
            display_name: self.display_name.clone().unwrap_or_else(|| self.name.clone()),
            interfaces: self.interfaces.clone(),
            create_methods: self.create_methods.clone(),
            setup_method: self.setup_method,
            param_types: resolve_param_types(&self.param_types)?,
            settings_types: resolve_param_types(&self.settings_types)?,
            discovery_param_types: resolve_param_types(&self.discovery_param_types)?,
            state_types,
            event_types: self
                .event_types
                .iter()
                .map(EventTypeMeta::resolve)
                .collect::<CatalogueResult<_>>()?,
            action_types,
            browser_item_action_types: self
                .browser_item_action_types
                .iter()
                .map(ActionTypeMeta::resolve)
                .collect::<CatalogueResult<_>>()?,
            browsable: self.browsable,
        })
    }
}

/// The mirror action implied by a writable state: same id, one param of the
/// state's schema.
#[must_use]
pub fn implied_action_type(state_type: &StateType) -> ActionType {
    let mut param = ParamType::new(
        ParamTypeId::from_uuid(state_type.id.as_uuid()),
        state_type.name.clone(),
        state_type.value_type,
    );
    param.display_name = state_type.display_name.clone();
    param.min_value = state_type.min_value.clone();
    param.max_value = state_type.max_value.clone();
    param.allowed_values = state_type.allowed_values.clone();
    param.unit = state_type.unit;

    let mut action = ActionType::new(
        ActionTypeId::from_uuid(state_type.id.as_uuid()),
        state_type.name.clone(),
    );
    action.display_name = state_type.display_name.clone();
    action.index = state_type.index;
    action.param_types = vec![param];
    action
}

/// A param-type block.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamTypeMeta {
    /// Unique id of the param type.
    pub id: ParamTypeId,
    /// Machine name.
    pub name: String,
    /// Human-readable name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// The declared value type.
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// Default, as naked JSON under the type tag.
    #[serde(default)]
    pub default_value: Option<Json>,
    /// Inclusive lower bound, as naked JSON.
    #[serde(default)]
    pub min_value: Option<Json>,
    /// Inclusive upper bound, as naked JSON.
    #[serde(default)]
    pub max_value: Option<Json>,
    /// Step hint.
    #[serde(default)]
    pub step_size: Option<f64>,
    /// Allowed values, as naked JSON.
    #[serde(default)]
    pub allowed_values: Vec<Json>,
    /// UI input hint.
    #[serde(default)]
    pub input_type: InputType,
    /// Physical unit.
    #[serde(default)]
    pub unit: Unit,
    /// Whether the param may change after setup.
    #[serde(default)]
    pub read_only: bool,
}

impl ParamTypeMeta {
    /// Resolve into a [`ParamType`], interpreting naked JSON values under the
    /// declared type tag.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError::Metadata`] when a value does not parse.
    pub fn resolve(&self, index: i32) -> CatalogueResult<ParamType> {
        let mut pt = ParamType::new(self.id, self.name.clone(), self.value_type);
        pt.display_name = self.display_name.clone().unwrap_or_else(|| self.name.clone());
        pt.index = index;
        pt.default_value = self.typed("defaultValue", self.default_value.as_ref())?;
        pt.min_value = self.typed("minValue", self.min_value.as_ref())?;
        pt.max_value = self.typed("maxValue", self.max_value.as_ref())?;
        pt.step_size = self.step_size;
        pt.allowed_values = self
            .allowed_values
            .iter()
            .map(|json| self.typed_required("allowedValues", json))
            .collect::<CatalogueResult<_>>()?;
        pt.input_type = self.input_type;
        pt.unit = self.unit;
        pt.read_only = self.read_only;
        Ok(pt)
    }

    fn typed(&self, field: &str, json: Option<&Json>) -> CatalogueResult<Option<Value>> {
        json.map(|j| self.typed_required(field, j)).transpose()
    }

    fn typed_required(&self, field: &str, json: &Json) -> CatalogueResult<Value> {
        Value::from_json(self.value_type, json).ok_or_else(|| {
            CatalogueError::Metadata(format!(
                "param '{}': {field} does not parse as {}",
                self.name, self.value_type
            ))
        })
    }
}

fn resolve_param_types(metas: &[ParamTypeMeta]) -> CatalogueResult<Vec<ParamType>> {
    metas
        .iter()
        .enumerate()
        .map(|(i, meta)| meta.resolve(i32::try_from(i).unwrap_or(i32::MAX)))
        .collect()
}

/// A state-type block.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateTypeMeta {
    /// Unique id of the state type.
    pub id: StateTypeId,
    /// Machine name.
    pub name: String,
    /// Human-readable name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// The declared value type.
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// Boot value for non-cached states, as naked JSON.
    pub default_value: Json,
    /// Inclusive lower bound, as naked JSON.
    #[serde(default)]
    pub min_value: Option<Json>,
    /// Inclusive upper bound, as naked JSON.
    #[serde(default)]
    pub max_value: Option<Json>,
    /// Allowed values, as naked JSON.
    #[serde(default)]
    pub allowed_values: Vec<Json>,
    /// Physical unit.
    #[serde(default)]
    pub unit: Unit,
    /// I/O classification.
    #[serde(default)]
    pub io_type: IoType,
    /// Whether the state is writable.
    #[serde(default)]
    pub writable: bool,
    /// Whether the last value survives restarts.
    #[serde(default)]
    pub cached: bool,
    /// History-logging hint.
    #[serde(default)]
    pub suggest_logging: bool,
    /// Change-detection filter.
    #[serde(default)]
    pub filter: StateValueFilter,
    /// Numeric dead band.
    #[serde(default)]
    pub dead_band: Option<f64>,
}

impl StateTypeMeta {
    /// Resolve into a [`StateType`].
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError::Metadata`] when a value does not parse.
    pub fn resolve(&self) -> CatalogueResult<StateType> {
        let typed = |field: &str, json: &Json| {
            Value::from_json(self.value_type, json).ok_or_else(|| {
                CatalogueError::Metadata(format!(
                    "state '{}': {field} does not parse as {}",
                    self.name, self.value_type
                ))
            })
        };
        let mut st = StateType::new(
            self.id,
            self.name.clone(),
            self.value_type,
            typed("defaultValue", &self.default_value)?,
        );
        st.display_name = self.display_name.clone().unwrap_or_else(|| self.name.clone());
        st.min_value = self.min_value.as_ref().map(|j| typed("minValue", j)).transpose()?;
        st.max_value = self.max_value.as_ref().map(|j| typed("maxValue", j)).transpose()?;
        st.allowed_values = self
            .allowed_values
            .iter()
            .map(|j| typed("allowedValues", j))
            .collect::<CatalogueResult<_>>()?;
        st.unit = self.unit;
        st.io_type = self.io_type;
        st.writable = self.writable;
        st.cached = self.cached;
        st.suggest_logging = self.suggest_logging;
        st.filter = self.filter;
        st.dead_band = self.dead_band;
        Ok(st)
    }
}

/// An event-type block.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTypeMeta {
    /// Unique id of the event type.
    pub id: EventTypeId,
    /// Machine name.
    pub name: String,
    /// Human-readable name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Payload schema.
    #[serde(default)]
    pub param_types: Vec<ParamTypeMeta>,
}

impl EventTypeMeta {
    /// Resolve into an [`EventType`].
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError::Metadata`] when a value does not parse.
    pub fn resolve(&self) -> CatalogueResult<EventType> {
        let mut et = EventType::new(self.id, self.name.clone());
        et.display_name = self.display_name.clone().unwrap_or_else(|| self.name.clone());
        et.param_types = resolve_param_types(&self.param_types)?;
        Ok(et)
    }
}

/// An action-type block.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionTypeMeta {
    /// Unique id of the action type.
    pub id: ActionTypeId,
    /// Machine name.
    pub name: String,
    /// Human-readable name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Input schema.
    #[serde(default)]
    pub param_types: Vec<ParamTypeMeta>,
}

impl ActionTypeMeta {
    /// Resolve into an [`ActionType`].
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError::Metadata`] when a value does not parse.
    pub fn resolve(&self) -> CatalogueResult<ActionType> {
        let mut at = ActionType::new(self.id, self.name.clone());
        at.display_name = self.display_name.clone().unwrap_or_else(|| self.name.clone());
        at.param_types = resolve_param_types(&self.param_types)?;
        Ok(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_metadata() -> Json {
        json!({
            "id": "7a1f29e0-6c3b-4f67-9a2e-5d8b0c4e1f23",
            "name": "mock",
            "displayName": "Mock devices",
            "debugCategory": "Mock",
            "vendors": [{
                "id": "f3a9d2c1-0b4e-4a5f-8c6d-7e8f9a0b1c2d",
                "name": "hearth",
                "displayName": "Hearth",
                "thingClasses": [{
                    "id": "2b3c4d5e-6f70-4182-93a4-b5c6d7e8f901",
                    "name": "virtualSwitch",
                    "displayName": "Virtual switch",
                    "createMethods": ["user"],
                    "setupMethod": "justAdd",
                    "interfaces": ["power"],
                    "paramTypes": [{
                        "id": "c1d2e3f4-a5b6-4c7d-8e9f-0a1b2c3d4e5f",
                        "name": "address",
                        "type": "int",
                        "defaultValue": 0,
                        "minValue": 0,
                        "maxValue": 255
                    }],
                    "stateTypes": [{
                        "id": "d2e3f4a5-b6c7-4d8e-9f0a-1b2c3d4e5f60",
                        "name": "power",
                        "type": "bool",
                        "defaultValue": false,
                        "writable": true
                    }],
                    "eventTypes": [{
                        "id": "e3f4a5b6-c7d8-4e9f-0a1b-2c3d4e5f6071",
                        "name": "pressed",
                        "paramTypes": [{
                            "id": "f4a5b6c7-d8e9-4f0a-1b2c-3d4e5f607182",
                            "name": "buttonName",
                            "type": "string",
                            "defaultValue": ""
                        }]
                    }]
                }]
            }]
        })
    }

    #[test]
    fn test_parse_and_resolve() {
        let meta = PluginMetadata::from_json(sample_metadata()).unwrap();
        assert_eq!(meta.name, "mock");
        assert_eq!(meta.debug_category(), "Mock");

        let vendor = &meta.vendors[0];
        let class = vendor.thing_classes[0]
            .resolve(meta.id, vendor.id)
            .unwrap();
        assert_eq!(class.name, "virtualSwitch");
        assert_eq!(class.param_types.len(), 1);
        assert_eq!(class.param_types[0].default_value, Some(Value::Int(0)));
        assert_eq!(class.event_types.len(), 1);
    }

    #[test]
    fn test_writable_state_grows_mirror_action() {
        let meta = PluginMetadata::from_json(sample_metadata()).unwrap();
        let vendor = &meta.vendors[0];
        let class = vendor.thing_classes[0]
            .resolve(meta.id, vendor.id)
            .unwrap();

        let st = class.state_type_by_name("power").unwrap();
        let at = class.action_type_by_name("power").unwrap();
        assert_eq!(at.id.as_uuid(), st.id.as_uuid());
        assert_eq!(at.param_types.len(), 1);
        assert_eq!(at.param_types[0].id.as_uuid(), st.id.as_uuid());
        assert_eq!(at.param_types[0].value_type, ValueType::Bool);
    }

    #[test]
    fn test_default_value_must_parse_under_type_tag() {
        let mut doc = sample_metadata();
        doc["vendors"][0]["thingClasses"][0]["paramTypes"][0]["defaultValue"] = json!("zero");
        let meta = PluginMetadata::from_json(doc).unwrap();
        let vendor = &meta.vendors[0];
        let err = vendor.thing_classes[0]
            .resolve(meta.id, vendor.id)
            .unwrap_err();
        assert!(matches!(err, CatalogueError::Metadata(_)));
    }

    #[test]
    fn test_mismatched_declared_mirror_action_rejected() {
        let mut doc = sample_metadata();
        // Declare an action with the state's id but a different schema.
        doc["vendors"][0]["thingClasses"][0]["actionTypes"] = json!([{
            "id": "d2e3f4a5-b6c7-4d8e-9f0a-1b2c3d4e5f60",
            "name": "power",
            "paramTypes": []
        }]);
        let meta = PluginMetadata::from_json(doc).unwrap();
        let vendor = &meta.vendors[0];
        let err = vendor.thing_classes[0]
            .resolve(meta.id, vendor.id)
            .unwrap_err();
        assert!(matches!(err, CatalogueError::StateActionMismatch { .. }));
    }
}
