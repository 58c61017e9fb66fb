//! A configured thing.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use hearth_plugins::ThingInfo;
use hearth_types::{
    Param, PluginId, SetupStatus, State, StateTypeId, ThingClassId, ThingId, Value,
};

/// One configured instance of a thing class.
///
/// The registry is the sole owner; every other subsystem refers to things by
/// id and receives snapshots ([`ThingInfo`]) per call.
#[derive(Debug, Clone)]
pub struct Thing {
    /// Unique id.
    pub id: ThingId,
    /// The class this thing instantiates.
    pub thing_class_id: ThingClassId,
    /// The plugin serving it.
    pub plugin_id: PluginId,
    /// Display name.
    pub name: String,
    /// Configured params, normalized against the class schema.
    pub params: Vec<Param>,
    /// Configured settings.
    pub settings: Vec<Param>,
    /// Parent thing for gateway hierarchies.
    pub parent_id: Option<ThingId>,
    /// Where the thing stands in its setup lifecycle.
    pub setup_status: SetupStatus,
    states: HashMap<StateTypeId, State>,
    // Value each state held before its current one; backs the adjacent
    // change filter. Not persisted.
    previous_values: HashMap<StateTypeId, Value>,
}

impl Thing {
    /// Create a thing with no states initialized yet.
    #[must_use]
    pub fn new(
        id: ThingId,
        thing_class_id: ThingClassId,
        plugin_id: PluginId,
        name: impl Into<String>,
        params: Vec<Param>,
    ) -> Self {
        Self {
            id,
            thing_class_id,
            plugin_id,
            name: name.into(),
            params,
            settings: Vec::new(),
            parent_id: None,
            setup_status: SetupStatus::None,
            states: HashMap::new(),
            previous_values: HashMap::new(),
        }
    }

    /// Whether the class declares this state on the instance.
    #[must_use]
    pub fn has_state(&self, state_type_id: StateTypeId) -> bool {
        self.states.contains_key(&state_type_id)
    }

    /// The live state for a state type.
    #[must_use]
    pub fn state(&self, state_type_id: StateTypeId) -> Option<&State> {
        self.states.get(&state_type_id)
    }

    /// The current value of a state.
    #[must_use]
    pub fn state_value(&self, state_type_id: StateTypeId) -> Option<&Value> {
        self.states.get(&state_type_id).map(|s| &s.value)
    }

    /// All live states.
    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.values()
    }

    /// The value a state held before its current one.
    #[must_use]
    pub fn previous_state_value(&self, state_type_id: StateTypeId) -> Option<&Value> {
        self.previous_values.get(&state_type_id)
    }

    /// (Re-)initialize a state slot, e.g. at boot or after reconfiguration.
    pub fn init_state(&mut self, state_type_id: StateTypeId, value: Value) {
        self.previous_values.remove(&state_type_id);
        self.states
            .insert(state_type_id, State::new(state_type_id, value));
    }

    /// Overwrite a state value, remembering the displaced value.
    ///
    /// Returns the displaced value. The caller decides beforehand whether
    /// the write counts as a change.
    pub fn write_state(
        &mut self,
        state_type_id: StateTypeId,
        value: Value,
        timestamp: DateTime<Utc>,
    ) -> Option<Value> {
        let state = self.states.get_mut(&state_type_id)?;
        let displaced = std::mem::replace(&mut state.value, value);
        state.timestamp = timestamp;
        self.previous_values
            .insert(state_type_id, displaced.clone());
        Some(displaced)
    }

    /// The snapshot lent to plugins for one call.
    #[must_use]
    pub fn info(&self) -> ThingInfo {
        ThingInfo {
            id: self.id,
            thing_class_id: self.thing_class_id,
            plugin_id: self.plugin_id,
            name: self.name.clone(),
            params: self.params.clone(),
            settings: self.settings.clone(),
            parent_id: self.parent_id,
        }
    }
}
