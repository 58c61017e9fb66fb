//! Read-only snapshots handed out by the dispatcher.

use serde::{Deserialize, Serialize};

use hearth_things::Thing;
use hearth_types::{
    Param, PluginId, RuleId, SetupStatus, State, ThingClassId, ThingId,
};

/// A point-in-time copy of one configured thing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThingSnapshot {
    /// The thing's id.
    pub id: ThingId,
    /// Its class.
    pub thing_class_id: ThingClassId,
    /// The serving plugin.
    pub plugin_id: PluginId,
    /// Display name.
    pub name: String,
    /// Configured params.
    pub params: Vec<Param>,
    /// Configured settings.
    pub settings: Vec<Param>,
    /// Parent thing, if any.
    pub parent_id: Option<ThingId>,
    /// Setup lifecycle position.
    pub setup_status: SetupStatus,
    /// Live states.
    pub states: Vec<State>,
}

impl From<&Thing> for ThingSnapshot {
    fn from(thing: &Thing) -> Self {
        let mut states: Vec<State> = thing.states().cloned().collect();
        states.sort_by_key(|s| s.state_type_id);
        Self {
            id: thing.id,
            thing_class_id: thing.thing_class_id,
            plugin_id: thing.plugin_id,
            name: thing.name.clone(),
            params: thing.params.clone(),
            settings: thing.settings.clone(),
            parent_id: thing.parent_id,
            setup_status: thing.setup_status,
            states,
        }
    }
}

/// A point-in-time copy of one rule's externally visible shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSnapshot {
    /// The rule's id.
    pub id: RuleId,
    /// Display name.
    pub name: String,
    /// Whether the rule participates in evaluation.
    pub enabled: bool,
    /// Whether the rule runs its actions.
    pub executable: bool,
    /// The computed activity flag.
    pub active: bool,
}

impl From<&hearth_rules::Rule> for RuleSnapshot {
    fn from(rule: &hearth_rules::Rule) -> Self {
        Self {
            id: rule.id,
            name: rule.name.clone(),
            enabled: rule.enabled,
            executable: rule.executable,
            active: rule.active,
        }
    }
}
