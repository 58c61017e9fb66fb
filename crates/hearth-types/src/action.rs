//! Action schemas and action instances.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{ActionTypeId, ThingId};
use crate::param::{Param, ParamType};

/// Who caused an action to be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggeredBy {
    /// An interactive client.
    User,
    /// The rule engine.
    Rule,
    /// The scripting runtime.
    Script,
    /// The plugin itself (auto things, follow-ups).
    Autonomous,
}

/// The immutable descriptor of one action a thing accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionType {
    /// Unique id of this descriptor.
    pub id: ActionTypeId,
    /// Machine name, stable across releases.
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Ordering hint for UIs.
    #[serde(default)]
    pub index: i32,
    /// Ordered input schema.
    #[serde(default)]
    pub param_types: Vec<ParamType>,
}

impl ActionType {
    /// Create a descriptor with the given id and name.
    #[must_use]
    pub fn new(id: ActionTypeId, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            display_name: name.clone(),
            name,
            index: 0,
            param_types: Vec::new(),
        }
    }

    /// Set the input schema.
    #[must_use]
    pub fn with_param_types(mut self, param_types: Vec<ParamType>) -> Self {
        self.param_types = param_types;
        self
    }
}

/// One invocation of an action on a thing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// The schema of this action.
    pub action_type_id: ActionTypeId,
    /// The target thing.
    pub thing_id: ThingId,
    /// Inputs, conforming to the action type's param schema.
    #[serde(default)]
    pub params: Vec<Param>,
    /// Who asked for it.
    pub triggered_by: TriggeredBy,
}

impl Action {
    /// Create an action.
    #[must_use]
    pub fn new(
        action_type_id: ActionTypeId,
        thing_id: ThingId,
        params: Vec<Param>,
        triggered_by: TriggeredBy,
    ) -> Self {
        Self {
            action_type_id,
            thing_id,
            params,
            triggered_by,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Action({} on {}, triggered by {:?})",
            self.action_type_id, self.thing_id, self.triggered_by
        )
    }
}
