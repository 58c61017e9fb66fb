//! Event schemas and event instances.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{EventTypeId, ThingId};
use crate::param::{Param, ParamType};

/// The immutable descriptor of one event a thing can emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventType {
    /// Unique id of this descriptor.
    pub id: EventTypeId,
    /// Machine name, stable across releases.
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Ordering hint for UIs.
    #[serde(default)]
    pub index: i32,
    /// Ordered payload schema.
    #[serde(default)]
    pub param_types: Vec<ParamType>,
}

impl EventType {
    /// Create a descriptor with the given id and name.
    #[must_use]
    pub fn new(id: EventTypeId, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            display_name: name.clone(),
            name,
            index: 0,
            param_types: Vec::new(),
        }
    }

    /// Set the payload schema.
    #[must_use]
    pub fn with_param_types(mut self, param_types: Vec<ParamType>) -> Self {
        self.param_types = param_types;
        self
    }
}

/// One emitted event: an event type, the emitting thing, and the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// The schema of this event.
    pub event_type_id: EventTypeId,
    /// The emitting thing.
    pub thing_id: ThingId,
    /// Payload, conforming to the event type's param schema.
    #[serde(default)]
    pub params: Vec<Param>,
}

impl Event {
    /// Create an event.
    #[must_use]
    pub fn new(event_type_id: EventTypeId, thing_id: ThingId, params: Vec<Param>) -> Self {
        Self {
            event_type_id,
            thing_id,
            params,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Event({} on {}, {} params)",
            self.event_type_id,
            self.thing_id,
            self.params.len()
        )
    }
}
