//! Event descriptors: the event side of a rule.

use serde::{Deserialize, Serialize};

use hearth_things::ThingRegistry;
use hearth_types::{Event, EventTypeId, ThingId, Value, ValueOperator, param_value};

/// One comparison over an event param.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamFilter {
    /// The event param to compare.
    pub param_type_id: hearth_types::ParamTypeId,
    /// The comparison operator.
    pub operator: ValueOperator,
    /// The reference value.
    pub value: Value,
}

impl ParamFilter {
    /// An equality filter.
    #[must_use]
    pub fn equals(param_type_id: hearth_types::ParamTypeId, value: Value) -> Self {
        Self {
            param_type_id,
            operator: ValueOperator::Equals,
            value,
        }
    }
}

/// How an event descriptor selects events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventMatch {
    /// A concrete event type on a concrete thing.
    Thing {
        /// The emitting thing.
        thing_id: ThingId,
        /// The event type.
        event_type_id: EventTypeId,
    },
    /// A named event on anything implementing an interface.
    Interface {
        /// The interface name.
        interface: String,
        /// The event's schema name within the interface.
        event_name: String,
    },
}

/// Matches incoming events for a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDescriptor {
    /// Event selection.
    pub matcher: EventMatch,
    /// Filters every matching event's params must pass.
    #[serde(default)]
    pub param_filters: Vec<ParamFilter>,
}

impl EventDescriptor {
    /// A descriptor over a concrete thing and event type.
    #[must_use]
    pub fn thing(thing_id: ThingId, event_type_id: EventTypeId) -> Self {
        Self {
            matcher: EventMatch::Thing {
                thing_id,
                event_type_id,
            },
            param_filters: Vec::new(),
        }
    }

    /// A descriptor over an interface event.
    #[must_use]
    pub fn interface(interface: impl Into<String>, event_name: impl Into<String>) -> Self {
        Self {
            matcher: EventMatch::Interface {
                interface: interface.into(),
                event_name: event_name.into(),
            },
            param_filters: Vec::new(),
        }
    }

    /// Add a param filter.
    #[must_use]
    pub fn with_filter(mut self, filter: ParamFilter) -> Self {
        self.param_filters.push(filter);
        self
    }

    /// Whether this descriptor matches an incoming event.
    ///
    /// The event type must match (by id, or by interface and event name),
    /// the thing must match (by id, or by implementing the interface), and
    /// every param filter must pass.
    #[must_use]
    pub fn matches(&self, event: &Event, registry: &ThingRegistry) -> bool {
        let selected = match &self.matcher {
            EventMatch::Thing {
                thing_id,
                event_type_id,
            } => event.thing_id == *thing_id && event.event_type_id == *event_type_id,
            EventMatch::Interface {
                interface,
                event_name,
            } => registry.thing(event.thing_id).is_some_and(|thing| {
                registry
                    .catalogue()
                    .thing_class(thing.thing_class_id)
                    .is_some_and(|class| {
                        class.implements(interface)
                            && class
                                .event_type(event.event_type_id)
                                .is_some_and(|et| et.name == *event_name)
                    })
            }),
        };
        selected
            && self.param_filters.iter().all(|filter| {
                param_value(&event.params, filter.param_type_id)
                    .is_some_and(|actual| filter.operator.evaluate(actual, &filter.value))
            })
    }

    /// Whether this descriptor references the given thing directly.
    #[must_use]
    pub fn references_thing(&self, thing_id: ThingId) -> bool {
        matches!(&self.matcher, EventMatch::Thing { thing_id: t, .. } if *t == thing_id)
    }
}
