//! The rule definition.

use serde::{Deserialize, Serialize};

use hearth_time::TimeDescriptor;
use hearth_types::{RuleId, ThingId};

use crate::action::RuleAction;
use crate::descriptor::EventDescriptor;
use crate::evaluator::StateEvaluator;

fn default_true() -> bool {
    true
}

/// A declarative mapping from conditions to actions.
///
/// A rule *triggers* when one of its events matches (gated by the state
/// evaluator and time descriptor), and separately tracks an *active* flag
/// when it has a state evaluator or calendar items: going active runs
/// `actions`, going inactive runs `exit_actions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Unique id.
    pub id: RuleId,
    /// Display name.
    pub name: String,
    /// A disabled rule never triggers nor tracks activity.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// A non-executable rule evaluates but runs no actions.
    #[serde(default = "default_true")]
    pub executable: bool,
    /// Event conditions; any match triggers.
    #[serde(default)]
    pub event_descriptors: Vec<EventDescriptor>,
    /// Time condition: calendar windows or time events.
    #[serde(default)]
    pub time_descriptor: TimeDescriptor,
    /// State condition.
    #[serde(default)]
    pub state_evaluator: Option<StateEvaluator>,
    /// Run when the rule triggers or goes active.
    #[serde(default)]
    pub actions: Vec<RuleAction>,
    /// Run when the rule goes inactive.
    #[serde(default)]
    pub exit_actions: Vec<RuleAction>,
    /// Insertion sequence; evaluation processes rules in this order.
    #[serde(default)]
    pub sequence: u64,
    /// Computed activity; not persisted.
    #[serde(skip)]
    pub active: bool,
}

impl Rule {
    /// A rule with the given name and nothing else.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: RuleId::new(),
            name: name.into(),
            enabled: true,
            executable: true,
            event_descriptors: Vec::new(),
            time_descriptor: TimeDescriptor::default(),
            state_evaluator: None,
            actions: Vec::new(),
            exit_actions: Vec::new(),
            sequence: 0,
            active: false,
        }
    }

    /// Add an event descriptor.
    #[must_use]
    pub fn on_event(mut self, descriptor: EventDescriptor) -> Self {
        self.event_descriptors.push(descriptor);
        self
    }

    /// Set the time descriptor.
    #[must_use]
    pub fn with_time(mut self, time_descriptor: TimeDescriptor) -> Self {
        self.time_descriptor = time_descriptor;
        self
    }

    /// Set the state evaluator.
    #[must_use]
    pub fn with_evaluator(mut self, evaluator: StateEvaluator) -> Self {
        self.state_evaluator = Some(evaluator);
        self
    }

    /// Add an action.
    #[must_use]
    pub fn with_action(mut self, action: RuleAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Add an exit action.
    #[must_use]
    pub fn with_exit_action(mut self, action: RuleAction) -> Self {
        self.exit_actions.push(action);
        self
    }

    /// Whether the rule maintains an active flag at all.
    ///
    /// Rules without a state evaluator and without calendar items only
    /// trigger on events.
    #[must_use]
    pub fn tracks_activity(&self) -> bool {
        self.state_evaluator.is_some() || !self.time_descriptor.calendar_items.is_empty()
    }

    /// Whether any part of the rule references the thing.
    #[must_use]
    pub fn references_thing(&self, thing_id: ThingId) -> bool {
        self.event_descriptors
            .iter()
            .any(|d| d.references_thing(thing_id))
            || self
                .state_evaluator
                .as_ref()
                .is_some_and(|e| e.references_thing(thing_id))
            || self
                .actions
                .iter()
                .chain(&self.exit_actions)
                .any(|a| a.references_thing(thing_id))
    }
}
