//! State evaluators: nested boolean trees over thing states.

use serde::{Deserialize, Serialize};
use tracing::warn;

use hearth_things::ThingRegistry;
use hearth_types::{StateEvaluatorId, StateTypeId, ThingId, Value, ValueOperator};

const LOG: &str = "rule_engine";

/// Boolean combinator of an evaluator node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StateOperator {
    /// Every part must hold.
    #[default]
    And,
    /// Any part suffices.
    Or,
}

/// How a state descriptor selects states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StateMatch {
    /// A concrete state on a concrete thing.
    Thing {
        /// The owning thing.
        thing_id: ThingId,
        /// The state type.
        state_type_id: StateTypeId,
    },
    /// A named state on everything implementing an interface.
    Interface {
        /// The interface name.
        interface: String,
        /// The state's schema name within the interface.
        state_name: String,
    },
}

/// A leaf comparison over one state (or one interface's states).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDescriptor {
    /// State selection.
    pub matcher: StateMatch,
    /// The comparison operator.
    pub operator: ValueOperator,
    /// The reference value.
    pub value: Value,
}

impl StateDescriptor {
    /// A descriptor over a concrete thing's state.
    #[must_use]
    pub fn thing(
        thing_id: ThingId,
        state_type_id: StateTypeId,
        operator: ValueOperator,
        value: Value,
    ) -> Self {
        Self {
            matcher: StateMatch::Thing {
                thing_id,
                state_type_id,
            },
            operator,
            value,
        }
    }

    /// A descriptor over an interface state.
    #[must_use]
    pub fn interface(
        interface: impl Into<String>,
        state_name: impl Into<String>,
        operator: ValueOperator,
        value: Value,
    ) -> Self {
        Self {
            matcher: StateMatch::Interface {
                interface: interface.into(),
                state_name: state_name.into(),
            },
            operator,
            value,
        }
    }

    /// Evaluate the leaf.
    ///
    /// A concrete leaf compares one state. An interface leaf quantifies over
    /// every implementing thing; `quantifier` — the enclosing node's
    /// operator — decides whether all of them or any of them must satisfy
    /// the comparison. An unresolvable thing evaluates false.
    #[must_use]
    pub fn evaluate(&self, registry: &ThingRegistry, quantifier: StateOperator) -> bool {
        match &self.matcher {
            StateMatch::Thing {
                thing_id,
                state_type_id,
            } => {
                let Some(thing) = registry.thing(*thing_id) else {
                    warn!(target: LOG, thing = %thing_id, "state descriptor references missing thing");
                    return false;
                };
                let Some(actual) = thing.state_value(*state_type_id) else {
                    warn!(target: LOG, thing = %thing_id, state = %state_type_id, "thing lacks the referenced state");
                    return false;
                };
                self.operator.evaluate(actual, &self.value)
            },
            StateMatch::Interface {
                interface,
                state_name,
            } => {
                let things = registry.find_by_interface(interface);
                let satisfied = |thing: &&hearth_things::Thing| {
                    registry
                        .catalogue()
                        .thing_class(thing.thing_class_id)
                        .and_then(|class| class.state_type_by_name(state_name))
                        .and_then(|st| thing.state_value(st.id))
                        .is_some_and(|actual| self.operator.evaluate(actual, &self.value))
                };
                match quantifier {
                    StateOperator::And => !things.is_empty() && things.iter().all(satisfied),
                    StateOperator::Or => things.iter().any(satisfied),
                }
            },
        }
    }

    /// The concrete thing this leaf references, if any.
    #[must_use]
    pub fn thing_id(&self) -> Option<ThingId> {
        match &self.matcher {
            StateMatch::Thing { thing_id, .. } => Some(*thing_id),
            StateMatch::Interface { .. } => None,
        }
    }
}

/// A node of the evaluator tree: an optional leaf plus children, combined
/// under one boolean operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateEvaluator {
    /// Unique id of this node.
    pub id: StateEvaluatorId,
    /// How this node combines its parts. Also the quantifier for an
    /// interface leaf sitting on this node.
    #[serde(default)]
    pub operator: StateOperator,
    /// The node's own comparison.
    #[serde(default)]
    pub descriptor: Option<StateDescriptor>,
    /// Nested evaluators.
    #[serde(default)]
    pub children: Vec<StateEvaluator>,
}

impl StateEvaluator {
    /// A leaf node holding one descriptor.
    #[must_use]
    pub fn leaf(descriptor: StateDescriptor) -> Self {
        Self {
            id: StateEvaluatorId::new(),
            operator: StateOperator::And,
            descriptor: Some(descriptor),
            children: Vec::new(),
        }
    }

    /// An inner node combining children under an operator.
    #[must_use]
    pub fn node(operator: StateOperator, children: Vec<StateEvaluator>) -> Self {
        Self {
            id: StateEvaluatorId::new(),
            operator,
            descriptor: None,
            children,
        }
    }

    /// Evaluate the tree. Empty nodes are neutral (true under And, and a
    /// childless Or node without a descriptor is true as well).
    #[must_use]
    pub fn evaluate(&self, registry: &ThingRegistry) -> bool {
        let mut parts = self
            .descriptor
            .iter()
            .map(|d| d.evaluate(registry, self.operator))
            .chain(self.children.iter().map(|c| c.evaluate(registry)));
        match self.operator {
            StateOperator::And => parts.all(|p| p),
            StateOperator::Or => {
                if self.descriptor.is_none() && self.children.is_empty() {
                    true
                } else {
                    parts.any(|p| p)
                }
            },
        }
    }

    /// Every concrete thing referenced anywhere in the tree.
    #[must_use]
    pub fn referenced_things(&self) -> Vec<ThingId> {
        let mut things = Vec::new();
        self.collect_things(&mut things);
        things
    }

    fn collect_things(&self, things: &mut Vec<ThingId>) {
        if let Some(id) = self.descriptor.as_ref().and_then(StateDescriptor::thing_id)
            && !things.contains(&id)
        {
            things.push(id);
        }
        for child in &self.children {
            child.collect_things(things);
        }
    }

    /// Whether the tree references the given thing.
    #[must_use]
    pub fn references_thing(&self, thing_id: ThingId) -> bool {
        self.referenced_things().contains(&thing_id)
    }

    /// Drop every node referencing the given thing. Returns `false` when
    /// the whole tree pruned away.
    pub fn prune_thing(&mut self, thing_id: ThingId) -> bool {
        if self
            .descriptor
            .as_ref()
            .and_then(StateDescriptor::thing_id)
            == Some(thing_id)
        {
            self.descriptor = None;
        }
        self.children.retain_mut(|child| child.prune_thing(thing_id));
        self.descriptor.is_some() || !self.children.is_empty()
    }
}
