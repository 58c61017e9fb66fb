//! Rule actions and their resolution into executable actions.

use serde::{Deserialize, Serialize};

use hearth_things::ThingRegistry;
use hearth_types::{
    Action, ActionType, ActionTypeId, Param, ParamTypeId, StateTypeId, ThingId, TriggeredBy,
    Value,
};

use crate::error::{RuleError, RuleResult};

/// The value of one rule-action param: fixed at rule-store time, or read
/// from another thing's state at execution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleActionParamValue {
    /// A literal, validated when the rule is stored.
    Literal(Value),
    /// A state reference, resolved at execution time.
    StateRef {
        /// The thing whose state supplies the value.
        thing_id: ThingId,
        /// The state supplying the value.
        state_type_id: StateTypeId,
    },
}

/// One param of a rule action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleActionParam {
    /// The target param type.
    pub param_type_id: ParamTypeId,
    /// Where the value comes from.
    pub value: RuleActionParamValue,
}

impl RuleActionParam {
    /// A literal param.
    #[must_use]
    pub fn literal(param_type_id: ParamTypeId, value: Value) -> Self {
        Self {
            param_type_id,
            value: RuleActionParamValue::Literal(value),
        }
    }

    /// A state-reference param.
    #[must_use]
    pub fn state_ref(
        param_type_id: ParamTypeId,
        thing_id: ThingId,
        state_type_id: StateTypeId,
    ) -> Self {
        Self {
            param_type_id,
            value: RuleActionParamValue::StateRef {
                thing_id,
                state_type_id,
            },
        }
    }
}

/// How a rule action selects its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionTarget {
    /// A concrete action on a concrete thing.
    Thing {
        /// The target thing.
        thing_id: ThingId,
        /// The action type.
        action_type_id: ActionTypeId,
    },
    /// A named action on everything implementing an interface.
    Interface {
        /// The interface name.
        interface: String,
        /// The action's schema name within the interface.
        action_name: String,
    },
}

/// One action a rule executes when it fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleAction {
    /// Target selection.
    pub target: ActionTarget,
    /// Param bindings.
    #[serde(default)]
    pub params: Vec<RuleActionParam>,
}

impl RuleAction {
    /// An action on a concrete thing.
    #[must_use]
    pub fn thing(thing_id: ThingId, action_type_id: ActionTypeId) -> Self {
        Self {
            target: ActionTarget::Thing {
                thing_id,
                action_type_id,
            },
            params: Vec::new(),
        }
    }

    /// An action on an interface.
    #[must_use]
    pub fn interface(interface: impl Into<String>, action_name: impl Into<String>) -> Self {
        Self {
            target: ActionTarget::Interface {
                interface: interface.into(),
                action_name: action_name.into(),
            },
            params: Vec::new(),
        }
    }

    /// Add a param binding.
    #[must_use]
    pub fn with_param(mut self, param: RuleActionParam) -> Self {
        self.params.push(param);
        self
    }

    /// Whether this action targets the given thing directly or reads one of
    /// its states.
    #[must_use]
    pub fn references_thing(&self, thing_id: ThingId) -> bool {
        let targets = matches!(&self.target, ActionTarget::Thing { thing_id: t, .. } if *t == thing_id);
        targets
            || self.params.iter().any(|p| {
                matches!(
                    &p.value,
                    RuleActionParamValue::StateRef { thing_id: t, .. } if *t == thing_id
                )
            })
    }

    /// Resolve into concrete executable [`Action`]s.
    ///
    /// A thing target yields one action; an interface target yields one per
    /// implementing thing. State references are read now and must conform
    /// to the target param type, else [`RuleError::ParamTypeMismatch`].
    ///
    /// # Errors
    ///
    /// Unresolvable things, unknown action types, or non-conforming state
    /// references fail the resolution of this action (only).
    pub fn resolve(&self, registry: &ThingRegistry) -> RuleResult<Vec<Action>> {
        match &self.target {
            ActionTarget::Thing {
                thing_id,
                action_type_id,
            } => {
                let thing = registry
                    .thing(*thing_id)
                    .ok_or(RuleError::ThingNotFound(*thing_id))?;
                let action_type = registry
                    .catalogue()
                    .thing_class(thing.thing_class_id)
                    .and_then(|class| class.action_type(*action_type_id))
                    .ok_or(RuleError::ActionTypeNotFound(*action_type_id))?;
                Ok(vec![self.build_action(registry, *thing_id, action_type)?])
            },
            ActionTarget::Interface {
                interface,
                action_name,
            } => {
                let mut actions = Vec::new();
                for thing in registry.find_by_interface(interface) {
                    let Some(action_type) = registry
                        .catalogue()
                        .thing_class(thing.thing_class_id)
                        .and_then(|class| class.action_type_by_name(action_name))
                    else {
                        continue;
                    };
                    actions.push(self.build_action(registry, thing.id, action_type)?);
                }
                Ok(actions)
            },
        }
    }

    fn build_action(
        &self,
        registry: &ThingRegistry,
        thing_id: ThingId,
        action_type: &ActionType,
    ) -> RuleResult<Action> {
        let mut params = Vec::with_capacity(self.params.len());
        for binding in &self.params {
            let value = match &binding.value {
                RuleActionParamValue::Literal(value) => value.clone(),
                RuleActionParamValue::StateRef {
                    thing_id: source,
                    state_type_id,
                } => {
                    let value = registry
                        .thing(*source)
                        .ok_or(RuleError::ThingNotFound(*source))?
                        .state_value(*state_type_id)
                        .ok_or(RuleError::StateTypeNotFound(*state_type_id))?
                        .clone();
                    let param_type = hearth_types::find_param_type(
                        &action_type.param_types,
                        binding.param_type_id,
                    )
                    .ok_or(RuleError::ParamTypeMismatch {
                        state_type_id: *state_type_id,
                    })?;
                    if param_type.validate(&value).is_err() {
                        return Err(RuleError::ParamTypeMismatch {
                            state_type_id: *state_type_id,
                        });
                    }
                    value
                },
            };
            params.push(Param::new(binding.param_type_id, value));
        }
        Ok(Action::new(
            action_type.id,
            thing_id,
            params,
            TriggeredBy::Rule,
        ))
    }
}
