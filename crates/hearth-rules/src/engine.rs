//! The rule engine.
//!
//! Owns every rule, validates additions against the catalogue and registry,
//! and decides — on events, state changes, and clock ticks — which action
//! lists to execute. Things are referenced by id only and resolved through
//! the registry at evaluation time.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use hearth_events::{Notification, NotificationBus};
use hearth_storage::{Store, get_record, list_records, namespaces, put_record};
use hearth_things::ThingRegistry;
use hearth_types::{Action, Event, RuleId, ThingId};

use crate::action::{ActionTarget, RuleAction, RuleActionParamValue};
use crate::descriptor::EventMatch;
use crate::error::{RuleError, RuleResult};
use crate::evaluator::{StateEvaluator, StateMatch};
use crate::rule::Rule;

const LOG: &str = "rule_engine";

const LAST_TICK_KEY: &str = "last_tick";

/// What happens to rules referencing a thing being removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovePolicy {
    /// Remove every rule referencing the thing.
    Cascade,
    /// Prune the referencing fragments; rules left without actions are
    /// removed.
    UpdateRules,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EngineRecord {
    last_tick: NaiveDateTime,
}

/// Owns and evaluates all rules.
pub struct RuleEngine {
    store: Arc<dyn Store>,
    bus: NotificationBus,
    /// Kept sorted by insertion sequence.
    rules: Vec<Rule>,
    /// Rules whose state evaluator references a thing that is currently
    /// gone; they sit out evaluation until the thing returns.
    suspended: HashSet<RuleId>,
    /// Rules whose time events fired within the current tick interval.
    time_events_pending: HashSet<RuleId>,
    last_tick: Option<NaiveDateTime>,
    next_sequence: u64,
}

impl RuleEngine {
    /// Create an empty engine.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, bus: NotificationBus) -> Self {
        Self {
            store,
            bus,
            rules: Vec::new(),
            suspended: HashSet::new(),
            time_events_pending: HashSet::new(),
            last_tick: None,
            next_sequence: 0,
        }
    }

    /// Replay stored rules and the last observed tick.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn load(&mut self, registry: &ThingRegistry) -> RuleResult<()> {
        let mut records: Vec<(String, Rule)> =
            list_records(self.store.as_ref(), namespaces::RULES).await?;
        records.sort_by_key(|(_, rule)| rule.sequence);
        for (_, rule) in records {
            self.next_sequence = self.next_sequence.max(rule.sequence + 1);
            info!(target: LOG, rule = %rule.id, name = %rule.name, "loaded rule");
            self.rules.push(rule);
        }
        if let Some(record) =
            get_record::<EngineRecord>(self.store.as_ref(), namespaces::ENGINE, LAST_TICK_KEY)
                .await?
        {
            self.last_tick = Some(record.last_tick);
        }
        self.revalidate_things(registry);
        Ok(())
    }

    /// Add a rule after validating every reference it carries.
    ///
    /// # Errors
    ///
    /// Any [`RuleError`] naming the first defect; the rule is not stored.
    pub async fn add_rule(&mut self, mut rule: Rule, registry: &ThingRegistry) -> RuleResult<RuleId> {
        validate_rule(&rule, registry)?;
        rule.sequence = self.next_sequence;
        self.next_sequence += 1;
        rule.active = false;
        let rule_id = rule.id;
        put_record(
            self.store.as_ref(),
            namespaces::RULES,
            &rule_id.to_string(),
            &rule,
        )
        .await?;
        info!(target: LOG, rule = %rule_id, name = %rule.name, "added rule");
        self.rules.push(rule);
        self.bus.publish(Notification::RuleAdded { rule_id });
        Ok(rule_id)
    }

    /// Remove a rule.
    ///
    /// # Errors
    ///
    /// [`RuleError::NotFound`] for an unknown rule.
    pub async fn remove_rule(&mut self, rule_id: RuleId) -> RuleResult<()> {
        let index = self
            .rules
            .iter()
            .position(|r| r.id == rule_id)
            .ok_or(RuleError::NotFound(rule_id))?;
        self.rules.remove(index);
        self.suspended.remove(&rule_id);
        self.store
            .remove(namespaces::RULES, &rule_id.to_string())
            .await?;
        info!(target: LOG, rule = %rule_id, "removed rule");
        self.bus.publish(Notification::RuleRemoved { rule_id });
        Ok(())
    }

    /// Enable or disable a rule.
    ///
    /// # Errors
    ///
    /// [`RuleError::NotFound`] for an unknown rule.
    pub async fn enable_rule(&mut self, rule_id: RuleId, enabled: bool) -> RuleResult<()> {
        let rule = self
            .rules
            .iter_mut()
            .find(|r| r.id == rule_id)
            .ok_or(RuleError::NotFound(rule_id))?;
        rule.enabled = enabled;
        let rule = rule.clone();
        put_record(self.store.as_ref(), namespaces::RULES, &rule_id.to_string(), &rule).await?;
        self.bus.publish(Notification::RuleConfigChanged { rule_id });
        Ok(())
    }

    /// Mark a rule executable or evaluation-only.
    ///
    /// # Errors
    ///
    /// [`RuleError::NotFound`] for an unknown rule.
    pub async fn set_executable(&mut self, rule_id: RuleId, executable: bool) -> RuleResult<()> {
        let rule = self
            .rules
            .iter_mut()
            .find(|r| r.id == rule_id)
            .ok_or(RuleError::NotFound(rule_id))?;
        rule.executable = executable;
        let rule = rule.clone();
        put_record(self.store.as_ref(), namespaces::RULES, &rule_id.to_string(), &rule).await?;
        self.bus.publish(Notification::RuleConfigChanged { rule_id });
        Ok(())
    }

    /// Look up a rule.
    #[must_use]
    pub fn rule(&self, rule_id: RuleId) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == rule_id)
    }

    /// All rules in insertion order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Ids of all rules referencing the thing anywhere.
    #[must_use]
    pub fn find_rules_containing_thing(&self, thing_id: ThingId) -> Vec<RuleId> {
        self.rules
            .iter()
            .filter(|r| r.references_thing(thing_id))
            .map(|r| r.id)
            .collect()
    }

    /// The last tick the time engine observed.
    #[must_use]
    pub fn last_tick(&self) -> Option<NaiveDateTime> {
        self.last_tick
    }

    /// Evaluate an inbound event against all rules, in insertion order.
    ///
    /// A rule triggers iff any event descriptor matches, its state
    /// evaluator holds (when present), its calendar windows contain `now`
    /// (when present), and its time events fired at the current tick (when
    /// present). Returns the resolved actions of every triggered rule.
    #[must_use]
    pub fn evaluate_event(
        &self,
        event: &Event,
        registry: &ThingRegistry,
        now: NaiveDateTime,
    ) -> Vec<Action> {
        let mut actions = Vec::new();
        for rule in &self.rules {
            if !rule.enabled || !rule.executable || self.suspended.contains(&rule.id) {
                continue;
            }
            if !rule
                .event_descriptors
                .iter()
                .any(|d| d.matches(event, registry))
            {
                continue;
            }
            if !rule
                .state_evaluator
                .as_ref()
                .is_none_or(|e| e.evaluate(registry))
            {
                continue;
            }
            if !rule.time_descriptor.calendar_items.is_empty()
                && !rule.time_descriptor.evaluate(now)
            {
                continue;
            }
            if !rule.time_descriptor.time_event_items.is_empty()
                && !self.time_events_pending.contains(&rule.id)
            {
                continue;
            }
            debug!(target: LOG, rule = %rule.id, "rule triggered by event");
            append_resolved(rule.id, &rule.actions, registry, &mut actions);
        }
        actions
    }

    /// Advance the time engine by one tick.
    ///
    /// Fires time-event rules whose instant crossed `(last_tick, now]` and
    /// re-tracks every activity-tracking rule's calendar/state condition,
    /// emitting entry and exit actions on transitions. The observed tick is
    /// persisted so short downtimes do not miss events.
    ///
    /// # Errors
    ///
    /// Propagates store failures from persisting the tick.
    pub async fn evaluate_time(
        &mut self,
        now: NaiveDateTime,
        registry: &ThingRegistry,
    ) -> RuleResult<Vec<Action>> {
        let last = self.last_tick.unwrap_or(now);
        self.time_events_pending = self
            .rules
            .iter()
            .filter(|r| {
                !r.time_descriptor.time_event_items.is_empty()
                    && r.time_descriptor.evaluate_event(last, now)
            })
            .map(|r| r.id)
            .collect();

        let mut actions = Vec::new();
        for index in 0..self.rules.len() {
            let rule = &self.rules[index];
            if !rule.enabled || self.suspended.contains(&rule.id) {
                continue;
            }

            // Edge path: time events trigger rules that have no event
            // descriptors of their own.
            if rule.executable
                && rule.event_descriptors.is_empty()
                && self.time_events_pending.contains(&rule.id)
                && rule
                    .state_evaluator
                    .as_ref()
                    .is_none_or(|e| e.evaluate(registry))
            {
                debug!(target: LOG, rule = %rule.id, "rule triggered by time event");
                append_resolved(rule.id, &rule.actions, registry, &mut actions);
            }

            self.track_activity(index, registry, now, &mut actions);
        }

        self.last_tick = Some(now);
        put_record(
            self.store.as_ref(),
            namespaces::ENGINE,
            LAST_TICK_KEY,
            &EngineRecord { last_tick: now },
        )
        .await?;
        Ok(actions)
    }

    /// Re-track rule activity after a state change.
    ///
    /// State changes never match event descriptors; they only move the
    /// active flag of rules with a state evaluator.
    #[must_use]
    pub fn evaluate_state_change(
        &mut self,
        registry: &ThingRegistry,
        now: NaiveDateTime,
    ) -> Vec<Action> {
        let mut actions = Vec::new();
        for index in 0..self.rules.len() {
            let rule = &self.rules[index];
            if !rule.enabled || self.suspended.contains(&rule.id) {
                continue;
            }
            self.track_activity(index, registry, now, &mut actions);
        }
        actions
    }

    /// Apply a thing removal to the rule set.
    ///
    /// Returns the removed rule ids. Rule-removed notifications go out
    /// here, before the caller removes the thing itself.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn remove_thing(
        &mut self,
        thing_id: ThingId,
        policy: RemovePolicy,
        registry: &ThingRegistry,
    ) -> RuleResult<Vec<RuleId>> {
        let referencing = self.find_rules_containing_thing(thing_id);
        let mut removed = Vec::new();

        match policy {
            RemovePolicy::Cascade => {
                for rule_id in referencing {
                    self.remove_rule(rule_id).await?;
                    removed.push(rule_id);
                }
            },
            RemovePolicy::UpdateRules => {
                for rule_id in referencing {
                    let mut pruned: Option<Rule> = None;
                    if let Some(rule) = self.rules.iter_mut().find(|r| r.id == rule_id) {
                        rule.event_descriptors.retain(|d| !d.references_thing(thing_id));
                        if let Some(evaluator) = rule.state_evaluator.as_mut()
                            && !evaluator.prune_thing(thing_id)
                        {
                            rule.state_evaluator = None;
                        }
                        rule.actions.retain(|a| !a.references_thing(thing_id));
                        rule.exit_actions.retain(|a| !a.references_thing(thing_id));
                        pruned = Some(rule.clone());
                    }

                    match pruned {
                        Some(rule) if rule.actions.is_empty() => {
                            debug!(target: LOG, rule = %rule_id, "rule orphaned by thing removal");
                            self.remove_rule(rule_id).await?;
                            removed.push(rule_id);
                        },
                        Some(rule) => {
                            put_record(
                                self.store.as_ref(),
                                namespaces::RULES,
                                &rule_id.to_string(),
                                &rule,
                            )
                            .await?;
                            self.bus.publish(Notification::RuleConfigChanged { rule_id });
                        },
                        None => {},
                    }
                }
            },
        }
        self.revalidate_things(registry);
        Ok(removed)
    }

    /// Recompute which rules sit suspended because their state evaluator
    /// references a thing that is gone. Call after things appear or
    /// disappear.
    pub fn revalidate_things(&mut self, registry: &ThingRegistry) {
        let mut suspended = HashSet::new();
        for rule in &self.rules {
            let missing = rule
                .state_evaluator
                .as_ref()
                .is_some_and(|evaluator| {
                    evaluator
                        .referenced_things()
                        .iter()
                        .any(|id| registry.thing(*id).is_none())
                });
            if missing {
                warn!(target: LOG, rule = %rule.id, "rule suspended: referenced thing is gone");
                suspended.insert(rule.id);
            }
        }
        self.suspended = suspended;
    }

    /// Whether a rule currently sits suspended.
    #[must_use]
    pub fn is_suspended(&self, rule_id: RuleId) -> bool {
        self.suspended.contains(&rule_id)
    }

    fn track_activity(
        &mut self,
        index: usize,
        registry: &ThingRegistry,
        now: NaiveDateTime,
        actions: &mut Vec<Action>,
    ) {
        let rule = &self.rules[index];
        if !rule.tracks_activity() {
            return;
        }
        let evaluator_ok = rule
            .state_evaluator
            .as_ref()
            .is_none_or(|e| e.evaluate(registry));
        let calendar_ok = rule.time_descriptor.calendar_items.is_empty()
            || rule.time_descriptor.evaluate(now);
        let active_now = evaluator_ok && calendar_ok;
        if active_now == rule.active {
            return;
        }

        let rule_id = rule.id;
        debug!(target: LOG, rule = %rule_id, active = active_now, "rule activity changed");
        self.rules[index].active = active_now;
        let rule = &self.rules[index];
        if rule.executable {
            let list = if active_now {
                &rule.actions
            } else {
                &rule.exit_actions
            };
            append_resolved(rule_id, list, registry, actions);
        }
        self.bus.publish(Notification::RuleActiveChanged {
            rule_id,
            active: active_now,
        });
    }
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field("rules", &self.rules.len())
            .field("suspended", &self.suspended.len())
            .finish_non_exhaustive()
    }
}

/// Resolve one rule's action list, skipping (and logging) the actions that
/// fail; the remaining actions still execute.
fn append_resolved(
    rule_id: RuleId,
    list: &[RuleAction],
    registry: &ThingRegistry,
    actions: &mut Vec<Action>,
) {
    for rule_action in list {
        match rule_action.resolve(registry) {
            Ok(resolved) => actions.extend(resolved),
            Err(e) => {
                warn!(target: LOG, rule = %rule_id, error = %e, "skipping unresolvable rule action");
            },
        }
    }
}

fn validate_rule(rule: &Rule, registry: &ThingRegistry) -> RuleResult<()> {
    rule.time_descriptor.validate()?;
    if rule.actions.is_empty() {
        return Err(RuleError::NoActions);
    }
    let catalogue = registry.catalogue();

    for descriptor in &rule.event_descriptors {
        match &descriptor.matcher {
            EventMatch::Thing {
                thing_id,
                event_type_id,
            } => {
                let thing = registry
                    .thing(*thing_id)
                    .ok_or(RuleError::ThingNotFound(*thing_id))?;
                catalogue
                    .thing_class(thing.thing_class_id)
                    .and_then(|class| class.event_type(*event_type_id))
                    .ok_or(RuleError::EventTypeNotFound(*event_type_id))?;
            },
            EventMatch::Interface { interface, .. } => {
                catalogue
                    .interface(interface)
                    .ok_or_else(|| RuleError::InterfaceNotFound(interface.clone()))?;
            },
        }
    }

    if let Some(evaluator) = &rule.state_evaluator {
        validate_evaluator(evaluator, registry)?;
    }

    for action in rule.actions.iter().chain(&rule.exit_actions) {
        validate_action(action, registry)?;
    }
    Ok(())
}

fn validate_evaluator(evaluator: &StateEvaluator, registry: &ThingRegistry) -> RuleResult<()> {
    let catalogue = registry.catalogue();
    if let Some(descriptor) = &evaluator.descriptor {
        match &descriptor.matcher {
            StateMatch::Thing {
                thing_id,
                state_type_id,
            } => {
                let thing = registry
                    .thing(*thing_id)
                    .ok_or(RuleError::ThingNotFound(*thing_id))?;
                let state_type = catalogue
                    .thing_class(thing.thing_class_id)
                    .and_then(|class| class.state_type(*state_type_id))
                    .ok_or(RuleError::StateTypeNotFound(*state_type_id))?;
                let comparable = descriptor.value.matches(state_type.value_type)
                    || (descriptor.value.as_f64().is_some()
                        && state_type.default_value.as_f64().is_some());
                if !comparable {
                    return Err(RuleError::IncomparableValue(*state_type_id));
                }
            },
            StateMatch::Interface { interface, .. } => {
                catalogue
                    .interface(interface)
                    .ok_or_else(|| RuleError::InterfaceNotFound(interface.clone()))?;
            },
        }
    }
    for child in &evaluator.children {
        validate_evaluator(child, registry)?;
    }
    Ok(())
}

fn validate_action(action: &RuleAction, registry: &ThingRegistry) -> RuleResult<()> {
    let catalogue = registry.catalogue();
    let action_types = match &action.target {
        ActionTarget::Thing {
            thing_id,
            action_type_id,
        } => {
            let thing = registry
                .thing(*thing_id)
                .ok_or(RuleError::ThingNotFound(*thing_id))?;
            let action_type = catalogue
                .thing_class(thing.thing_class_id)
                .and_then(|class| class.action_type(*action_type_id))
                .ok_or(RuleError::ActionTypeNotFound(*action_type_id))?;
            vec![action_type.clone()]
        },
        ActionTarget::Interface { interface, .. } => {
            catalogue
                .interface(interface)
                .ok_or_else(|| RuleError::InterfaceNotFound(interface.clone()))?;
            Vec::new()
        },
    };

    for binding in &action.params {
        match &binding.value {
            RuleActionParamValue::Literal(value) => {
                // Literals are validated against the concrete target schema
                // when one exists; interface targets defer to resolution.
                for action_type in &action_types {
                    let param_type = hearth_types::find_param_type(
                        &action_type.param_types,
                        binding.param_type_id,
                    )
                    .ok_or(RuleError::ActionTypeNotFound(action_type.id))?;
                    param_type.validate(value)?;
                }
            },
            RuleActionParamValue::StateRef {
                thing_id,
                state_type_id,
            } => {
                let thing = registry
                    .thing(*thing_id)
                    .ok_or(RuleError::ThingNotFound(*thing_id))?;
                catalogue
                    .thing_class(thing.thing_class_id)
                    .and_then(|class| class.state_type(*state_type_id))
                    .ok_or(RuleError::StateTypeNotFound(*state_type_id))?;
            },
        }
    }
    Ok(())
}
