//! Rule engine behavior against the mock plugin's catalogue.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};

use hearth_events::NotificationBus;
use hearth_plugins::{PluginHost, UpstreamMessage};
use hearth_rules::{
    EventDescriptor, ParamFilter, RemovePolicy, Rule, RuleAction, RuleActionParam, RuleEngine,
    RuleError, StateDescriptor, StateEvaluator, StateOperator,
};
use hearth_storage::{MemoryStore, Store};
use hearth_test::{MockPlugin, ids, mock_catalogue};
use hearth_things::{AddThingOutcome, ThingRegistry};
use hearth_time::{CalendarItem, RepeatingOption, TimeDescriptor, TimeEventItem};
use hearth_types::{Event, Param, ThingId, Value, ValueOperator};

struct Fixture {
    registry: ThingRegistry,
    engine: RuleEngine,
    bus: NotificationBus,
    upstream: tokio::sync::mpsc::UnboundedReceiver<UpstreamMessage>,
}

async fn fixture() -> Fixture {
    let catalogue = mock_catalogue();
    let host = Arc::new(PluginHost::new());
    host.register_plugin(Arc::new(MockPlugin::new()), Vec::new())
        .await
        .unwrap();
    let upstream = host.take_upstream_receiver().unwrap();
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let bus = NotificationBus::new();
    let registry = ThingRegistry::new(catalogue, host, Arc::clone(&store), bus.clone());
    let engine = RuleEngine::new(store, bus.clone());
    Fixture {
        registry,
        engine,
        bus,
        upstream,
    }
}

impl Fixture {
    async fn add_switch(&mut self, name: &str) -> ThingId {
        let outcome = self
            .registry
            .add_thing(ids::VIRTUAL_SWITCH_CLASS_ID, name, &[], None)
            .await
            .unwrap();
        let AddThingOutcome::SetupStarted { thing_id } = outcome else {
            panic!("just-add");
        };
        // Drain the setup completion the dispatcher would route.
        let _ = self.upstream.recv().await.unwrap();
        self.registry
            .handle_setup_finished(thing_id, hearth_plugins::ReplyStatus::Ok)
            .await
            .unwrap();
        thing_id
    }
}

fn pressed(thing_id: ThingId, button: &str) -> Event {
    Event::new(
        ids::PRESSED_EVENT_ID,
        thing_id,
        vec![Param::new(
            ids::BUTTON_NAME_PARAM_ID,
            Value::String(button.into()),
        )],
    )
}

fn power_on_action(thing_id: ThingId) -> RuleAction {
    RuleAction::thing(thing_id, ids::POWER_ACTION_ID).with_param(RuleActionParam::literal(
        ids::POWER_ACTION_PARAM_ID,
        Value::Bool(true),
    ))
}

fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 10)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

#[tokio::test]
async fn event_rule_with_param_filter_fires_matching_action() {
    let mut fx = fixture().await;
    let switch = fx.add_switch("switch").await;

    let rule = Rule::new("button A powers on")
        .on_event(
            EventDescriptor::thing(switch, ids::PRESSED_EVENT_ID).with_filter(
                ParamFilter::equals(ids::BUTTON_NAME_PARAM_ID, Value::String("A".into())),
            ),
        )
        .with_action(power_on_action(switch));
    fx.engine.add_rule(rule, &fx.registry).await.unwrap();

    let actions = fx
        .engine
        .evaluate_event(&pressed(switch, "A"), &fx.registry, at(12, 0));
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].action_type_id, ids::POWER_ACTION_ID);
    assert_eq!(actions[0].thing_id, switch);
    assert_eq!(
        hearth_types::param_value(&actions[0].params, ids::POWER_ACTION_PARAM_ID),
        Some(&Value::Bool(true))
    );

    // A different button matches nothing.
    let actions = fx
        .engine
        .evaluate_event(&pressed(switch, "B"), &fx.registry, at(12, 0));
    assert!(actions.is_empty());
}

#[tokio::test]
async fn interface_event_descriptor_matches_any_implementor() {
    let mut fx = fixture().await;
    let first = fx.add_switch("first").await;
    let second = fx.add_switch("second").await;

    let rule = Rule::new("any button beeps first switch")
        .on_event(EventDescriptor::interface("button", "pressed"))
        .with_action(RuleAction::thing(first, ids::BEEP_ACTION_ID));
    fx.engine.add_rule(rule, &fx.registry).await.unwrap();

    let actions = fx
        .engine
        .evaluate_event(&pressed(second, "X"), &fx.registry, at(12, 0));
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].action_type_id, ids::BEEP_ACTION_ID);
}

#[tokio::test]
async fn state_evaluator_gates_event_rule() {
    let mut fx = fixture().await;
    let switch = fx.add_switch("switch").await;
    let sensor = fx.add_switch("sensor").await;

    let evaluator = StateEvaluator::node(
        StateOperator::And,
        vec![
            StateEvaluator::leaf(StateDescriptor::thing(
                sensor,
                ids::DOOR_OPEN_STATE_ID,
                ValueOperator::Equals,
                Value::Bool(false),
            )),
            StateEvaluator::leaf(StateDescriptor::thing(
                sensor,
                ids::TEMPERATURE_STATE_ID,
                ValueOperator::Greater,
                Value::Double(25.0),
            )),
        ],
    );
    let rule = Rule::new("hot and closed")
        .on_event(EventDescriptor::thing(switch, ids::PRESSED_EVENT_ID))
        .with_evaluator(evaluator)
        .with_action(power_on_action(switch));
    fx.engine.add_rule(rule, &fx.registry).await.unwrap();

    // Too cold: gated.
    assert!(
        fx.engine
            .evaluate_event(&pressed(switch, "A"), &fx.registry, at(12, 0))
            .is_empty()
    );

    fx.registry
        .set_state_value(
            sensor,
            ids::TEMPERATURE_STATE_ID,
            Value::Double(26.0),
            Utc::now(),
        )
        .await
        .unwrap();
    assert_eq!(
        fx.engine
            .evaluate_event(&pressed(switch, "A"), &fx.registry, at(12, 0))
            .len(),
        1
    );
}

#[tokio::test]
async fn activity_transitions_run_entry_and_exit_actions() {
    let mut fx = fixture().await;
    let sensor = fx.add_switch("sensor").await;
    let ac = fx.add_switch("ac").await;

    let cool = RuleAction::thing(ac, ids::MODE_ACTION_ID).with_param(RuleActionParam::literal(
        ids::MODE_ACTION_PARAM_ID,
        Value::String("cool".into()),
    ));
    let off = RuleAction::thing(ac, ids::MODE_ACTION_ID).with_param(RuleActionParam::literal(
        ids::MODE_ACTION_PARAM_ID,
        Value::String("off".into()),
    ));
    let rule = Rule::new("cool when hot")
        .with_evaluator(StateEvaluator::leaf(StateDescriptor::thing(
            sensor,
            ids::TEMPERATURE_STATE_ID,
            ValueOperator::Greater,
            Value::Double(25.0),
        )))
        .with_action(cool)
        .with_exit_action(off);
    let rule_id = fx.engine.add_rule(rule, &fx.registry).await.unwrap();

    // 26 degrees: one entry action, exactly once.
    fx.registry
        .set_state_value(sensor, ids::TEMPERATURE_STATE_ID, Value::Double(26.0), Utc::now())
        .await
        .unwrap();
    let actions = fx.engine.evaluate_state_change(&fx.registry, at(12, 0));
    assert_eq!(actions.len(), 1);
    assert_eq!(
        hearth_types::param_value(&actions[0].params, ids::MODE_ACTION_PARAM_ID),
        Some(&Value::String("cool".into()))
    );
    assert!(fx.engine.rule(rule_id).unwrap().active);

    // Still hot: no repeat.
    assert!(fx.engine.evaluate_state_change(&fx.registry, at(12, 1)).is_empty());

    // Crossing down: the exit action.
    fx.registry
        .set_state_value(sensor, ids::TEMPERATURE_STATE_ID, Value::Double(24.0), Utc::now())
        .await
        .unwrap();
    let actions = fx.engine.evaluate_state_change(&fx.registry, at(12, 2));
    assert_eq!(actions.len(), 1);
    assert_eq!(
        hearth_types::param_value(&actions[0].params, ids::MODE_ACTION_PARAM_ID),
        Some(&Value::String("off".into()))
    );
    assert!(!fx.engine.rule(rule_id).unwrap().active);

    // Crossing up again: another entry action.
    fx.registry
        .set_state_value(sensor, ids::TEMPERATURE_STATE_ID, Value::Double(26.0), Utc::now())
        .await
        .unwrap();
    assert_eq!(fx.engine.evaluate_state_change(&fx.registry, at(12, 3)).len(), 1);
}

#[tokio::test]
async fn calendar_rule_goes_active_inside_window() {
    let mut fx = fixture().await;
    let switch = fx.add_switch("switch").await;

    let window = CalendarItem::starting_at(NaiveTime::from_hms_opt(8, 0, 0).unwrap(), 480)
        .repeating(RepeatingOption::weekly(vec![1, 2, 3, 4, 5]));
    let rule = Rule::new("work hours")
        .with_time(TimeDescriptor::calendar(vec![window]))
        .with_action(power_on_action(switch));
    let rule_id = fx.engine.add_rule(rule, &fx.registry).await.unwrap();

    // 2026-03-10 is a Tuesday. 07:59 — outside.
    assert!(fx.engine.evaluate_time(at(7, 59), &fx.registry).await.unwrap().is_empty());
    assert!(!fx.engine.rule(rule_id).unwrap().active);

    // 08:00 — the window opens.
    let actions = fx.engine.evaluate_time(at(8, 0), &fx.registry).await.unwrap();
    assert_eq!(actions.len(), 1);
    assert!(fx.engine.rule(rule_id).unwrap().active);

    // 16:00 — the window closes; no exit actions declared.
    assert!(fx.engine.evaluate_time(at(16, 0), &fx.registry).await.unwrap().is_empty());
    assert!(!fx.engine.rule(rule_id).unwrap().active);
}

#[tokio::test]
async fn time_event_rule_fires_on_edge() {
    let mut fx = fixture().await;
    let switch = fx.add_switch("switch").await;

    let rule = Rule::new("morning power")
        .with_time(TimeDescriptor::time_events(vec![TimeEventItem::at_time(
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        )]))
        .with_action(power_on_action(switch));
    fx.engine.add_rule(rule, &fx.registry).await.unwrap();

    // Establish a tick before the instant.
    assert!(fx.engine.evaluate_time(at(7, 59), &fx.registry).await.unwrap().is_empty());
    // The edge fires exactly once.
    assert_eq!(fx.engine.evaluate_time(at(8, 0), &fx.registry).await.unwrap().len(), 1);
    assert!(fx.engine.evaluate_time(at(8, 1), &fx.registry).await.unwrap().is_empty());
}

#[tokio::test]
async fn state_ref_param_resolves_at_execution_time() {
    let mut fx = fixture().await;
    let source = fx.add_switch("source").await;
    let target = fx.add_switch("target").await;

    fx.registry
        .set_state_value(source, ids::POWER_STATE_ID, Value::Bool(true), Utc::now())
        .await
        .unwrap();

    let rule = Rule::new("mirror power")
        .on_event(EventDescriptor::thing(target, ids::PRESSED_EVENT_ID))
        .with_action(
            RuleAction::thing(target, ids::POWER_ACTION_ID).with_param(
                RuleActionParam::state_ref(ids::POWER_ACTION_PARAM_ID, source, ids::POWER_STATE_ID),
            ),
        );
    fx.engine.add_rule(rule, &fx.registry).await.unwrap();

    let actions = fx
        .engine
        .evaluate_event(&pressed(target, "A"), &fx.registry, at(12, 0));
    assert_eq!(actions.len(), 1);
    assert_eq!(
        hearth_types::param_value(&actions[0].params, ids::POWER_ACTION_PARAM_ID),
        Some(&Value::Bool(true))
    );
}

#[tokio::test]
async fn invalid_rules_are_rejected_at_add_time() {
    let mut fx = fixture().await;
    let switch = fx.add_switch("switch").await;

    // Unknown thing.
    let rule = Rule::new("ghost")
        .on_event(EventDescriptor::thing(ThingId::new(), ids::PRESSED_EVENT_ID))
        .with_action(power_on_action(switch));
    assert!(matches!(
        fx.engine.add_rule(rule, &fx.registry).await.unwrap_err(),
        RuleError::ThingNotFound(_)
    ));

    // No actions.
    let rule = Rule::new("inert").on_event(EventDescriptor::thing(switch, ids::PRESSED_EVENT_ID));
    assert!(matches!(
        fx.engine.add_rule(rule, &fx.registry).await.unwrap_err(),
        RuleError::NoActions
    ));

    // Bad literal param.
    let rule = Rule::new("bad literal")
        .on_event(EventDescriptor::thing(switch, ids::PRESSED_EVENT_ID))
        .with_action(
            RuleAction::thing(switch, ids::MODE_ACTION_ID).with_param(RuleActionParam::literal(
                ids::MODE_ACTION_PARAM_ID,
                Value::String("turbo".into()),
            )),
        );
    assert!(matches!(
        fx.engine.add_rule(rule, &fx.registry).await.unwrap_err(),
        RuleError::Param(_)
    ));

    // Mixed time descriptor.
    let rule = Rule::new("mixed time")
        .with_time(TimeDescriptor {
            calendar_items: vec![CalendarItem::starting_at(
                NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                60,
            )],
            time_event_items: vec![TimeEventItem::at_time(
                NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            )],
        })
        .with_action(power_on_action(switch));
    assert!(matches!(
        fx.engine.add_rule(rule, &fx.registry).await.unwrap_err(),
        RuleError::Time(_)
    ));
}

#[tokio::test]
async fn add_remove_add_round_trips() {
    let mut fx = fixture().await;
    let switch = fx.add_switch("switch").await;

    let rule = Rule::new("round trip")
        .on_event(EventDescriptor::thing(switch, ids::PRESSED_EVENT_ID))
        .with_action(power_on_action(switch));
    let reference = rule.clone();

    let rule_id = fx.engine.add_rule(rule.clone(), &fx.registry).await.unwrap();
    fx.engine.remove_rule(rule_id).await.unwrap();
    assert!(fx.engine.rule(rule_id).is_none());

    fx.engine.add_rule(rule, &fx.registry).await.unwrap();
    let stored = fx.engine.rule(rule_id).unwrap();
    assert_eq!(stored.name, reference.name);
    assert_eq!(stored.event_descriptors, reference.event_descriptors);
    assert_eq!(stored.actions, reference.actions);
}

#[tokio::test]
async fn rules_survive_reload_in_insertion_order() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let bus = NotificationBus::new();
    let catalogue = mock_catalogue();
    let host = Arc::new(PluginHost::new());
    host.register_plugin(Arc::new(MockPlugin::new()), Vec::new())
        .await
        .unwrap();
    let mut upstream = host.take_upstream_receiver().unwrap();
    let mut registry = ThingRegistry::new(catalogue, host, Arc::clone(&store), bus.clone());

    let outcome = registry
        .add_thing(ids::VIRTUAL_SWITCH_CLASS_ID, "switch", &[], None)
        .await
        .unwrap();
    let AddThingOutcome::SetupStarted { thing_id } = outcome else {
        panic!("just-add");
    };
    let _ = upstream.recv().await.unwrap();
    registry
        .handle_setup_finished(thing_id, hearth_plugins::ReplyStatus::Ok)
        .await
        .unwrap();

    let mut engine = RuleEngine::new(Arc::clone(&store), bus.clone());
    for name in ["first", "second", "third"] {
        let rule = Rule::new(name)
            .on_event(EventDescriptor::thing(thing_id, ids::PRESSED_EVENT_ID))
            .with_action(power_on_action(thing_id));
        engine.add_rule(rule, &registry).await.unwrap();
    }

    let mut reloaded = RuleEngine::new(store, bus);
    reloaded.load(&registry).await.unwrap();
    let names: Vec<_> = reloaded.rules().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn cascade_removal_drops_referencing_rules() {
    let mut fx = fixture().await;
    let sensor = fx.add_switch("sensor").await;
    let switch = fx.add_switch("switch").await;
    let mut notifications = fx.bus.subscribe();

    let rule = Rule::new("references sensor")
        .with_evaluator(StateEvaluator::leaf(StateDescriptor::thing(
            sensor,
            ids::DOOR_OPEN_STATE_ID,
            ValueOperator::Equals,
            Value::Bool(true),
        )))
        .with_action(power_on_action(switch));
    let rule_id = fx.engine.add_rule(rule, &fx.registry).await.unwrap();

    let removed = fx
        .engine
        .remove_thing(sensor, RemovePolicy::Cascade, &fx.registry)
        .await
        .unwrap();
    assert_eq!(removed, vec![rule_id]);
    assert!(fx.engine.rule(rule_id).is_none());

    fx.registry.remove_thing(sensor).await.unwrap();

    // The rule-removed notification precedes the thing-removed one.
    let kinds: Vec<_> = notifications.drain().iter().map(|n| n.kind()).collect();
    let rule_pos = kinds.iter().position(|k| *k == "rule_removed").unwrap();
    let thing_pos = kinds.iter().position(|k| *k == "thing_removed").unwrap();
    assert!(rule_pos < thing_pos);
}

#[tokio::test]
async fn update_rules_policy_prunes_and_drops_orphans() {
    let mut fx = fixture().await;
    let sensor = fx.add_switch("sensor").await;
    let switch = fx.add_switch("switch").await;

    // This rule only loses its evaluator leaf; it survives.
    let survivor = Rule::new("survivor")
        .on_event(EventDescriptor::thing(switch, ids::PRESSED_EVENT_ID))
        .with_evaluator(StateEvaluator::leaf(StateDescriptor::thing(
            sensor,
            ids::DOOR_OPEN_STATE_ID,
            ValueOperator::Equals,
            Value::Bool(true),
        )))
        .with_action(power_on_action(switch));
    let survivor_id = fx.engine.add_rule(survivor, &fx.registry).await.unwrap();

    // This rule's only action targets the sensor; it orphans.
    let orphan = Rule::new("orphan")
        .on_event(EventDescriptor::thing(switch, ids::PRESSED_EVENT_ID))
        .with_action(RuleAction::thing(sensor, ids::BEEP_ACTION_ID));
    let orphan_id = fx.engine.add_rule(orphan, &fx.registry).await.unwrap();

    let removed = fx
        .engine
        .remove_thing(sensor, RemovePolicy::UpdateRules, &fx.registry)
        .await
        .unwrap();
    assert_eq!(removed, vec![orphan_id]);

    let survivor = fx.engine.rule(survivor_id).unwrap();
    assert!(survivor.state_evaluator.is_none());
    assert!(fx.engine.rule(orphan_id).is_none());
}

#[tokio::test]
async fn interface_evaluator_quantifies_by_enclosing_operator() {
    let mut fx = fixture().await;
    let first = fx.add_switch("first").await;
    let second = fx.add_switch("second").await;
    let target = fx.add_switch("target").await;

    let any_on = Rule::new("any powered")
        .on_event(EventDescriptor::thing(target, ids::PRESSED_EVENT_ID))
        .with_evaluator({
            let mut leaf = StateEvaluator::leaf(StateDescriptor::interface(
                "power",
                "power",
                ValueOperator::Equals,
                Value::Bool(true),
            ));
            leaf.operator = StateOperator::Or;
            leaf
        })
        .with_action(power_on_action(target));
    let all_on = Rule::new("all powered")
        .on_event(EventDescriptor::thing(target, ids::PRESSED_EVENT_ID))
        .with_evaluator(StateEvaluator::leaf(StateDescriptor::interface(
            "power",
            "power",
            ValueOperator::Equals,
            Value::Bool(true),
        )))
        .with_action(RuleAction::thing(target, ids::BEEP_ACTION_ID));
    let any_id = fx.engine.add_rule(any_on, &fx.registry).await.unwrap();
    let all_id = fx.engine.add_rule(all_on, &fx.registry).await.unwrap();

    // One of three switches on: "any" holds, "all" does not.
    fx.registry
        .set_state_value(first, ids::POWER_STATE_ID, Value::Bool(true), Utc::now())
        .await
        .unwrap();
    let actions = fx
        .engine
        .evaluate_event(&pressed(target, "A"), &fx.registry, at(12, 0));
    let fired: Vec<_> = actions.iter().map(|a| a.action_type_id).collect();
    assert!(fired.contains(&ids::POWER_ACTION_ID));
    assert!(!fired.contains(&ids::BEEP_ACTION_ID));

    // All three on: both hold.
    fx.registry
        .set_state_value(second, ids::POWER_STATE_ID, Value::Bool(true), Utc::now())
        .await
        .unwrap();
    fx.registry
        .set_state_value(target, ids::POWER_STATE_ID, Value::Bool(true), Utc::now())
        .await
        .unwrap();
    let actions = fx
        .engine
        .evaluate_event(&pressed(target, "A"), &fx.registry, at(12, 0));
    assert_eq!(actions.len(), 2);

    let _ = (any_id, all_id);
}

#[tokio::test]
async fn disabled_rule_never_triggers() {
    let mut fx = fixture().await;
    let switch = fx.add_switch("switch").await;

    let rule = Rule::new("toggleable")
        .on_event(EventDescriptor::thing(switch, ids::PRESSED_EVENT_ID))
        .with_action(power_on_action(switch));
    let rule_id = fx.engine.add_rule(rule, &fx.registry).await.unwrap();

    fx.engine.enable_rule(rule_id, false).await.unwrap();
    assert!(
        fx.engine
            .evaluate_event(&pressed(switch, "A"), &fx.registry, at(12, 0))
            .is_empty()
    );

    fx.engine.enable_rule(rule_id, true).await.unwrap();
    assert_eq!(
        fx.engine
            .evaluate_event(&pressed(switch, "A"), &fx.registry, at(12, 0))
            .len(),
        1
    );
}
