//! A state evaluator gates a rule; crossings run entry and exit actions.

use hearth_integration_tests::{CoreFixture, eventually};
use hearth_rules::{
    Rule, RuleAction, RuleActionParam, StateDescriptor, StateEvaluator, StateOperator,
};
use hearth_test::ids;
use hearth_types::{Value, ValueOperator, param_value};

fn mode_action(ac: hearth_types::ThingId, mode: &str) -> RuleAction {
    RuleAction::thing(ac, ids::MODE_ACTION_ID).with_param(RuleActionParam::literal(
        ids::MODE_ACTION_PARAM_ID,
        Value::String(mode.into()),
    ))
}

#[tokio::test]
async fn temperature_crossings_cool_and_stop_the_ac() {
    let fx = CoreFixture::start().await;
    let sensor = fx.add_switch("sensor").await;
    let ac = fx.add_switch("ac").await;

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
    let rule = Rule::new("cool when hot and closed")
        .with_evaluator(evaluator)
        .with_action(mode_action(ac, "cool"))
        .with_exit_action(mode_action(ac, "off"));
    fx.handle.add_rule(rule).await.expect("rule adds");

    let modes = || {
        fx.plugin
            .executed_actions()
            .iter()
            .filter_map(|a| param_value(&a.params, ids::MODE_ACTION_PARAM_ID).cloned())
            .collect::<Vec<_>>()
    };

    // 26 degrees with the door closed: exactly one entry action.
    fx.plugin
        .report_state(sensor, ids::TEMPERATURE_STATE_ID, Value::Double(26.0));
    assert!(eventually(|| async { modes().len() == 1 }).await);
    assert_eq!(modes()[0], Value::String("cool".into()));

    // Crossing down emits the exit action.
    fx.plugin
        .report_state(sensor, ids::TEMPERATURE_STATE_ID, Value::Double(24.0));
    assert!(eventually(|| async { modes().len() == 2 }).await);
    assert_eq!(modes()[1], Value::String("off".into()));

    // Each crossing up emits one entry action again.
    fx.plugin
        .report_state(sensor, ids::TEMPERATURE_STATE_ID, Value::Double(26.0));
    assert!(eventually(|| async { modes().len() == 3 }).await);
    assert_eq!(modes()[2], Value::String("cool".into()));

    // Opening the door while hot breaks the And and exits.
    fx.plugin
        .report_state(sensor, ids::DOOR_OPEN_STATE_ID, Value::Bool(true));
    assert!(eventually(|| async { modes().len() == 4 }).await);
    assert_eq!(modes()[3], Value::String("off".into()));

    fx.shutdown().await;
}

#[tokio::test]
async fn identical_writes_do_not_retrigger() {
    let fx = CoreFixture::start().await;
    let sensor = fx.add_switch("sensor").await;
    let ac = fx.add_switch("ac").await;

    let rule = Rule::new("hot")
        .with_evaluator(StateEvaluator::leaf(StateDescriptor::thing(
            sensor,
            ids::TEMPERATURE_STATE_ID,
            ValueOperator::Greater,
            Value::Double(25.0),
        )))
        .with_action(mode_action(ac, "cool"));
    fx.handle.add_rule(rule).await.expect("rule adds");

    fx.plugin
        .report_state(sensor, ids::TEMPERATURE_STATE_ID, Value::Double(26.0));
    assert!(eventually(|| async { fx.plugin.executed_actions().len() == 1 }).await);

    // The same reading again is no change and no new firing. A fresh,
    // still-hot reading moves the value but not the activity.
    fx.plugin
        .report_state(sensor, ids::TEMPERATURE_STATE_ID, Value::Double(26.0));
    fx.plugin
        .report_state(sensor, ids::TEMPERATURE_STATE_ID, Value::Double(27.0));
    assert!(
        eventually(|| async {
            fx.handle
                .get_state_value(sensor, ids::TEMPERATURE_STATE_ID)
                .await
                .expect("core running")
                == Some(Value::Double(27.0))
        })
        .await
    );
    assert_eq!(fx.plugin.executed_actions().len(), 1);

    fx.shutdown().await;
}
