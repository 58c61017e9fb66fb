//! An event-driven rule fires its action end to end.

use hearth_integration_tests::{CoreFixture, eventually};
use hearth_rules::{EventDescriptor, ParamFilter, Rule, RuleAction, RuleActionParam};
use hearth_test::ids;
use hearth_types::{Value, param_value};

#[tokio::test]
async fn pressed_button_a_powers_on() {
    let fx = CoreFixture::start().await;
    let switch = fx.add_switch("office switch").await;

    let rule = Rule::new("button A powers on")
        .on_event(
            EventDescriptor::thing(switch, ids::PRESSED_EVENT_ID).with_filter(
                ParamFilter::equals(ids::BUTTON_NAME_PARAM_ID, Value::String("A".into())),
            ),
        )
        .with_action(
            RuleAction::thing(switch, ids::POWER_ACTION_ID).with_param(
                RuleActionParam::literal(ids::POWER_ACTION_PARAM_ID, Value::Bool(true)),
            ),
        );
    fx.handle.add_rule(rule).await.expect("rule adds");

    // The matching button reaches the plugin as a power action.
    fx.plugin.press_button(switch, "A");
    assert!(
        eventually(|| async { fx.plugin.executed_actions().len() == 1 }).await,
        "the action never arrived at the plugin"
    );
    let action = &fx.plugin.executed_actions()[0];
    assert_eq!(action.action_type_id, ids::POWER_ACTION_ID);
    assert_eq!(action.thing_id, switch);
    assert_eq!(
        param_value(&action.params, ids::POWER_ACTION_PARAM_ID),
        Some(&Value::Bool(true))
    );

    // The other button matches nothing; press A again to bound the wait.
    fx.plugin.press_button(switch, "B");
    fx.plugin.press_button(switch, "A");
    assert!(
        eventually(|| async { fx.plugin.executed_actions().len() == 2 }).await,
        "the second press never arrived"
    );
    assert!(
        fx.plugin
            .executed_actions()
            .iter()
            .all(|a| a.action_type_id == ids::POWER_ACTION_ID)
    );

    fx.shutdown().await;
}

#[tokio::test]
async fn events_surface_as_notifications() {
    let fx = CoreFixture::start().await;
    let switch = fx.add_switch("switch").await;
    let mut notifications = fx.bus.subscribe();

    fx.plugin.press_button(switch, "A");
    let seen = eventually(|| {
        let found = notifications
            .drain()
            .iter()
            .any(|n| n.kind() == "event_triggered");
        async move { found }
    })
    .await;
    assert!(seen, "the event never surfaced on the bus");

    fx.shutdown().await;
}
