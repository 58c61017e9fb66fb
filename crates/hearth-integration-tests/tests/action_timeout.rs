//! A plugin that never answers: the watchdog synthesizes the completion.

use std::time::Duration;

use hearth_integration_tests::CoreFixture;
use hearth_plugins::ReplyStatus;
use hearth_test::{ActionBehavior, ids};
use hearth_types::{Action, Param, TriggeredBy, Value};

fn power_action(thing_id: hearth_types::ThingId) -> Action {
    Action::new(
        ids::POWER_ACTION_ID,
        thing_id,
        vec![Param::new(ids::POWER_ACTION_PARAM_ID, Value::Bool(true))],
        TriggeredBy::User,
    )
}

#[tokio::test(start_paused = true)]
async fn withheld_action_times_out_after_deadline() {
    let fx = CoreFixture::start().await;
    let switch = fx.add_switch("switch").await;
    fx.plugin.set_action_behavior(ActionBehavior::Withhold);

    let started = tokio::time::Instant::now();
    let status = fx
        .handle
        .execute_action(power_action(switch))
        .await
        .expect("the command itself succeeds");
    assert_eq!(status, ReplyStatus::Timeout);
    // The watchdog's 45 s deadline elapsed on the paused clock.
    assert!(started.elapsed() >= Duration::from_secs(45));

    // A late answer from the plugin is rejected; the reply is spent.
    let held = fx.plugin.take_held_actions();
    assert_eq!(held.len(), 1);
    assert!(held[0].is_cancelled());
    assert!(held[0].finish(ReplyStatus::Ok, None).is_err());

    // The host recovered: the next action completes normally.
    fx.plugin.set_action_behavior(ActionBehavior::FinishOk);
    let status = fx
        .handle
        .execute_action(power_action(switch))
        .await
        .expect("the command succeeds");
    assert_eq!(status, ReplyStatus::Ok);

    fx.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn rule_continues_past_a_withheld_action() {
    let fx = CoreFixture::start().await;
    let first = fx.add_switch("first").await;
    let second = fx.add_switch("second").await;
    fx.plugin.set_action_behavior(ActionBehavior::Withhold);

    // A rule with two actions: the first hangs, the second must still be
    // enqueued — actions are dispatched, not awaited.
    let rule = hearth_rules::Rule::new("two actions")
        .on_event(hearth_rules::EventDescriptor::thing(
            first,
            ids::PRESSED_EVENT_ID,
        ))
        .with_action(hearth_rules::RuleAction::thing(first, ids::BEEP_ACTION_ID))
        .with_action(hearth_rules::RuleAction::thing(second, ids::BEEP_ACTION_ID));
    fx.handle.add_rule(rule).await.expect("rule adds");

    fx.plugin.press_button(first, "A");
    let both_enqueued = hearth_integration_tests::eventually(|| async {
        fx.plugin.held_action_count() >= 2
    })
    .await;
    assert!(both_enqueued, "the second action never reached the plugin");

    fx.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failed_hardware_surfaces_to_the_originator() {
    let fx = CoreFixture::start().await;
    let switch = fx.add_switch("switch").await;
    fx.plugin
        .set_action_behavior(ActionBehavior::FinishWith(ReplyStatus::HardwareFailure));

    let status = fx
        .handle
        .execute_action(power_action(switch))
        .await
        .expect("the command succeeds");
    assert_eq!(status, ReplyStatus::HardwareFailure);

    fx.shutdown().await;
}
