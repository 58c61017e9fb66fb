//! Asynchronous setup and pairing flows through the dispatcher.

use hearth_integration_tests::{CoreFixture, eventually};
use hearth_plugins::ReplyStatus;
use hearth_test::ids;
use hearth_things::AddThingOutcome;
use hearth_types::SetupStatus;

#[tokio::test]
async fn just_add_setup_reaches_complete() {
    let fx = CoreFixture::start().await;

    let outcome = fx
        .handle
        .add_thing(ids::VIRTUAL_SWITCH_CLASS_ID, "switch", Vec::new(), None)
        .await
        .expect("add succeeds");
    let AddThingOutcome::SetupStarted { thing_id } = outcome else {
        panic!("virtual switch is just-add");
    };
    fx.wait_for_setup(thing_id, SetupStatus::Complete).await;

    let things = fx.handle.things().await.expect("core running");
    let thing = things.iter().find(|t| t.id == thing_id).expect("thing exists");
    // States initialized to their defaults.
    assert!(
        thing
            .states
            .iter()
            .any(|s| s.state_type_id == ids::POWER_STATE_ID)
    );

    fx.shutdown().await;
}

#[tokio::test]
async fn failed_setup_is_retained_for_retry() {
    let fx = CoreFixture::start().await;
    fx.plugin.set_setup_status(ReplyStatus::SetupFailed);

    let outcome = fx
        .handle
        .add_thing(ids::VIRTUAL_SWITCH_CLASS_ID, "broken", Vec::new(), None)
        .await
        .expect("add succeeds synchronously");
    let AddThingOutcome::SetupStarted { thing_id } = outcome else {
        panic!("just-add");
    };
    fx.wait_for_setup(thing_id, SetupStatus::Failed).await;

    // The user retries by reconfiguring once the device is reachable.
    fx.plugin.set_setup_status(ReplyStatus::Ok);
    fx.handle
        .reconfigure_thing(thing_id, Vec::new())
        .await
        .expect("reconfigure dispatches");
    fx.wait_for_setup(thing_id, SetupStatus::Complete).await;

    fx.shutdown().await;
}

#[tokio::test]
async fn display_pin_pairing_end_to_end() {
    let fx = CoreFixture::start().await;

    let outcome = fx
        .handle
        .add_thing(ids::VIRTUAL_LOCK_CLASS_ID, "front door", Vec::new(), None)
        .await
        .expect("add succeeds");
    let AddThingOutcome::PairingStarted { transaction_id, .. } = outcome else {
        panic!("virtual lock pairs");
    };

    fx.handle
        .confirm_pairing(transaction_id, Some("1234".into()))
        .await
        .expect("confirm dispatches");

    // The confirmed pairing materializes the thing and runs its setup.
    let created = eventually(|| async {
        fx.handle
            .things()
            .await
            .expect("core running")
            .iter()
            .any(|t| t.name == "front door" && t.setup_status == SetupStatus::Complete)
    })
    .await;
    assert!(created, "pairing never produced a configured thing");

    fx.shutdown().await;
}

#[tokio::test]
async fn wrong_pin_leaves_nothing_behind() {
    let fx = CoreFixture::start().await;

    let outcome = fx
        .handle
        .add_thing(ids::VIRTUAL_LOCK_CLASS_ID, "front door", Vec::new(), None)
        .await
        .expect("add succeeds");
    let AddThingOutcome::PairingStarted { transaction_id, .. } = outcome else {
        panic!("virtual lock pairs");
    };

    fx.handle
        .confirm_pairing(transaction_id, Some("0000".into()))
        .await
        .expect("confirm dispatches");

    let appeared = eventually(|| async {
        !fx.handle.things().await.expect("core running").is_empty()
    })
    .await;
    assert!(!appeared, "a failed pairing must not create a thing");

    fx.shutdown().await;
}

#[tokio::test]
async fn discovery_returns_candidates_and_adds_them() {
    let fx = CoreFixture::start().await;
    fx.plugin.set_discovery_results(vec![
        hearth_plugins::ThingDescriptor::new(ids::VIRTUAL_SWITCH_CLASS_ID, "found in the attic"),
    ]);

    let descriptors = fx
        .handle
        .discover(ids::VIRTUAL_SWITCH_CLASS_ID, Vec::new())
        .await
        .expect("discovery runs");
    assert_eq!(descriptors.len(), 1);
    assert_eq!(descriptors[0].title, "found in the attic");

    let thing_id = fx
        .handle
        .add_discovered_thing(descriptors[0].clone())
        .await
        .expect("descriptor materializes");
    fx.wait_for_setup(thing_id, hearth_types::SetupStatus::Complete)
        .await;

    fx.shutdown().await;
}
