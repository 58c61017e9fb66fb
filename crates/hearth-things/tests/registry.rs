//! Registry lifecycle tests against the mock plugin.

use std::sync::Arc;

use chrono::Utc;

use hearth_events::{Notification, NotificationBus};
use hearth_plugins::{PluginHost, ReplyContext, ReplyStatus, UpstreamMessage};
use hearth_storage::{MemoryStore, Store};
use hearth_test::{MockPlugin, ids, mock_catalogue};
use hearth_things::{AddThingOutcome, ThingError, ThingRegistry};
use hearth_types::{Param, SetupStatus, ThingId, ValidationError, Value};

struct Fixture {
    registry: ThingRegistry,
    plugin: Arc<MockPlugin>,
    host: Arc<PluginHost>,
    store: Arc<MemoryStore>,
    bus: NotificationBus,
    upstream: tokio::sync::mpsc::UnboundedReceiver<UpstreamMessage>,
}

async fn fixture() -> Fixture {
    fixture_with_store(Arc::new(MemoryStore::new())).await
}

async fn fixture_with_store(store: Arc<MemoryStore>) -> Fixture {
    let catalogue = mock_catalogue();
    let host = Arc::new(PluginHost::new());
    let plugin = Arc::new(MockPlugin::new());
    host.register_plugin(Arc::clone(&plugin) as _, Vec::new())
        .await
        .unwrap();
    let upstream = host.take_upstream_receiver().unwrap();
    let bus = NotificationBus::new();
    let registry = ThingRegistry::new(
        catalogue,
        Arc::clone(&host),
        Arc::clone(&store) as Arc<dyn Store>,
        bus.clone(),
    );
    Fixture {
        registry,
        plugin,
        host,
        store,
        bus,
        upstream,
    }
}

impl Fixture {
    /// Pump one setup completion from the host back into the registry, the
    /// way the dispatcher would.
    async fn pump_setup(&mut self) {
        match self.upstream.recv().await.unwrap() {
            UpstreamMessage::ReplyFinished(completion) => {
                let ReplyContext::Setup { thing_id } = completion.context else {
                    panic!("expected a setup completion");
                };
                self.registry
                    .handle_setup_finished(thing_id, completion.status)
                    .await
                    .unwrap();
            },
            other => panic!("expected a completion, got {other:?}"),
        }
    }

    async fn add_switch(&mut self, name: &str) -> ThingId {
        let outcome = self
            .registry
            .add_thing(ids::VIRTUAL_SWITCH_CLASS_ID, name, &[], None)
            .await
            .unwrap();
        let AddThingOutcome::SetupStarted { thing_id } = outcome else {
            panic!("virtual switch is just-add");
        };
        self.pump_setup().await;
        thing_id
    }
}

#[tokio::test]
async fn add_thing_runs_setup_to_complete() {
    let mut fx = fixture().await;
    let mut notifications = fx.bus.subscribe();

    let thing_id = fx.add_switch("office switch").await;

    let thing = fx.registry.thing(thing_id).unwrap();
    assert_eq!(thing.setup_status, SetupStatus::Complete);
    assert_eq!(thing.state_value(ids::POWER_STATE_ID), Some(&Value::Bool(false)));
    assert_eq!(fx.plugin.setup_things(), vec![thing_id]);

    let kinds: Vec<_> = notifications.drain().iter().map(|n| n.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            "thing_added",
            "thing_setup_status_changed",
            "thing_setup_status_changed"
        ]
    );
}

#[tokio::test]
async fn failed_setup_keeps_thing_for_retry() {
    let mut fx = fixture().await;
    fx.plugin.set_setup_status(ReplyStatus::SetupFailed);

    let outcome = fx
        .registry
        .add_thing(ids::VIRTUAL_SWITCH_CLASS_ID, "broken", &[], None)
        .await
        .unwrap();
    let AddThingOutcome::SetupStarted { thing_id } = outcome else {
        panic!("virtual switch is just-add");
    };
    fx.pump_setup().await;

    let thing = fx.registry.thing(thing_id).unwrap();
    assert_eq!(thing.setup_status, SetupStatus::Failed);

    // Retry by reconfiguring with the plugin healthy again.
    fx.plugin.set_setup_status(ReplyStatus::Ok);
    fx.registry.reconfigure_thing(thing_id, &[]).await.unwrap();
    fx.pump_setup().await;
    assert_eq!(
        fx.registry.thing(thing_id).unwrap().setup_status,
        SetupStatus::Complete
    );
}

#[tokio::test]
async fn param_validation_rejects_out_of_range() {
    let mut fx = fixture().await;
    let err = fx
        .registry
        .add_thing(
            ids::VIRTUAL_SWITCH_CLASS_ID,
            "bad",
            &[Param::new(ids::ADDRESS_PARAM_ID, Value::Int(500))],
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ThingError::Param(ValidationError::OutOfRange { .. })
    ));
    assert_eq!(fx.registry.things().count(), 0);
}

#[tokio::test]
async fn state_write_emits_exactly_one_change() {
    let mut fx = fixture().await;
    let thing_id = fx.add_switch("switch").await;
    let mut notifications = fx.bus.subscribe();

    let now = Utc::now();
    let changed = fx
        .registry
        .set_state_value(thing_id, ids::POWER_STATE_ID, Value::Bool(true), now)
        .await
        .unwrap();
    assert!(changed);
    let changed_again = fx
        .registry
        .set_state_value(thing_id, ids::POWER_STATE_ID, Value::Bool(true), now)
        .await
        .unwrap();
    assert!(!changed_again);

    let changes: Vec<_> = notifications
        .drain()
        .iter()
        .filter(|n| n.kind() == "thing_state_changed")
        .cloned()
        .collect();
    assert_eq!(changes.len(), 1);
    let Notification::ThingStateChanged {
        old_value,
        new_value,
        ..
    } = changes[0].as_ref()
    else {
        panic!("expected a state change");
    };
    assert_eq!(old_value, &Value::Bool(false));
    assert_eq!(new_value, &Value::Bool(true));
}

#[tokio::test]
async fn dead_band_suppresses_jitter() {
    let mut fx = fixture().await;
    let thing_id = fx.add_switch("sensor").await;

    let now = Utc::now();
    assert!(
        fx.registry
            .set_state_value(thing_id, ids::TEMPERATURE_STATE_ID, Value::Double(21.0), now)
            .await
            .unwrap()
    );
    // Within the 0.1 dead band: no change, value keeps its old reading.
    assert!(
        !fx.registry
            .set_state_value(thing_id, ids::TEMPERATURE_STATE_ID, Value::Double(21.05), now)
            .await
            .unwrap()
    );
    assert_eq!(
        fx.registry
            .thing(thing_id)
            .unwrap()
            .state_value(ids::TEMPERATURE_STATE_ID),
        Some(&Value::Double(21.0))
    );
    // Beyond it: a change.
    assert!(
        fx.registry
            .set_state_value(thing_id, ids::TEMPERATURE_STATE_ID, Value::Double(21.5), now)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn state_write_validates_against_schema() {
    let mut fx = fixture().await;
    let thing_id = fx.add_switch("switch").await;

    let err = fx
        .registry
        .set_state_value(
            thing_id,
            ids::TEMPERATURE_STATE_ID,
            Value::Double(900.0),
            Utc::now(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ThingError::Param(_)));

    let err = fx
        .registry
        .set_state_value(
            thing_id,
            ids::MODE_STATE_ID,
            Value::String("turbo".into()),
            Utc::now(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ThingError::Param(ValidationError::NotInAllowedValues { .. })
    ));
}

#[tokio::test]
async fn cached_state_survives_reload_non_cached_resets() {
    let store = Arc::new(MemoryStore::new());
    let thing_id;
    {
        let mut fx = fixture_with_store(Arc::clone(&store)).await;
        thing_id = fx.add_switch("switch").await;
        fx.registry
            .set_state_value(thing_id, ids::POWER_STATE_ID, Value::Bool(true), Utc::now())
            .await
            .unwrap();
        fx.registry
            .set_state_value(
                thing_id,
                ids::TEMPERATURE_STATE_ID,
                Value::Double(25.0),
                Utc::now(),
            )
            .await
            .unwrap();
    }

    let mut fx = fixture_with_store(store).await;
    fx.registry.load().await.unwrap();
    fx.pump_setup().await;

    let thing = fx.registry.thing(thing_id).unwrap();
    // power is cached, temperature is not.
    assert_eq!(thing.state_value(ids::POWER_STATE_ID), Some(&Value::Bool(true)));
    assert_eq!(
        thing.state_value(ids::TEMPERATURE_STATE_ID),
        Some(&Value::Double(20.0))
    );
    assert_eq!(thing.setup_status, SetupStatus::Complete);
}

#[tokio::test]
async fn remove_thing_removes_descendants_first() {
    let mut fx = fixture().await;
    let parent = fx.add_switch("bridge").await;

    let outcome = fx
        .registry
        .add_thing(ids::VIRTUAL_SWITCH_CLASS_ID, "child", &[], Some(parent))
        .await
        .unwrap();
    let AddThingOutcome::SetupStarted { thing_id: child } = outcome else {
        panic!("just-add");
    };
    fx.pump_setup().await;

    let removed = fx.registry.remove_thing(parent).await.unwrap();
    assert_eq!(removed, vec![child, parent]);
    assert_eq!(fx.registry.things().count(), 0);
    assert_eq!(fx.plugin.removed_things(), vec![child, parent]);
    assert!(fx.store.list("things").await.unwrap().is_empty());
}

#[tokio::test]
async fn pairing_flow_creates_thing_on_confirmation() {
    let mut fx = fixture().await;

    let outcome = fx
        .registry
        .add_thing(ids::VIRTUAL_LOCK_CLASS_ID, "front door", &[], None)
        .await
        .unwrap();
    let AddThingOutcome::PairingStarted { transaction_id, .. } = outcome else {
        panic!("virtual lock needs pairing");
    };

    // Opening step: plugin answers Ok with a display pin.
    let UpstreamMessage::ReplyFinished(completion) = fx.upstream.recv().await.unwrap() else {
        panic!("expected completion");
    };
    assert_eq!(completion.display_message.as_deref(), Some("pin: 1234"));
    let ReplyContext::Pairing { confirm, .. } = completion.context else {
        panic!("expected pairing context");
    };
    fx.registry
        .handle_pairing_finished(transaction_id, confirm, completion.status)
        .await
        .unwrap();

    // Confirmation with the right secret creates the thing.
    fx.registry
        .confirm_pairing(transaction_id, Some("1234".into()))
        .await
        .unwrap();
    let UpstreamMessage::ReplyFinished(completion) = fx.upstream.recv().await.unwrap() else {
        panic!("expected completion");
    };
    let created = fx
        .registry
        .handle_pairing_finished(transaction_id, true, completion.status)
        .await
        .unwrap();
    let thing_id = created.expect("thing created");
    fx.pump_setup().await;

    let thing = fx.registry.thing(thing_id).unwrap();
    assert_eq!(thing.name, "front door");
    assert_eq!(thing.setup_status, SetupStatus::Complete);
}

#[tokio::test]
async fn pairing_confirmation_with_wrong_secret_creates_nothing() {
    let mut fx = fixture().await;
    let outcome = fx
        .registry
        .add_thing(ids::VIRTUAL_LOCK_CLASS_ID, "front door", &[], None)
        .await
        .unwrap();
    let AddThingOutcome::PairingStarted { transaction_id, .. } = outcome else {
        panic!("virtual lock needs pairing");
    };
    let UpstreamMessage::ReplyFinished(completion) = fx.upstream.recv().await.unwrap() else {
        panic!("expected completion");
    };
    fx.registry
        .handle_pairing_finished(transaction_id, false, completion.status)
        .await
        .unwrap();

    fx.registry
        .confirm_pairing(transaction_id, Some("0000".into()))
        .await
        .unwrap();
    let UpstreamMessage::ReplyFinished(completion) = fx.upstream.recv().await.unwrap() else {
        panic!("expected completion");
    };
    assert_eq!(completion.status, ReplyStatus::SetupFailed);
    let created = fx
        .registry
        .handle_pairing_finished(transaction_id, true, completion.status)
        .await
        .unwrap();
    assert!(created.is_none());
    assert_eq!(fx.registry.things().count(), 0);
}

#[tokio::test]
async fn finders_cover_class_parent_and_interface() {
    let mut fx = fixture().await;
    let a = fx.add_switch("a").await;
    let b = fx.add_switch("b").await;

    assert_eq!(
        fx.registry
            .find_configured_things(ids::VIRTUAL_SWITCH_CLASS_ID)
            .len(),
        2
    );
    assert!(fx.registry.find_by_parent(a).is_empty());
    let by_interface: Vec<_> = fx
        .registry
        .find_by_interface("power")
        .iter()
        .map(|t| t.id)
        .collect();
    assert!(by_interface.contains(&a) && by_interface.contains(&b));
    assert!(fx.registry.find_by_interface("battery").is_empty());

    let _ = fx.host.pending_count();
}
