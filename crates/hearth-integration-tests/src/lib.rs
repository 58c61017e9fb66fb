//! Shared fixture for the end-to-end scenarios.

#![deny(unsafe_code)]
#![deny(missing_docs)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use tokio::task::JoinHandle;

use hearth_events::NotificationBus;
use hearth_plugins::PluginHost;
use hearth_rules::RuleEngine;
use hearth_runtime::{Dispatcher, DispatcherHandle};
use hearth_storage::{MemoryStore, Store};
use hearth_test::{MockPlugin, ids, mock_catalogue};
use hearth_things::{AddThingOutcome, ThingRegistry};
use hearth_types::{SetupStatus, ThingId};

/// A fully wired core with the mock plugin, running on its own task.
pub struct CoreFixture {
    /// Command surface into the dispatcher.
    pub handle: DispatcherHandle,
    /// The mock plugin, for scripting and inspection.
    pub plugin: Arc<MockPlugin>,
    /// The notification bus.
    pub bus: NotificationBus,
    core_task: JoinHandle<()>,
}

impl CoreFixture {
    /// Build the stack on a memory store and start the control loop.
    ///
    /// # Panics
    ///
    /// Panics when fixture assembly fails.
    pub async fn start() -> Self {
        let catalogue = mock_catalogue();
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let bus = NotificationBus::new();
        let host = Arc::new(PluginHost::new());
        let plugin = Arc::new(MockPlugin::new());
        host.register_plugin(Arc::clone(&plugin) as _, Vec::new())
            .await
            .expect("mock plugin registers");
        let upstream_rx = host.take_upstream_receiver().expect("first take");

        let registry = ThingRegistry::new(
            catalogue,
            Arc::clone(&host),
            Arc::clone(&store),
            bus.clone(),
        );
        let engine = RuleEngine::new(store, bus.clone());
        let mut dispatcher = Dispatcher::new(registry, engine, host, upstream_rx, bus.clone());
        dispatcher.load().await.expect("load on empty store");
        let handle = dispatcher.handle();
        let core_task = tokio::spawn(dispatcher.run());

        Self {
            handle,
            plugin,
            bus,
            core_task,
        }
    }

    /// Add a virtual switch and wait for its setup to complete.
    ///
    /// # Panics
    ///
    /// Panics when the add fails or setup never completes.
    pub async fn add_switch(&self, name: &str) -> ThingId {
        let outcome = self
            .handle
            .add_thing(ids::VIRTUAL_SWITCH_CLASS_ID, name, Vec::new(), None)
            .await
            .expect("add switch");
        let AddThingOutcome::SetupStarted { thing_id } = outcome else {
            panic!("virtual switch is just-add");
        };
        self.wait_for_setup(thing_id, SetupStatus::Complete).await;
        thing_id
    }

    /// Poll until a thing reaches the given setup status.
    ///
    /// # Panics
    ///
    /// Panics on timeout.
    pub async fn wait_for_setup(&self, thing_id: ThingId, status: SetupStatus) {
        let reached = eventually(|| async {
            self.handle
                .things()
                .await
                .ok()
                .and_then(|things| things.into_iter().find(|t| t.id == thing_id))
                .is_some_and(|t| t.setup_status == status)
        })
        .await;
        assert!(reached, "thing {thing_id} never reached {status:?}");
    }

    /// Stop the control loop and join it.
    ///
    /// # Panics
    ///
    /// Panics when the core task panicked.
    pub async fn shutdown(self) {
        self.handle.shutdown();
        self.core_task.await.expect("core task joins");
    }
}

/// Poll a condition until it holds or the retry allowance runs out.
pub async fn eventually<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..500 {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

/// A fixed test instant: Tuesday 2026-03-10 at the given time.
#[must_use]
pub fn tuesday(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 10)
        .expect("valid date")
        .and_hms_opt(h, m, s)
        .expect("valid time")
}

/// The Saturday of the same week, 2026-03-14.
#[must_use]
pub fn saturday(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 14)
        .expect("valid date")
        .and_hms_opt(h, m, s)
        .expect("valid time")
}
