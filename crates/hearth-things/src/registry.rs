//! The thing registry.
//!
//! Sole owner of every configured [`Thing`]: creation (direct or via a
//! pairing flow), reconfiguration, removal, state-value writes with change
//! detection, and persistence. Setup runs asynchronously through the plugin
//! host; the dispatcher routes the completions back into
//! [`ThingRegistry::handle_setup_finished`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use hearth_events::{Notification, NotificationBus};
use hearth_plugins::{PluginHost, ReplyStatus, ThingDescriptor};
use hearth_storage::{Store, list_records, namespaces, put_record};
use hearth_types::{
    CreateMethod, PairingTransactionId, Param, PluginId, SetupMethod, SetupStatus, StateTypeId,
    StateValueFilter, ThingClass, ThingClassId, ThingId, TypeCatalogue, Value, normalize_params,
};

use crate::error::{ThingError, ThingResult};
use crate::thing::Thing;

const LOG: &str = "thing_registry";

/// Differing writes that bounce back to the prior value inside this window
/// are coalesced for states with the adjacent filter.
const ADJACENT_COALESCE_SECS: i64 = 2;

/// What `add_thing` kicked off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddThingOutcome {
    /// The thing exists and its setup is running.
    SetupStarted {
        /// The new thing.
        thing_id: ThingId,
    },
    /// The class needs pairing; confirmation is a second call.
    PairingStarted {
        /// Handle for the confirmation step.
        transaction_id: PairingTransactionId,
        /// The interaction style the user must complete.
        setup_method: SetupMethod,
    },
}

/// An in-flight pairing flow.
#[derive(Debug, Clone)]
struct PairingTransaction {
    thing_class_id: ThingClassId,
    name: String,
    params: Vec<Param>,
    parent_id: Option<ThingId>,
}

/// The persisted shape of one thing.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThingRecord {
    id: ThingId,
    thing_class_id: ThingClassId,
    plugin_id: PluginId,
    name: String,
    params: Vec<Param>,
    settings: Vec<Param>,
    #[serde(default)]
    parent_id: Option<ThingId>,
    #[serde(default)]
    cached_states: HashMap<StateTypeId, Value>,
}

/// Owns all configured things.
pub struct ThingRegistry {
    catalogue: Arc<TypeCatalogue>,
    host: Arc<PluginHost>,
    store: Arc<dyn Store>,
    bus: NotificationBus,
    things: HashMap<ThingId, Thing>,
    pairings: HashMap<PairingTransactionId, PairingTransaction>,
}

impl ThingRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(
        catalogue: Arc<TypeCatalogue>,
        host: Arc<PluginHost>,
        store: Arc<dyn Store>,
        bus: NotificationBus,
    ) -> Self {
        Self {
            catalogue,
            host,
            store,
            bus,
            things: HashMap::new(),
            pairings: HashMap::new(),
        }
    }

    /// Replay the store and re-dispatch setup for every loaded thing.
    ///
    /// Cached state values are restored before setup runs; non-cached states
    /// reset to their defaults.
    ///
    /// # Errors
    ///
    /// Propagates store failures. Records referencing classes the catalogue
    /// no longer knows are skipped with a warning.
    pub async fn load(&mut self) -> ThingResult<()> {
        let records: Vec<(String, ThingRecord)> =
            list_records(self.store.as_ref(), namespaces::THINGS).await?;
        for (_, record) in records {
            let Some(class) = self.catalogue.thing_class(record.thing_class_id) else {
                warn!(
                    target: LOG,
                    thing = %record.id,
                    class = %record.thing_class_id,
                    "skipping stored thing of unknown class"
                );
                continue;
            };

            let mut thing = Thing::new(
                record.id,
                record.thing_class_id,
                record.plugin_id,
                record.name,
                record.params,
            );
            thing.settings = record.settings;
            thing.parent_id = record.parent_id;
            for st in &class.state_types {
                let value = if st.cached {
                    record
                        .cached_states
                        .get(&st.id)
                        .cloned()
                        .unwrap_or_else(|| st.default_value.clone())
                } else {
                    st.default_value.clone()
                };
                thing.init_state(st.id, value);
            }

            info!(target: LOG, thing = %thing.id, name = %thing.name, "loaded thing");
            self.dispatch_setup(thing, false).await?;
        }
        Ok(())
    }

    /// Add a configured thing.
    ///
    /// Validates the params against the class schema. A `JustAdd` class gets
    /// created and set up immediately; any other setup method opens a
    /// pairing flow whose confirmation is [`ThingRegistry::confirm_pairing`].
    ///
    /// # Errors
    ///
    /// Synchronous failures: unknown class or parent, param validation.
    pub async fn add_thing(
        &mut self,
        thing_class_id: ThingClassId,
        name: &str,
        params: &[Param],
        parent_id: Option<ThingId>,
    ) -> ThingResult<AddThingOutcome> {
        let class = self
            .catalogue
            .thing_class(thing_class_id)
            .ok_or(ThingError::ClassNotFound(thing_class_id))?
            .clone();
        if let Some(parent) = parent_id
            && !self.things.contains_key(&parent)
        {
            return Err(ThingError::ParentNotFound(parent));
        }
        let normalized = normalize_params(&class.param_types, params)?;

        if class.setup_method == SetupMethod::JustAdd {
            let thing_id = self
                .create_thing(&class, ThingId::new(), name, normalized, parent_id)
                .await?;
            return Ok(AddThingOutcome::SetupStarted { thing_id });
        }

        let transaction_id = PairingTransactionId::new();
        self.pairings.insert(
            transaction_id,
            PairingTransaction {
                thing_class_id,
                name: name.to_string(),
                params: normalized.clone(),
                parent_id,
            },
        );
        self.host
            .start_pairing(
                transaction_id,
                thing_class_id,
                name,
                normalized,
                class.setup_method,
            )
            .await?;
        debug!(target: LOG, transaction = %transaction_id, "pairing started");
        Ok(AddThingOutcome::PairingStarted {
            transaction_id,
            setup_method: class.setup_method,
        })
    }

    /// Confirm an in-flight pairing with the user's secret.
    ///
    /// # Errors
    ///
    /// [`ThingError::PairingNotFound`] for an unknown transaction.
    pub async fn confirm_pairing(
        &mut self,
        transaction_id: PairingTransactionId,
        secret: Option<String>,
    ) -> ThingResult<()> {
        let transaction = self
            .pairings
            .get(&transaction_id)
            .ok_or(ThingError::PairingNotFound(transaction_id))?
            .clone();
        let class = self
            .catalogue
            .thing_class(transaction.thing_class_id)
            .ok_or(ThingError::ClassNotFound(transaction.thing_class_id))?;
        self.host
            .confirm_pairing(
                transaction_id,
                transaction.thing_class_id,
                &transaction.name,
                transaction.params,
                class.setup_method,
                secret,
            )
            .await?;
        Ok(())
    }

    /// Route a pairing reply back into the flow.
    ///
    /// On a successful confirmation the thing is created and its setup
    /// dispatched; the created id is returned.
    ///
    /// # Errors
    ///
    /// Propagates creation failures on the confirm step.
    pub async fn handle_pairing_finished(
        &mut self,
        transaction_id: PairingTransactionId,
        confirm: bool,
        status: ReplyStatus,
    ) -> ThingResult<Option<ThingId>> {
        if !confirm {
            // The opening step: on success the transaction stays open
            // awaiting the user; on failure it dies.
            if !status.is_ok() {
                self.pairings.remove(&transaction_id);
                warn!(target: LOG, transaction = %transaction_id, ?status, "pairing failed to start");
            }
            return Ok(None);
        }

        let Some(transaction) = self.pairings.remove(&transaction_id) else {
            return Err(ThingError::PairingNotFound(transaction_id));
        };
        if !status.is_ok() {
            warn!(target: LOG, transaction = %transaction_id, ?status, "pairing confirmation failed");
            return Ok(None);
        }
        let class = self
            .catalogue
            .thing_class(transaction.thing_class_id)
            .ok_or(ThingError::ClassNotFound(transaction.thing_class_id))?
            .clone();
        let thing_id = self
            .create_thing(
                &class,
                ThingId::new(),
                &transaction.name,
                transaction.params,
                transaction.parent_id,
            )
            .await?;
        Ok(Some(thing_id))
    }

    /// Route a setup completion back onto the thing.
    ///
    /// # Errors
    ///
    /// [`ThingError::NotFound`] when the thing vanished meanwhile.
    pub async fn handle_setup_finished(
        &mut self,
        thing_id: ThingId,
        status: ReplyStatus,
    ) -> ThingResult<()> {
        let thing = self
            .things
            .get_mut(&thing_id)
            .ok_or(ThingError::NotFound(thing_id))?;
        let new_status = if status.is_ok() {
            SetupStatus::Complete
        } else {
            SetupStatus::Failed
        };
        thing.setup_status = new_status;
        let plugin_id = thing.plugin_id;
        info!(target: LOG, thing = %thing_id, status = ?new_status, "thing setup finished");
        self.bus.publish(Notification::ThingSetupStatusChanged {
            thing_id,
            status: new_status,
        });
        if new_status == SetupStatus::Complete {
            self.host.post_setup_thing(plugin_id, thing_id).await;
        }
        Ok(())
    }

    /// Re-run setup with new params.
    ///
    /// Read-only params must keep their values.
    ///
    /// # Errors
    ///
    /// Synchronous failures: unknown thing, param validation, read-only
    /// violations.
    pub async fn reconfigure_thing(
        &mut self,
        thing_id: ThingId,
        params: &[Param],
    ) -> ThingResult<()> {
        let thing = self
            .things
            .get(&thing_id)
            .ok_or(ThingError::NotFound(thing_id))?;
        let class = self
            .catalogue
            .thing_class(thing.thing_class_id)
            .ok_or(ThingError::ClassNotFound(thing.thing_class_id))?
            .clone();
        let normalized = normalize_params(&class.param_types, params)?;

        for pt in class.param_types.iter().filter(|pt| pt.read_only) {
            let old = hearth_types::param_value(&thing.params, pt.id);
            let new = hearth_types::param_value(&normalized, pt.id);
            if old != new {
                return Err(ThingError::ReadOnlyParam(pt.name.clone()));
            }
        }

        let thing = self
            .things
            .get_mut(&thing_id)
            .ok_or(ThingError::NotFound(thing_id))?;
        thing.params = normalized;
        let thing = thing.clone();
        self.persist_thing(&thing, &class).await?;
        self.bus.publish(Notification::ThingChanged { thing_id });
        self.begin_setup(thing_id, true).await
    }

    /// Change a thing's settings without re-running setup.
    ///
    /// # Errors
    ///
    /// Synchronous failures: unknown thing, settings validation.
    pub async fn update_settings(&mut self, thing_id: ThingId, settings: &[Param]) -> ThingResult<()> {
        let thing = self
            .things
            .get(&thing_id)
            .ok_or(ThingError::NotFound(thing_id))?;
        let class = self
            .catalogue
            .thing_class(thing.thing_class_id)
            .ok_or(ThingError::ClassNotFound(thing.thing_class_id))?
            .clone();
        let normalized = normalize_params(&class.settings_types, settings)?;
        let thing = self
            .things
            .get_mut(&thing_id)
            .ok_or(ThingError::NotFound(thing_id))?;
        thing.settings = normalized;
        let thing = thing.clone();
        self.persist_thing(&thing, &class).await?;
        self.bus.publish(Notification::ThingChanged { thing_id });
        Ok(())
    }

    /// Rename a thing.
    ///
    /// # Errors
    ///
    /// [`ThingError::NotFound`] for an unknown thing.
    pub async fn set_thing_name(&mut self, thing_id: ThingId, name: &str) -> ThingResult<()> {
        let thing = self
            .things
            .get_mut(&thing_id)
            .ok_or(ThingError::NotFound(thing_id))?;
        thing.name = name.to_string();
        let class = self
            .catalogue
            .thing_class(thing.thing_class_id)
            .ok_or(ThingError::ClassNotFound(thing.thing_class_id))?
            .clone();
        let thing = thing.clone();
        self.persist_thing(&thing, &class).await?;
        self.bus.publish(Notification::ThingChanged { thing_id });
        Ok(())
    }

    /// Remove a thing and its descendants.
    ///
    /// Children are removed before their parent; each removal notifies the
    /// plugin and publishes `ThingRemoved`. Rule cleanup is the dispatcher's
    /// job and happens before this call.
    ///
    /// # Errors
    ///
    /// [`ThingError::NotFound`] for an unknown thing.
    pub async fn remove_thing(&mut self, thing_id: ThingId) -> ThingResult<Vec<ThingId>> {
        if !self.things.contains_key(&thing_id) {
            return Err(ThingError::NotFound(thing_id));
        }
        let mut to_remove = self.descendants_of(thing_id);
        to_remove.push(thing_id);

        for id in &to_remove {
            if let Some(thing) = self.things.remove(id) {
                self.store
                    .remove(namespaces::THINGS, &id.to_string())
                    .await?;
                self.host.thing_removed(thing.plugin_id, *id).await;
                info!(target: LOG, thing = %id, name = %thing.name, "removed thing");
                self.bus.publish(Notification::ThingRemoved { thing_id: *id });
            }
        }
        Ok(to_remove)
    }

    /// Write a state value.
    ///
    /// Validates against the state schema, applies the state's change
    /// filter and dead band, and returns whether a change was committed.
    /// Equal writes commit nothing and emit nothing.
    ///
    /// # Errors
    ///
    /// Synchronous failures: unknown thing or state, value validation.
    pub async fn set_state_value(
        &mut self,
        thing_id: ThingId,
        state_type_id: StateTypeId,
        value: Value,
        timestamp: DateTime<Utc>,
    ) -> ThingResult<bool> {
        let thing = self
            .things
            .get(&thing_id)
            .ok_or(ThingError::NotFound(thing_id))?;
        let class = self
            .catalogue
            .thing_class(thing.thing_class_id)
            .ok_or(ThingError::ClassNotFound(thing.thing_class_id))?;
        let state_type = class
            .state_type(state_type_id)
            .ok_or(ThingError::StateNotFound(state_type_id))?
            .clone();
        state_type.validate(&value)?;

        let Some(current) = thing.state(state_type_id) else {
            return Err(ThingError::StateNotFound(state_type_id));
        };
        if current.value == value {
            return Ok(false);
        }
        if let (Some(band), Some(old), Some(new)) = (
            state_type.dead_band,
            current.value.as_f64(),
            value.as_f64(),
        ) && (new - old).abs() <= band
        {
            return Ok(false);
        }

        // The adjacent filter coalesces a flap straight back to the prior
        // value: the write lands, but no change is announced.
        let coalesce = state_type.filter == StateValueFilter::Adjacent
            && thing.previous_state_value(state_type_id) == Some(&value)
            && timestamp - current.timestamp <= Duration::seconds(ADJACENT_COALESCE_SECS);

        let class = class.clone();
        let thing = self
            .things
            .get_mut(&thing_id)
            .ok_or(ThingError::NotFound(thing_id))?;
        let Some(old_value) = thing.write_state(state_type_id, value.clone(), timestamp) else {
            return Err(ThingError::StateNotFound(state_type_id));
        };
        let thing = thing.clone();
        if state_type.cached {
            self.persist_thing(&thing, &class).await?;
        }
        if coalesce {
            debug!(target: LOG, thing = %thing_id, state = %state_type_id, "coalesced adjacent state flap");
            return Ok(false);
        }
        self.bus.publish(Notification::ThingStateChanged {
            thing_id,
            state_type_id,
            old_value,
            new_value: value,
            timestamp,
        });
        Ok(true)
    }

    /// Create a thing straight from a plugin-provided descriptor (discovery
    /// results, auto things). An already-present descriptor id is a no-op.
    ///
    /// # Errors
    ///
    /// Synchronous failures: unknown class, param validation.
    pub async fn add_thing_from_descriptor(
        &mut self,
        descriptor: &ThingDescriptor,
    ) -> ThingResult<ThingId> {
        if self.things.contains_key(&descriptor.thing_id) {
            return Ok(descriptor.thing_id);
        }
        let class = self
            .catalogue
            .thing_class(descriptor.thing_class_id)
            .ok_or(ThingError::ClassNotFound(descriptor.thing_class_id))?
            .clone();
        let normalized = normalize_params(&class.param_types, &descriptor.params)?;
        self.create_thing(
            &class,
            descriptor.thing_id,
            &descriptor.title,
            normalized,
            descriptor.parent_id,
        )
        .await
    }

    /// Materialize auto things a plugin announced.
    pub async fn handle_auto_things(
        &mut self,
        plugin_id: PluginId,
        descriptors: &[ThingDescriptor],
    ) {
        for descriptor in descriptors {
            let Some(class) = self.catalogue.thing_class(descriptor.thing_class_id) else {
                warn!(target: LOG, plugin = %plugin_id, "auto thing of unknown class");
                continue;
            };
            if !class.supports_create_method(CreateMethod::Auto) {
                warn!(
                    target: LOG,
                    plugin = %plugin_id,
                    class = %class.name,
                    "plugin announced auto thing for a non-auto class"
                );
                continue;
            }
            if let Err(e) = self.add_thing_from_descriptor(descriptor).await {
                warn!(target: LOG, plugin = %plugin_id, error = %e, "failed to add auto thing");
            }
        }
    }

    /// Look up a thing.
    #[must_use]
    pub fn thing(&self, thing_id: ThingId) -> Option<&Thing> {
        self.things.get(&thing_id)
    }

    /// All configured things.
    pub fn things(&self) -> impl Iterator<Item = &Thing> {
        self.things.values()
    }

    /// All things of a class.
    #[must_use]
    pub fn find_configured_things(&self, thing_class_id: ThingClassId) -> Vec<&Thing> {
        self.things
            .values()
            .filter(|t| t.thing_class_id == thing_class_id)
            .collect()
    }

    /// All direct children of a thing.
    #[must_use]
    pub fn find_by_parent(&self, parent_id: ThingId) -> Vec<&Thing> {
        self.things
            .values()
            .filter(|t| t.parent_id == Some(parent_id))
            .collect()
    }

    /// All things whose class implements the named interface.
    #[must_use]
    pub fn find_by_interface(&self, interface: &str) -> Vec<&Thing> {
        self.things
            .values()
            .filter(|t| {
                self.catalogue
                    .thing_class(t.thing_class_id)
                    .is_some_and(|c| c.implements(interface))
            })
            .collect()
    }

    /// The catalogue this registry validates against.
    #[must_use]
    pub fn catalogue(&self) -> &Arc<TypeCatalogue> {
        &self.catalogue
    }

    async fn create_thing(
        &mut self,
        class: &ThingClass,
        thing_id: ThingId,
        name: &str,
        params: Vec<Param>,
        parent_id: Option<ThingId>,
    ) -> ThingResult<ThingId> {
        let mut thing = Thing::new(thing_id, class.id, class.plugin_id, name, params);
        thing.parent_id = parent_id;
        for st in &class.state_types {
            thing.init_state(st.id, st.default_value.clone());
        }
        self.persist_thing(&thing, class).await?;
        info!(target: LOG, thing = %thing_id, name, class = %class.name, "added thing");
        self.bus.publish(Notification::ThingAdded { thing_id });
        self.dispatch_setup(thing, false).await?;
        Ok(thing_id)
    }

    /// Insert the thing and kick its setup off.
    async fn dispatch_setup(&mut self, mut thing: Thing, reconfigure: bool) -> ThingResult<()> {
        thing.setup_status = SetupStatus::InProgress;
        let info = thing.info();
        let thing_id = thing.id;
        self.things.insert(thing_id, thing);
        self.bus.publish(Notification::ThingSetupStatusChanged {
            thing_id,
            status: SetupStatus::InProgress,
        });
        self.host.setup_thing(info, reconfigure).await?;
        Ok(())
    }

    async fn begin_setup(&mut self, thing_id: ThingId, reconfigure: bool) -> ThingResult<()> {
        let thing = self
            .things
            .get_mut(&thing_id)
            .ok_or(ThingError::NotFound(thing_id))?;
        thing.setup_status = SetupStatus::InProgress;
        let info = thing.info();
        self.bus.publish(Notification::ThingSetupStatusChanged {
            thing_id,
            status: SetupStatus::InProgress,
        });
        self.host.setup_thing(info, reconfigure).await?;
        Ok(())
    }

    async fn persist_thing(&self, thing: &Thing, class: &ThingClass) -> ThingResult<()> {
        let cached_states = class
            .state_types
            .iter()
            .filter(|st| st.cached)
            .filter_map(|st| thing.state_value(st.id).map(|v| (st.id, v.clone())))
            .collect();
        let record = ThingRecord {
            id: thing.id,
            thing_class_id: thing.thing_class_id,
            plugin_id: thing.plugin_id,
            name: thing.name.clone(),
            params: thing.params.clone(),
            settings: thing.settings.clone(),
            parent_id: thing.parent_id,
            cached_states,
        };
        put_record(
            self.store.as_ref(),
            namespaces::THINGS,
            &thing.id.to_string(),
            &record,
        )
        .await?;
        Ok(())
    }

    fn descendants_of(&self, thing_id: ThingId) -> Vec<ThingId> {
        let mut result = Vec::new();
        let mut frontier = vec![thing_id];
        while let Some(current) = frontier.pop() {
            for child in self.things.values().filter(|t| t.parent_id == Some(current)) {
                frontier.push(child.id);
                result.push(child.id);
            }
        }
        // Deepest first so children go before parents.
        result.reverse();
        result
    }
}

impl std::fmt::Debug for ThingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThingRegistry")
            .field("things", &self.things.len())
            .field("pairings", &self.pairings.len())
            .finish_non_exhaustive()
    }
}
