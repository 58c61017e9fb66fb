//! The handle external surfaces use to talk to the dispatcher.

use chrono::NaiveDateTime;
use tokio::sync::{mpsc, oneshot};

use hearth_plugins::{ReplyStatus, ThingDescriptor};
use hearth_rules::{RemovePolicy, Rule};
use hearth_things::AddThingOutcome;
use hearth_types::{
    Action, PairingTransactionId, Param, RuleId, StateTypeId, ThingClassId, ThingId, Value,
};

use crate::command::CoreCommand;
use crate::error::{DispatcherError, DispatcherResult};
use crate::snapshot::{RuleSnapshot, ThingSnapshot};

/// Cloneable sender into the dispatcher's command channel.
///
/// Every method enqueues a command and awaits the dispatcher's answer;
/// ordering between callers follows the channel's receive order.
#[derive(Debug, Clone)]
pub struct DispatcherHandle {
    tx: mpsc::UnboundedSender<CoreCommand>,
}

impl DispatcherHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<CoreCommand>) -> Self {
        Self { tx }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> CoreCommand,
    ) -> DispatcherResult<T> {
        let (respond, rx) = oneshot::channel();
        self.tx
            .send(build(respond))
            .map_err(|_| DispatcherError::CoreStopped)?;
        rx.await.map_err(|_| DispatcherError::CoreStopped)
    }

    /// Add a configured thing (or open a pairing flow).
    ///
    /// # Errors
    ///
    /// Registry validation failures, or [`DispatcherError::CoreStopped`].
    pub async fn add_thing(
        &self,
        thing_class_id: ThingClassId,
        name: impl Into<String>,
        params: Vec<Param>,
        parent_id: Option<ThingId>,
    ) -> DispatcherResult<AddThingOutcome> {
        let name = name.into();
        self.request(|respond| CoreCommand::AddThing {
            thing_class_id,
            name,
            params,
            parent_id,
            respond,
        })
        .await?
    }

    /// Confirm an in-flight pairing.
    ///
    /// # Errors
    ///
    /// Unknown transactions, or [`DispatcherError::CoreStopped`].
    pub async fn confirm_pairing(
        &self,
        transaction_id: PairingTransactionId,
        secret: Option<String>,
    ) -> DispatcherResult<()> {
        self.request(|respond| CoreCommand::ConfirmPairing {
            transaction_id,
            secret,
            respond,
        })
        .await?
    }

    /// Re-run a thing's setup with new params.
    ///
    /// # Errors
    ///
    /// Registry validation failures, or [`DispatcherError::CoreStopped`].
    pub async fn reconfigure_thing(
        &self,
        thing_id: ThingId,
        params: Vec<Param>,
    ) -> DispatcherResult<()> {
        self.request(|respond| CoreCommand::ReconfigureThing {
            thing_id,
            params,
            respond,
        })
        .await?
    }

    /// Remove a thing, applying the policy to referencing rules first.
    ///
    /// # Errors
    ///
    /// Unknown things, or [`DispatcherError::CoreStopped`].
    pub async fn remove_thing(
        &self,
        thing_id: ThingId,
        policy: RemovePolicy,
    ) -> DispatcherResult<()> {
        self.request(|respond| CoreCommand::RemoveThing {
            thing_id,
            policy,
            respond,
        })
        .await?
    }

    /// Execute an action and await its completion status.
    ///
    /// # Errors
    ///
    /// Synchronous validation failures; the async completion status itself
    /// arrives in the `Ok` value.
    pub async fn execute_action(&self, action: Action) -> DispatcherResult<ReplyStatus> {
        self.request(|respond| CoreCommand::ExecuteAction { action, respond })
            .await?
    }

    /// Run a discovery and await the found candidates.
    ///
    /// # Errors
    ///
    /// Unserved classes, failed or timed-out runs.
    pub async fn discover(
        &self,
        thing_class_id: ThingClassId,
        params: Vec<Param>,
    ) -> DispatcherResult<Vec<ThingDescriptor>> {
        self.request(|respond| CoreCommand::Discover {
            thing_class_id,
            params,
            respond,
        })
        .await?
    }

    /// Materialize a previously discovered descriptor.
    ///
    /// # Errors
    ///
    /// Registry validation failures, or [`DispatcherError::CoreStopped`].
    pub async fn add_discovered_thing(
        &self,
        descriptor: ThingDescriptor,
    ) -> DispatcherResult<ThingId> {
        self.request(|respond| CoreCommand::AddDiscoveredThing {
            descriptor,
            respond,
        })
        .await?
    }

    /// Add a rule.
    ///
    /// # Errors
    ///
    /// Rule validation failures, or [`DispatcherError::CoreStopped`].
    pub async fn add_rule(&self, rule: Rule) -> DispatcherResult<RuleId> {
        self.request(|respond| CoreCommand::AddRule {
            rule: Box::new(rule),
            respond,
        })
        .await?
    }

    /// Remove a rule.
    ///
    /// # Errors
    ///
    /// Unknown rules, or [`DispatcherError::CoreStopped`].
    pub async fn remove_rule(&self, rule_id: RuleId) -> DispatcherResult<()> {
        self.request(|respond| CoreCommand::RemoveRule { rule_id, respond })
            .await?
    }

    /// Enable or disable a rule.
    ///
    /// # Errors
    ///
    /// Unknown rules, or [`DispatcherError::CoreStopped`].
    pub async fn enable_rule(&self, rule_id: RuleId, enabled: bool) -> DispatcherResult<()> {
        self.request(|respond| CoreCommand::EnableRule {
            rule_id,
            enabled,
            respond,
        })
        .await?
    }

    /// Write a state value; returns whether a change was committed.
    ///
    /// # Errors
    ///
    /// Validation failures, or [`DispatcherError::CoreStopped`].
    pub async fn set_state_value(
        &self,
        thing_id: ThingId,
        state_type_id: StateTypeId,
        value: Value,
    ) -> DispatcherResult<bool> {
        self.request(|respond| CoreCommand::SetStateValue {
            thing_id,
            state_type_id,
            value,
            respond,
        })
        .await?
    }

    /// Read a state value; `None` when the thing or state is unknown.
    ///
    /// # Errors
    ///
    /// [`DispatcherError::CoreStopped`].
    pub async fn get_state_value(
        &self,
        thing_id: ThingId,
        state_type_id: StateTypeId,
    ) -> DispatcherResult<Option<Value>> {
        self.request(|respond| CoreCommand::GetStateValue {
            thing_id,
            state_type_id,
            respond,
        })
        .await
    }

    /// Snapshot all configured things.
    ///
    /// # Errors
    ///
    /// [`DispatcherError::CoreStopped`].
    pub async fn things(&self) -> DispatcherResult<Vec<ThingSnapshot>> {
        self.request(|respond| CoreCommand::GetThings { respond })
            .await
    }

    /// Snapshot all rules.
    ///
    /// # Errors
    ///
    /// [`DispatcherError::CoreStopped`].
    pub async fn rules(&self) -> DispatcherResult<Vec<RuleSnapshot>> {
        self.request(|respond| CoreCommand::GetRules { respond })
            .await
    }

    /// Inject a clock tick (the 1 Hz source, or a test).
    pub fn inject_tick(&self, now: NaiveDateTime) {
        let _ = self.tx.send(CoreCommand::Tick(now));
    }

    /// Ask the control loop to stop.
    pub fn shutdown(&self) {
        let _ = self.tx.send(CoreCommand::Shutdown);
    }
}
