//! The single-task control loop.
//!
//! The dispatcher owns the thing registry and the rule engine outright — no
//! locks — and processes one inbound item to completion before the next:
//! plugin upstream messages (events, state changes, reply completions),
//! external commands, and clock ticks. Resulting actions are enqueued on
//! the plugin host, never awaited, preserving the total order of state
//! commits and rule firings.

use std::collections::HashMap;

use chrono::{Local, NaiveDateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use hearth_events::{Notification, NotificationBus};
use hearth_plugins::{
    PluginHost, ReplyCompletion, ReplyContext, ReplyId, ReplyStatus, ThingDescriptor,
    UpstreamMessage,
};
use hearth_rules::RuleEngine;
use hearth_things::ThingRegistry;
use hearth_types::{Action, Event, validate_params};

use std::sync::Arc;

use crate::command::CoreCommand;
use crate::error::{DispatcherError, DispatcherResult};
use crate::handle::DispatcherHandle;
use crate::snapshot::{RuleSnapshot, ThingSnapshot};

const LOG: &str = "dispatcher";

/// Who is waiting for an action completion.
#[derive(Debug)]
enum ActionOriginator {
    /// An external command holds the responder.
    Command(oneshot::Sender<DispatcherResult<ReplyStatus>>),
    /// The rule engine fired it; failures are logged.
    Rule,
}

/// The control loop owning registry and engine.
pub struct Dispatcher {
    registry: ThingRegistry,
    engine: RuleEngine,
    host: Arc<PluginHost>,
    bus: NotificationBus,
    upstream_rx: mpsc::UnboundedReceiver<UpstreamMessage>,
    command_tx: mpsc::UnboundedSender<CoreCommand>,
    command_rx: mpsc::UnboundedReceiver<CoreCommand>,
    pending_actions: HashMap<ReplyId, ActionOriginator>,
    pending_discoveries:
        HashMap<ReplyId, oneshot::Sender<DispatcherResult<Vec<ThingDescriptor>>>>,
    last_tick: Option<NaiveDateTime>,
}

impl Dispatcher {
    /// Assemble the dispatcher.
    ///
    /// `upstream_rx` is the receiver taken from the plugin host; the
    /// dispatcher is its only consumer.
    #[must_use]
    pub fn new(
        registry: ThingRegistry,
        engine: RuleEngine,
        host: Arc<PluginHost>,
        upstream_rx: mpsc::UnboundedReceiver<UpstreamMessage>,
        bus: NotificationBus,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        Self {
            registry,
            engine,
            host,
            bus,
            upstream_rx,
            command_tx,
            command_rx,
            pending_actions: HashMap::new(),
            pending_discoveries: HashMap::new(),
            last_tick: None,
        }
    }

    /// A handle external surfaces use to talk to the running loop.
    #[must_use]
    pub fn handle(&self) -> DispatcherHandle {
        DispatcherHandle::new(self.command_tx.clone())
    }

    /// Replay persisted things and rules, then start monitoring auto
    /// things.
    ///
    /// # Errors
    ///
    /// Propagates registry and engine load failures.
    pub async fn load(&mut self) -> DispatcherResult<()> {
        self.registry.load().await?;
        self.engine.load(&self.registry).await?;
        self.last_tick = self.engine.last_tick();
        self.host.start_monitoring_auto_things().await;
        Ok(())
    }

    /// Run the control loop until shutdown.
    pub async fn run(mut self) {
        info!(target: LOG, "dispatcher running");
        loop {
            tokio::select! {
                Some(message) = self.upstream_rx.recv() => {
                    self.handle_upstream(message).await;
                },
                command = self.command_rx.recv() => {
                    match command {
                        Some(CoreCommand::Shutdown) | None => break,
                        Some(command) => self.handle_command(command).await,
                    }
                },
            }
        }
        self.shutdown();
        info!(target: LOG, "dispatcher stopped");
    }

    /// The wall-clock instant rule evaluation sees: the last observed tick,
    /// or the system clock before the first tick arrived.
    fn now(&self) -> NaiveDateTime {
        self.last_tick
            .unwrap_or_else(|| Local::now().naive_local())
    }

    async fn handle_upstream(&mut self, message: UpstreamMessage) {
        match message {
            UpstreamMessage::ThingEvent(event) => self.handle_event(event).await,
            UpstreamMessage::StateChange {
                thing_id,
                state_type_id,
                value,
            } => {
                match self
                    .registry
                    .set_state_value(thing_id, state_type_id, value, Utc::now())
                    .await
                {
                    Ok(true) => {
                        let now = self.now();
                        let actions = self.engine.evaluate_state_change(&self.registry, now);
                        self.execute_rule_actions(actions).await;
                    },
                    Ok(false) => {},
                    Err(e) => {
                        warn!(target: LOG, thing = %thing_id, error = %e, "dropping state change");
                    },
                }
            },
            UpstreamMessage::AutoThingsAppeared {
                plugin_id,
                descriptors,
            } => {
                self.registry
                    .handle_auto_things(plugin_id, &descriptors)
                    .await;
                self.engine.revalidate_things(&self.registry);
            },
            UpstreamMessage::ReplyFinished(completion) => {
                self.handle_completion(completion).await;
            },
        }
    }

    async fn handle_event(&mut self, event: Event) {
        let known = self.registry.thing(event.thing_id).is_some_and(|thing| {
            self.registry
                .catalogue()
                .thing_class(thing.thing_class_id)
                .is_some_and(|class| class.event_type(event.event_type_id).is_some())
        });
        if !known {
            warn!(target: LOG, event = %event, "dropping event of unknown thing or type");
            return;
        }
        debug!(target: LOG, event = %event, "processing event");
        self.bus.publish(Notification::EventTriggered {
            event: event.clone(),
        });
        let now = self.now();
        let actions = self.engine.evaluate_event(&event, &self.registry, now);
        self.execute_rule_actions(actions).await;
    }

    async fn handle_completion(&mut self, completion: ReplyCompletion) {
        match completion.context {
            ReplyContext::Setup { thing_id } => {
                if let Err(e) = self
                    .registry
                    .handle_setup_finished(thing_id, completion.status)
                    .await
                {
                    warn!(target: LOG, thing = %thing_id, error = %e, "setup completion for unknown thing");
                }
            },
            ReplyContext::Pairing {
                transaction_id,
                confirm,
            } => match self
                .registry
                .handle_pairing_finished(transaction_id, confirm, completion.status)
                .await
            {
                Ok(Some(_)) => self.engine.revalidate_things(&self.registry),
                Ok(None) => {},
                Err(e) => {
                    warn!(target: LOG, transaction = %transaction_id, error = %e, "pairing completion failed");
                },
            },
            ReplyContext::Action { ref action } => {
                match self.pending_actions.remove(&completion.reply_id) {
                    Some(ActionOriginator::Command(respond)) => {
                        let _ = respond.send(Ok(completion.status));
                    },
                    Some(ActionOriginator::Rule) => {
                        if !completion.status.is_ok() {
                            warn!(
                                target: LOG,
                                action = %action,
                                status = ?completion.status,
                                "rule action failed"
                            );
                        }
                    },
                    None => {
                        debug!(target: LOG, reply = %completion.reply_id, "untracked action completion");
                    },
                }
            },
            ReplyContext::Discovery { thing_class_id } => {
                if let Some(respond) = self.pending_discoveries.remove(&completion.reply_id) {
                    let result = if completion.status.is_ok() {
                        Ok(completion.payload.descriptors)
                    } else {
                        Err(DispatcherError::Reply(completion.status))
                    };
                    let _ = respond.send(result);
                } else {
                    debug!(target: LOG, class = %thing_class_id, "untracked discovery completion");
                }
            },
            ReplyContext::Browse { thing_id } | ReplyContext::BrowserAction { thing_id } => {
                debug!(target: LOG, thing = %thing_id, status = ?completion.status, "browse completion");
            },
        }
    }

    #[allow(clippy::too_many_lines)]
    async fn handle_command(&mut self, command: CoreCommand) {
        match command {
            CoreCommand::AddThing {
                thing_class_id,
                name,
                params,
                parent_id,
                respond,
            } => {
                let result = self
                    .registry
                    .add_thing(thing_class_id, &name, &params, parent_id)
                    .await
                    .map_err(DispatcherError::from);
                if result.is_ok() {
                    self.engine.revalidate_things(&self.registry);
                }
                let _ = respond.send(result);
            },
            CoreCommand::ConfirmPairing {
                transaction_id,
                secret,
                respond,
            } => {
                let result = self
                    .registry
                    .confirm_pairing(transaction_id, secret)
                    .await
                    .map_err(DispatcherError::from);
                let _ = respond.send(result);
            },
            CoreCommand::ReconfigureThing {
                thing_id,
                params,
                respond,
            } => {
                let result = self
                    .registry
                    .reconfigure_thing(thing_id, &params)
                    .await
                    .map_err(DispatcherError::from);
                let _ = respond.send(result);
            },
            CoreCommand::RemoveThing {
                thing_id,
                policy,
                respond,
            } => {
                let _ = respond.send(self.remove_thing(thing_id, policy).await);
            },
            CoreCommand::ExecuteAction { action, respond } => {
                match self.dispatch_action(action).await {
                    Ok(reply_id) => {
                        self.pending_actions
                            .insert(reply_id, ActionOriginator::Command(respond));
                    },
                    Err(e) => {
                        let _ = respond.send(Err(e));
                    },
                }
            },
            CoreCommand::Discover {
                thing_class_id,
                params,
                respond,
            } => match self.host.discover(thing_class_id, params).await {
                Ok(reply_id) => {
                    self.pending_discoveries.insert(reply_id, respond);
                },
                Err(e) => {
                    let _ = respond.send(Err(e.into()));
                },
            },
            CoreCommand::AddDiscoveredThing {
                descriptor,
                respond,
            } => {
                let result = self
                    .registry
                    .add_thing_from_descriptor(&descriptor)
                    .await
                    .map_err(DispatcherError::from);
                if result.is_ok() {
                    self.engine.revalidate_things(&self.registry);
                }
                let _ = respond.send(result);
            },
            CoreCommand::AddRule { rule, respond } => {
                let result = self
                    .engine
                    .add_rule(*rule, &self.registry)
                    .await
                    .map_err(DispatcherError::from);
                let _ = respond.send(result);
            },
            CoreCommand::RemoveRule { rule_id, respond } => {
                let result = self
                    .engine
                    .remove_rule(rule_id)
                    .await
                    .map_err(DispatcherError::from);
                let _ = respond.send(result);
            },
            CoreCommand::EnableRule {
                rule_id,
                enabled,
                respond,
            } => {
                let result = self
                    .engine
                    .enable_rule(rule_id, enabled)
                    .await
                    .map_err(DispatcherError::from);
                let _ = respond.send(result);
            },
            CoreCommand::SetStateValue {
                thing_id,
                state_type_id,
                value,
                respond,
            } => {
                let result = self
                    .registry
                    .set_state_value(thing_id, state_type_id, value, Utc::now())
                    .await
                    .map_err(DispatcherError::from);
                if let Ok(true) = result {
                    let now = self.now();
                    let actions = self.engine.evaluate_state_change(&self.registry, now);
                    self.execute_rule_actions(actions).await;
                }
                let _ = respond.send(result);
            },
            CoreCommand::GetStateValue {
                thing_id,
                state_type_id,
                respond,
            } => {
                let value = self
                    .registry
                    .thing(thing_id)
                    .and_then(|t| t.state_value(state_type_id))
                    .cloned();
                let _ = respond.send(value);
            },
            CoreCommand::GetThings { respond } => {
                let mut snapshots: Vec<ThingSnapshot> =
                    self.registry.things().map(ThingSnapshot::from).collect();
                snapshots.sort_by_key(|s| s.id);
                let _ = respond.send(snapshots);
            },
            CoreCommand::GetRules { respond } => {
                let snapshots = self.engine.rules().iter().map(RuleSnapshot::from).collect();
                let _ = respond.send(snapshots);
            },
            CoreCommand::Tick(now) => {
                self.last_tick = Some(now);
                match self.engine.evaluate_time(now, &self.registry).await {
                    Ok(actions) => self.execute_rule_actions(actions).await,
                    Err(e) => warn!(target: LOG, error = %e, "tick evaluation failed"),
                }
            },
            CoreCommand::Shutdown => unreachable!("handled by the run loop"),
        }
    }

    /// Remove rules per policy first, then the thing (and its
    /// descendants): rule-removed notifications precede thing-removed.
    async fn remove_thing(
        &mut self,
        thing_id: hearth_types::ThingId,
        policy: hearth_rules::RemovePolicy,
    ) -> DispatcherResult<()> {
        if self.registry.thing(thing_id).is_none() {
            return Err(hearth_things::ThingError::NotFound(thing_id).into());
        }
        let mut targets = vec![thing_id];
        let mut frontier = vec![thing_id];
        while let Some(current) = frontier.pop() {
            for child in self.registry.find_by_parent(current) {
                targets.push(child.id);
                frontier.push(child.id);
            }
        }
        for target in targets {
            self.engine
                .remove_thing(target, policy, &self.registry)
                .await?;
        }
        self.registry.remove_thing(thing_id).await?;
        self.engine.revalidate_things(&self.registry);
        Ok(())
    }

    /// Validate and enqueue one externally requested action.
    async fn dispatch_action(&mut self, action: Action) -> DispatcherResult<ReplyId> {
        let thing = self
            .registry
            .thing(action.thing_id)
            .ok_or(hearth_things::ThingError::NotFound(action.thing_id))?;
        let action_type = self
            .registry
            .catalogue()
            .thing_class(thing.thing_class_id)
            .and_then(|class| class.action_type(action.action_type_id))
            .ok_or(hearth_rules::RuleError::ActionTypeNotFound(
                action.action_type_id,
            ))?;
        validate_params(&action_type.param_types, &action.params)
            .map_err(hearth_things::ThingError::Param)?;
        let info = thing.info();
        Ok(self.host.execute_action(info, action).await?)
    }

    /// Enqueue rule-resolved actions; completions route back as logged
    /// rule outcomes.
    async fn execute_rule_actions(&mut self, actions: Vec<Action>) {
        for action in actions {
            let Some(thing) = self.registry.thing(action.thing_id) else {
                warn!(target: LOG, action = %action, "rule action targets missing thing");
                continue;
            };
            let info = thing.info();
            match self.host.execute_action(info, action).await {
                Ok(reply_id) => {
                    self.pending_actions.insert(reply_id, ActionOriginator::Rule);
                },
                Err(e) => {
                    warn!(target: LOG, error = %e, "failed to enqueue rule action");
                },
            }
        }
    }

    /// Cancel outstanding plugin work and route the synthesized
    /// completions to their originators.
    fn shutdown(&mut self) {
        self.host.shutdown();
        while let Ok(message) = self.upstream_rx.try_recv() {
            if let UpstreamMessage::ReplyFinished(completion) = message {
                match self.pending_actions.remove(&completion.reply_id) {
                    Some(ActionOriginator::Command(respond)) => {
                        let _ = respond.send(Ok(completion.status));
                    },
                    _ => {
                        if let Some(respond) =
                            self.pending_discoveries.remove(&completion.reply_id)
                        {
                            let _ = respond.send(Err(DispatcherError::Reply(completion.status)));
                        }
                    },
                }
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pending_actions", &self.pending_actions.len())
            .field("last_tick", &self.last_tick)
            .finish_non_exhaustive()
    }
}
