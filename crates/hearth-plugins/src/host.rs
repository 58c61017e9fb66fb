//! The plugin host.
//!
//! Owns the loaded plugins, issues reply objects for every asynchronous
//! operation, and guards each outstanding reply with a watchdog. Completions
//! — whether the plugin finished, the watchdog fired, or shutdown cancelled
//! — travel as [`UpstreamMessage::ReplyFinished`] on the channel the
//! dispatcher drains.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{info, warn};

use hearth_types::{
    Action, PairingTransactionId, Param, PluginId, SetupMethod, ThingClassId, ThingId,
};

use crate::error::{PluginError, PluginResult};
use crate::hardware::HardwareManager;
use crate::info::{
    ActionInfo, BrowseResult, BrowserActionInfo, DiscoverInfo, PairInfo, ThingInfo,
    ThingSetupInfo,
};
use crate::message::UpstreamMessage;
use crate::plugin::{HearthPlugin, PluginContext};
use crate::reply::{ReplyContext, ReplyCore, ReplyId, ReplyKind, ReplyStatus};

const LOG: &str = "plugin_host";

/// Watchdog deadlines per operation family.
#[derive(Debug, Clone, Copy)]
pub struct HostTimeouts {
    /// Setup, pairing, and discovery runs.
    pub setup: Duration,
    /// Action and browse executions.
    pub action: Duration,
}

impl Default for HostTimeouts {
    fn default() -> Self {
        Self {
            setup: Duration::from_secs(30),
            action: Duration::from_secs(45),
        }
    }
}

/// Owns loaded plugins and routes typed operations to them.
pub struct PluginHost {
    plugins: DashMap<PluginId, Arc<dyn HearthPlugin>>,
    class_owner: DashMap<ThingClassId, PluginId>,
    pending: Arc<DashMap<ReplyId, Arc<ReplyCore>>>,
    upstream_tx: mpsc::UnboundedSender<UpstreamMessage>,
    upstream_rx: std::sync::Mutex<Option<mpsc::UnboundedReceiver<UpstreamMessage>>>,
    hardware: Arc<HardwareManager>,
    timeouts: HostTimeouts,
    accepting: AtomicBool,
}

impl PluginHost {
    /// Create a host with default timeouts.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeouts(HostTimeouts::default())
    }

    /// Create a host with explicit timeouts.
    #[must_use]
    pub fn with_timeouts(timeouts: HostTimeouts) -> Self {
        let (upstream_tx, upstream_rx) = mpsc::unbounded_channel();
        Self {
            plugins: DashMap::new(),
            class_owner: DashMap::new(),
            pending: Arc::new(DashMap::new()),
            upstream_tx,
            upstream_rx: std::sync::Mutex::new(Some(upstream_rx)),
            hardware: Arc::new(HardwareManager::new()),
            timeouts,
            accepting: AtomicBool::new(true),
        }
    }

    /// Take the upstream receiver the dispatcher drains.
    ///
    /// Returns `Some` exactly once.
    #[must_use]
    pub fn take_upstream_receiver(&self) -> Option<mpsc::UnboundedReceiver<UpstreamMessage>> {
        self.upstream_rx.lock().ok()?.take()
    }

    /// A sender plugins and tests can push upstream messages through.
    #[must_use]
    pub fn upstream_sender(&self) -> mpsc::UnboundedSender<UpstreamMessage> {
        self.upstream_tx.clone()
    }

    /// The shared hardware resources.
    #[must_use]
    pub fn hardware(&self) -> &Arc<HardwareManager> {
        &self.hardware
    }

    /// Register a plugin and initialize it with its configuration.
    ///
    /// # Errors
    ///
    /// [`PluginError::AlreadyRegistered`] on a duplicate id,
    /// [`PluginError::InitFailed`] when the plugin's `init` errors.
    pub async fn register_plugin(
        &self,
        plugin: Arc<dyn HearthPlugin>,
        config: Vec<Param>,
    ) -> PluginResult<()> {
        let metadata = plugin.metadata();
        let plugin_id = metadata.id;
        if self.plugins.contains_key(&plugin_id) {
            return Err(PluginError::AlreadyRegistered(plugin_id));
        }

        self.hardware.declare(plugin_id, plugin.required_resources());
        let context = PluginContext::new(
            plugin_id,
            config,
            self.upstream_tx.clone(),
            Arc::clone(&self.hardware),
        );
        if let Err(e) = plugin.init(context).await {
            self.hardware.release(plugin_id);
            return Err(PluginError::InitFailed {
                plugin_id,
                reason: e.to_string(),
            });
        }

        for vendor in &metadata.vendors {
            for class in &vendor.thing_classes {
                self.class_owner.insert(class.id, plugin_id);
            }
        }
        info!(target: LOG, plugin = %metadata.name, id = %plugin_id, "registered plugin");
        self.plugins.insert(plugin_id, plugin);
        Ok(())
    }

    /// Look up a registered plugin.
    #[must_use]
    pub fn plugin(&self, plugin_id: PluginId) -> Option<Arc<dyn HearthPlugin>> {
        self.plugins.get(&plugin_id).map(|p| Arc::clone(&p))
    }

    /// The plugin serving a thing class.
    #[must_use]
    pub fn plugin_for_class(&self, thing_class_id: ThingClassId) -> Option<PluginId> {
        self.class_owner.get(&thing_class_id).map(|p| *p)
    }

    /// Number of replies still awaiting completion.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Kick `start_monitoring_auto_things` on every registered plugin.
    pub async fn start_monitoring_auto_things(&self) {
        let plugins: Vec<_> = self.plugins.iter().map(|p| Arc::clone(&p)).collect();
        for plugin in plugins {
            plugin.start_monitoring_auto_things().await;
        }
    }

    /// Dispatch `setup_thing` to the owning plugin.
    ///
    /// # Errors
    ///
    /// Synchronous failures only: unknown plugin or a shutting-down host.
    pub async fn setup_thing(&self, thing: ThingInfo, reconfigure: bool) -> PluginResult<ReplyId> {
        let plugin = self
            .plugin(thing.plugin_id)
            .ok_or(PluginError::NotFound(thing.plugin_id))?;
        let core = self.issue(
            thing.plugin_id,
            ReplyKind::Setup,
            ReplyContext::Setup { thing_id: thing.id },
        )?;
        let reply_id = core.id;
        plugin.setup_thing(ThingSetupInfo {
            thing,
            reconfigure,
            core,
        })
        .await;
        Ok(reply_id)
    }

    /// Dispatch `post_setup_thing` to the owning plugin.
    pub async fn post_setup_thing(&self, plugin_id: PluginId, thing_id: ThingId) {
        if let Some(plugin) = self.plugin(plugin_id) {
            plugin.post_setup_thing(thing_id).await;
        }
    }

    /// Dispatch `thing_removed` to the owning plugin.
    pub async fn thing_removed(&self, plugin_id: PluginId, thing_id: ThingId) {
        if let Some(plugin) = self.plugin(plugin_id) {
            plugin.thing_removed(thing_id).await;
        }
    }

    /// Dispatch a discovery run for a class.
    ///
    /// # Errors
    ///
    /// Synchronous failures only: unserved class or a shutting-down host.
    pub async fn discover(
        &self,
        thing_class_id: ThingClassId,
        params: Vec<Param>,
    ) -> PluginResult<ReplyId> {
        let plugin_id = self
            .plugin_for_class(thing_class_id)
            .ok_or(PluginError::ClassNotServed(thing_class_id))?;
        let plugin = self
            .plugin(plugin_id)
            .ok_or(PluginError::NotFound(plugin_id))?;
        let core = self.issue(
            plugin_id,
            ReplyKind::Discovery,
            ReplyContext::Discovery { thing_class_id },
        )?;
        let reply_id = core.id;
        plugin.discover(DiscoverInfo {
            thing_class_id,
            params,
            core,
        })
        .await;
        Ok(reply_id)
    }

    /// Dispatch the opening step of a pairing flow.
    ///
    /// # Errors
    ///
    /// Synchronous failures only: unserved class or a shutting-down host.
    #[allow(clippy::too_many_arguments)]
    pub async fn start_pairing(
        &self,
        transaction_id: PairingTransactionId,
        thing_class_id: ThingClassId,
        thing_name: &str,
        params: Vec<Param>,
        setup_method: SetupMethod,
    ) -> PluginResult<ReplyId> {
        self.pairing_step(transaction_id, thing_class_id, thing_name, params, setup_method, None)
            .await
    }

    /// Dispatch the confirmation step of a pairing flow.
    ///
    /// # Errors
    ///
    /// Synchronous failures only: unserved class or a shutting-down host.
    pub async fn confirm_pairing(
        &self,
        transaction_id: PairingTransactionId,
        thing_class_id: ThingClassId,
        thing_name: &str,
        params: Vec<Param>,
        setup_method: SetupMethod,
        secret: Option<String>,
    ) -> PluginResult<ReplyId> {
        self.pairing_step(
            transaction_id,
            thing_class_id,
            thing_name,
            params,
            setup_method,
            Some(secret.unwrap_or_default()),
        )
        .await
    }

    async fn pairing_step(
        &self,
        transaction_id: PairingTransactionId,
        thing_class_id: ThingClassId,
        thing_name: &str,
        params: Vec<Param>,
        setup_method: SetupMethod,
        secret: Option<String>,
    ) -> PluginResult<ReplyId> {
        let plugin_id = self
            .plugin_for_class(thing_class_id)
            .ok_or(PluginError::ClassNotServed(thing_class_id))?;
        let plugin = self
            .plugin(plugin_id)
            .ok_or(PluginError::NotFound(plugin_id))?;
        let confirm = secret.is_some();
        let core = self.issue(
            plugin_id,
            ReplyKind::Pairing,
            ReplyContext::Pairing {
                transaction_id,
                confirm,
            },
        )?;
        let reply_id = core.id;
        let pair_info = PairInfo {
            transaction_id,
            thing_class_id,
            thing_name: thing_name.to_string(),
            params,
            setup_method,
            secret,
            core,
        };
        if confirm {
            plugin.confirm_pairing(pair_info).await;
        } else {
            plugin.start_pairing(pair_info).await;
        }
        Ok(reply_id)
    }

    /// Dispatch `execute_action` to the owning plugin.
    ///
    /// # Errors
    ///
    /// Synchronous failures only: unknown plugin or a shutting-down host.
    pub async fn execute_action(&self, thing: ThingInfo, action: Action) -> PluginResult<ReplyId> {
        let plugin = self
            .plugin(thing.plugin_id)
            .ok_or(PluginError::NotFound(thing.plugin_id))?;
        let core = self.issue(
            thing.plugin_id,
            ReplyKind::Action,
            ReplyContext::Action {
                action: action.clone(),
            },
        )?;
        let reply_id = core.id;
        plugin.execute_action(ActionInfo {
            thing,
            action,
            core,
        })
        .await;
        Ok(reply_id)
    }

    /// Dispatch `browse` to the owning plugin.
    ///
    /// # Errors
    ///
    /// Synchronous failures only: unknown plugin or a shutting-down host.
    pub async fn browse(
        &self,
        thing: ThingInfo,
        item_id: Option<String>,
    ) -> PluginResult<ReplyId> {
        let plugin = self
            .plugin(thing.plugin_id)
            .ok_or(PluginError::NotFound(thing.plugin_id))?;
        let core = self.issue(
            thing.plugin_id,
            ReplyKind::Browse,
            ReplyContext::Browse { thing_id: thing.id },
        )?;
        let reply_id = core.id;
        plugin.browse(BrowseResult {
            thing,
            item_id,
            core,
        })
        .await;
        Ok(reply_id)
    }

    /// Dispatch `execute_browser_item_action` to the owning plugin.
    ///
    /// # Errors
    ///
    /// Synchronous failures only: unknown plugin or a shutting-down host.
    pub async fn execute_browser_item_action(
        &self,
        thing: ThingInfo,
        item_id: String,
        action_type_id: hearth_types::ActionTypeId,
        params: Vec<Param>,
    ) -> PluginResult<ReplyId> {
        let plugin = self
            .plugin(thing.plugin_id)
            .ok_or(PluginError::NotFound(thing.plugin_id))?;
        let core = self.issue(
            thing.plugin_id,
            ReplyKind::BrowserAction,
            ReplyContext::BrowserAction { thing_id: thing.id },
        )?;
        let reply_id = core.id;
        plugin.execute_browser_item_action(BrowserActionInfo {
            thing,
            item_id,
            action_type_id,
            params,
            core,
        })
        .await;
        Ok(reply_id)
    }

    /// Stop accepting work and cancel every outstanding reply.
    ///
    /// Each pending reply is synthesized as [`ReplyStatus::Cancelled`] and
    /// its plugin-side cancellation token fires.
    pub fn shutdown(&self) {
        self.accepting.store(false, Ordering::SeqCst);
        let cores: Vec<_> = self.pending.iter().map(|c| Arc::clone(&c)).collect();
        info!(target: LOG, outstanding = cores.len(), "cancelling outstanding replies");
        for core in cores {
            core.synthesize(ReplyStatus::Cancelled);
        }
    }

    fn issue(
        &self,
        plugin_id: PluginId,
        kind: ReplyKind,
        context: ReplyContext,
    ) -> PluginResult<Arc<ReplyCore>> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(PluginError::ShuttingDown);
        }
        let core = Arc::new(ReplyCore::new(
            plugin_id,
            kind,
            context,
            self.upstream_tx.clone(),
        ));
        self.pending.insert(core.id, Arc::clone(&core));
        self.spawn_watchdog(Arc::clone(&core));
        Ok(core)
    }

    fn spawn_watchdog(&self, core: Arc<ReplyCore>) {
        let deadline = match core.kind {
            ReplyKind::Setup | ReplyKind::Pairing | ReplyKind::Discovery => self.timeouts.setup,
            ReplyKind::Action | ReplyKind::Browse | ReplyKind::BrowserAction => {
                self.timeouts.action
            },
        };
        let pending = Arc::clone(&self.pending);
        tokio::spawn(async move {
            tokio::select! {
                () = core.done.cancelled() => {},
                () = tokio::time::sleep(deadline) => {
                    warn!(
                        target: LOG,
                        reply = %core.id,
                        plugin = %core.plugin_id,
                        kind = ?core.kind,
                        "plugin missed its reply deadline"
                    );
                    core.synthesize(ReplyStatus::Timeout);
                },
            }
            pending.remove(&core.id);
        });
    }
}

impl Default for PluginHost {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PluginHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginHost")
            .field("plugins", &self.plugins.len())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}
