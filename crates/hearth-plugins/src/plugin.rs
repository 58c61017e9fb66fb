//! The plugin trait and the context plugins talk back through.

use async_trait::async_trait;
use tokio::sync::mpsc;

use hearth_types::{
    Event, Param, PluginId, PluginMetadata, StateTypeId, ThingId, Value,
};

use crate::error::PluginResult;
use crate::hardware::{HardwareManager, HardwareResource};
use crate::info::{
    ActionInfo, BrowseResult, BrowserActionInfo, DiscoverInfo, PairInfo, ThingSetupInfo,
};
use crate::message::UpstreamMessage;
use crate::reply::{ReplyStatus, ThingDescriptor};

use std::sync::Arc;

/// The channel and resources a plugin receives at `init`.
///
/// Everything a plugin tells the core flows through here; both the message
/// sends and `finish` calls on info objects are thread-safe and FIFO per
/// producer, so plugins may freely run their I/O on their own tasks.
#[derive(Debug, Clone)]
pub struct PluginContext {
    plugin_id: PluginId,
    config: Vec<Param>,
    upstream: mpsc::UnboundedSender<UpstreamMessage>,
    hardware: Arc<HardwareManager>,
}

impl PluginContext {
    pub(crate) fn new(
        plugin_id: PluginId,
        config: Vec<Param>,
        upstream: mpsc::UnboundedSender<UpstreamMessage>,
        hardware: Arc<HardwareManager>,
    ) -> Self {
        Self {
            plugin_id,
            config,
            upstream,
            hardware,
        }
    }

    /// The plugin this context belongs to.
    #[must_use]
    pub fn plugin_id(&self) -> PluginId {
        self.plugin_id
    }

    /// The plugin-global configuration, validated against the metadata
    /// schema.
    #[must_use]
    pub fn config(&self) -> &[Param] {
        &self.config
    }

    /// The shared hardware resources.
    #[must_use]
    pub fn hardware(&self) -> &HardwareManager {
        &self.hardware
    }

    /// Emit an event into the core.
    pub fn emit_event(&self, event: Event) {
        let _ = self.upstream.send(UpstreamMessage::ThingEvent(event));
    }

    /// Report a new state value observed on the transport.
    pub fn set_state_value(&self, thing_id: ThingId, state_type_id: StateTypeId, value: Value) {
        let _ = self.upstream.send(UpstreamMessage::StateChange {
            thing_id,
            state_type_id,
            value,
        });
    }

    /// Announce auto things that appeared on the transport.
    pub fn auto_things_appeared(&self, descriptors: Vec<ThingDescriptor>) {
        let _ = self.upstream.send(UpstreamMessage::AutoThingsAppeared {
            plugin_id: self.plugin_id,
            descriptors,
        });
    }
}

/// A device plugin.
///
/// The host invokes these callbacks on the core task; a plugin doing
/// blocking I/O spawns its own tasks and answers through the info object's
/// `finish`. Every capability not implemented falls back to a default that
/// finishes with [`ReplyStatus::Unsupported`].
#[async_trait]
pub trait HearthPlugin: Send + Sync {
    /// The declarative metadata this plugin was loaded from.
    fn metadata(&self) -> &PluginMetadata;

    /// Hardware resources this plugin multiplexes onto.
    fn required_resources(&self) -> &[HardwareResource] {
        &[]
    }

    /// One-time initialization with the plugin's configuration.
    ///
    /// # Errors
    ///
    /// An error fails the plugin's registration.
    async fn init(&self, context: PluginContext) -> PluginResult<()> {
        let _ = context;
        Ok(())
    }

    /// Begin watching the transport for auto things.
    async fn start_monitoring_auto_things(&self) {}

    /// Run a discovery for candidates of a class.
    async fn discover(&self, info: DiscoverInfo) {
        let _ = info.finish(ReplyStatus::Unsupported, None);
    }

    /// Begin a pairing flow.
    async fn start_pairing(&self, info: PairInfo) {
        let _ = info.finish(ReplyStatus::Unsupported, None);
    }

    /// Confirm a pairing flow with the user's secret.
    async fn confirm_pairing(&self, info: PairInfo) {
        let _ = info.finish(ReplyStatus::Unsupported, None);
    }

    /// Set up a thing (first setup and reconfiguration).
    ///
    /// The default accepts the thing as-is.
    async fn setup_thing(&self, info: ThingSetupInfo) {
        let _ = info.finish(ReplyStatus::Ok, None);
    }

    /// Called once after a thing's setup completed successfully.
    async fn post_setup_thing(&self, thing_id: ThingId) {
        let _ = thing_id;
    }

    /// Execute an action on a thing.
    async fn execute_action(&self, info: ActionInfo) {
        let _ = info.finish(ReplyStatus::Unsupported, None);
    }

    /// A thing of this plugin was removed from the registry.
    async fn thing_removed(&self, thing_id: ThingId) {
        let _ = thing_id;
    }

    /// List one level of a thing's browsable item tree.
    async fn browse(&self, result: BrowseResult) {
        let _ = result.finish(ReplyStatus::Unsupported, None);
    }

    /// Execute an action on a browser item.
    async fn execute_browser_item_action(&self, info: BrowserActionInfo) {
        let _ = info.finish(ReplyStatus::Unsupported, None);
    }
}

impl std::fmt::Debug for dyn HearthPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HearthPlugin")
            .field("id", &self.metadata().id)
            .field("name", &self.metadata().name)
            .finish_non_exhaustive()
    }
}
