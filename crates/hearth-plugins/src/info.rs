//! Info objects handed to plugins.
//!
//! Each carries the operation's inputs plus a `finish` method the plugin
//! must eventually call. Inputs are plain data: plugins never hold the
//! registry's `Thing` — the core owns it and lends a snapshot per call.

use std::sync::Arc;

use hearth_types::{
    ActionTypeId, PairingTransactionId, Param, PluginId, SetupMethod, ThingClassId, ThingId,
};

use crate::error::PluginResult;
use crate::reply::{BrowserItem, ReplyCore, ReplyId, ReplyStatus, ThingDescriptor};

/// A snapshot of a configured thing, lent to the plugin for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct ThingInfo {
    /// The thing's id.
    pub id: ThingId,
    /// Its class.
    pub thing_class_id: ThingClassId,
    /// The owning plugin.
    pub plugin_id: PluginId,
    /// Display name.
    pub name: String,
    /// Configured params.
    pub params: Vec<Param>,
    /// Configured settings.
    pub settings: Vec<Param>,
    /// Parent thing for gateway hierarchies.
    pub parent_id: Option<ThingId>,
}

macro_rules! finishable {
    ($type:ty) => {
        impl $type {
            /// The reply this info object answers.
            #[must_use]
            pub fn reply_id(&self) -> ReplyId {
                self.core.id
            }

            /// Whether the host asked the plugin to abandon the operation.
            #[must_use]
            pub fn is_cancelled(&self) -> bool {
                self.core.cancelled.is_cancelled()
            }

            /// Wait until the host asks the plugin to abandon the operation.
            pub async fn cancelled(&self) {
                self.core.cancelled.cancelled().await;
            }

            /// Complete the operation.
            ///
            /// # Errors
            ///
            /// [`crate::PluginError::AlreadyFinished`] when `finish` was
            /// already called (or the host already synthesized a
            /// completion).
            pub fn finish(
                &self,
                status: ReplyStatus,
                display_message: Option<String>,
            ) -> PluginResult<()> {
                self.core.complete(status, display_message)
            }
        }
    };
}

/// Inputs of a `setup_thing` call.
#[derive(Debug, Clone)]
pub struct ThingSetupInfo {
    /// The thing to set up.
    pub thing: ThingInfo,
    /// Whether this is the first setup or a reconfiguration.
    pub reconfigure: bool,
    pub(crate) core: Arc<ReplyCore>,
}

finishable!(ThingSetupInfo);

/// Inputs of a `discover` call.
#[derive(Debug, Clone)]
pub struct DiscoverInfo {
    /// The class to discover instances of.
    pub thing_class_id: ThingClassId,
    /// Discovery params, conforming to the class's discovery schema.
    pub params: Vec<Param>,
    pub(crate) core: Arc<ReplyCore>,
}

finishable!(DiscoverInfo);

impl DiscoverInfo {
    /// Report a found candidate.
    pub fn add_descriptor(&self, descriptor: ThingDescriptor) {
        self.core.push_descriptor(descriptor);
    }
}

/// Inputs of a `start_pairing` / `confirm_pairing` call.
#[derive(Debug, Clone)]
pub struct PairInfo {
    /// The pairing transaction this call belongs to.
    pub transaction_id: PairingTransactionId,
    /// The class being paired.
    pub thing_class_id: ThingClassId,
    /// The name the thing will get.
    pub thing_name: String,
    /// Configured params.
    pub params: Vec<Param>,
    /// The interaction style the class declares.
    pub setup_method: SetupMethod,
    /// The user-supplied secret (pin, OAuth token) on the confirm step.
    pub secret: Option<String>,
    pub(crate) core: Arc<ReplyCore>,
}

finishable!(PairInfo);

/// Inputs of an `execute_action` call.
#[derive(Debug, Clone)]
pub struct ActionInfo {
    /// The target thing.
    pub thing: ThingInfo,
    /// The action to execute.
    pub action: hearth_types::Action,
    pub(crate) core: Arc<ReplyCore>,
}

finishable!(ActionInfo);

impl ActionInfo {
    /// Shorthand for the action's type id.
    #[must_use]
    pub fn action_type_id(&self) -> ActionTypeId {
        self.action.action_type_id
    }
}

/// Inputs of a `browse` call; the plugin fills in the item list.
#[derive(Debug, Clone)]
pub struct BrowseResult {
    /// The browsed thing.
    pub thing: ThingInfo,
    /// The item to list children of; `None` for the root.
    pub item_id: Option<String>,
    pub(crate) core: Arc<ReplyCore>,
}

finishable!(BrowseResult);

impl BrowseResult {
    /// Report one item of the browsed level.
    pub fn add_item(&self, item: BrowserItem) {
        self.core.push_browser_item(item);
    }
}

/// Inputs of an `execute_browser_item_action` call.
#[derive(Debug, Clone)]
pub struct BrowserActionInfo {
    /// The target thing.
    pub thing: ThingInfo,
    /// The browser item the action applies to.
    pub item_id: String,
    /// The browser-item action to execute.
    pub action_type_id: ActionTypeId,
    /// Action params.
    pub params: Vec<Param>,
    pub(crate) core: Arc<ReplyCore>,
}

finishable!(BrowserActionInfo);
