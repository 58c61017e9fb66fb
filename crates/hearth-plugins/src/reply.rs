//! Reply plumbing for asynchronous plugin operations.
//!
//! Every non-trivial plugin call hands the plugin an info object and returns
//! immediately. The plugin is obligated to eventually call `finish` on that
//! object; the host guards each outstanding reply with a watchdog that
//! synthesizes a timeout completion if the plugin never answers.
//!
//! State machine per reply:
//!
//! ```text
//! Pending ──finish(ok)───▶ CompletedOk
//!        ──finish(err)──▶ CompletedErr
//!        ──watchdog─────▶ CompletedTimeout
//!        ──shutdown─────▶ Cancelled
//! ```
//!
//! Exactly one completion is ever emitted; a second `finish` is a detected
//! hard error.

use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::error;
use uuid::Uuid;

use hearth_types::{Action, PairingTransactionId, PluginId, ThingClassId, ThingId};

use crate::error::{PluginError, PluginResult};
use crate::message::UpstreamMessage;

const LOG: &str = "plugin_host";

/// Identifies one in-flight plugin reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplyId(Uuid);

impl ReplyId {
    /// Create a new random reply id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReplyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReplyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reply:{}", self.0.as_hyphenated())
    }
}

/// The status a plugin operation completed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReplyStatus {
    /// The operation succeeded.
    Ok,
    /// Thing setup ran and failed; the thing stays in the registry for
    /// retry.
    SetupFailed,
    /// The transport reported an error.
    HardwareFailure,
    /// A required hardware resource could not be initialized.
    HardwareNotAvailable,
    /// The plugin does not implement the capability.
    Unsupported,
    /// Synthesized by the host when the plugin missed its deadline.
    Timeout,
    /// The operation was cancelled (shutdown or explicit).
    Cancelled,
}

impl ReplyStatus {
    /// Whether this is a success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// What kind of operation a reply belongs to; selects the watchdog deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// `setup_thing`.
    Setup,
    /// `start_pairing` / `confirm_pairing`.
    Pairing,
    /// `discover`.
    Discovery,
    /// `execute_action`.
    Action,
    /// `browse`.
    Browse,
    /// `execute_browser_item_action`.
    BrowserAction,
}

/// Routing context the dispatcher needs when a completion arrives.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyContext {
    /// A thing setup run.
    Setup {
        /// The thing being set up.
        thing_id: ThingId,
    },
    /// A pairing flow step.
    Pairing {
        /// The pairing transaction.
        transaction_id: PairingTransactionId,
        /// Whether this was the confirmation step.
        confirm: bool,
    },
    /// A discovery run.
    Discovery {
        /// The class being discovered.
        thing_class_id: ThingClassId,
    },
    /// An action execution.
    Action {
        /// The executed action.
        action: Action,
    },
    /// A browse request.
    Browse {
        /// The browsed thing.
        thing_id: ThingId,
    },
    /// A browser-item action execution.
    BrowserAction {
        /// The target thing.
        thing_id: ThingId,
    },
}

/// A discovered or auto-appeared thing candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThingDescriptor {
    /// Proposed id for the thing once added.
    pub thing_id: ThingId,
    /// The class the candidate belongs to.
    pub thing_class_id: ThingClassId,
    /// Short human-readable title.
    pub title: String,
    /// Longer description (address, serial, ...).
    #[serde(default)]
    pub description: String,
    /// Params the candidate would be configured with.
    #[serde(default)]
    pub params: Vec<hearth_types::Param>,
    /// Parent thing for gateway-style hierarchies.
    #[serde(default)]
    pub parent_id: Option<ThingId>,
}

impl ThingDescriptor {
    /// Create a descriptor with a fresh proposed thing id.
    #[must_use]
    pub fn new(thing_class_id: ThingClassId, title: impl Into<String>) -> Self {
        Self {
            thing_id: ThingId::new(),
            thing_class_id,
            title: title.into(),
            description: String::new(),
            params: Vec::new(),
            parent_id: None,
        }
    }

    /// Set the configured params.
    #[must_use]
    pub fn with_params(mut self, params: Vec<hearth_types::Param>) -> Self {
        self.params = params;
        self
    }
}

/// One entry of a browsable item tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserItem {
    /// Plugin-scoped item id.
    pub id: String,
    /// Display name.
    pub display_name: String,
    /// Whether the item has children to browse into.
    #[serde(default)]
    pub browsable: bool,
    /// Whether the item can be executed (played, opened, ...).
    #[serde(default)]
    pub executable: bool,
}

/// Results a plugin accumulated on an info object before finishing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplyPayload {
    /// Candidates from a discovery run.
    pub descriptors: Vec<ThingDescriptor>,
    /// Items from a browse request.
    pub browser_items: Vec<BrowserItem>,
}

/// The terminal record of one reply, routed back to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyCompletion {
    /// Which reply finished.
    pub reply_id: ReplyId,
    /// The plugin that owned it.
    pub plugin_id: PluginId,
    /// Routing context.
    pub context: ReplyContext,
    /// How it finished.
    pub status: ReplyStatus,
    /// Optional message for the originator (pairing pin, error detail).
    pub display_message: Option<String>,
    /// Accumulated results.
    pub payload: ReplyPayload,
}

/// Shared core of every info object: the finish-once latch, the payload
/// accumulator, and the channel back to the dispatcher.
#[derive(Debug)]
pub(crate) struct ReplyCore {
    pub(crate) id: ReplyId,
    pub(crate) plugin_id: PluginId,
    pub(crate) kind: ReplyKind,
    pub(crate) context: ReplyContext,
    finished: AtomicBool,
    completion_tx: mpsc::UnboundedSender<UpstreamMessage>,
    payload: Mutex<ReplyPayload>,
    /// Flips once a completion has been emitted; stops the watchdog.
    pub(crate) done: CancellationToken,
    /// The host's request that the plugin abandon the operation.
    pub(crate) cancelled: CancellationToken,
}

impl ReplyCore {
    pub(crate) fn new(
        plugin_id: PluginId,
        kind: ReplyKind,
        context: ReplyContext,
        completion_tx: mpsc::UnboundedSender<UpstreamMessage>,
    ) -> Self {
        Self {
            id: ReplyId::new(),
            plugin_id,
            kind,
            context,
            finished: AtomicBool::new(false),
            completion_tx,
            payload: Mutex::new(ReplyPayload::default()),
            done: CancellationToken::new(),
            cancelled: CancellationToken::new(),
        }
    }

    pub(crate) fn push_descriptor(&self, descriptor: ThingDescriptor) {
        if let Ok(mut payload) = self.payload.lock() {
            payload.descriptors.push(descriptor);
        }
    }

    pub(crate) fn push_browser_item(&self, item: BrowserItem) {
        if let Ok(mut payload) = self.payload.lock() {
            payload.browser_items.push(item);
        }
    }

    /// Emit the completion exactly once.
    pub(crate) fn complete(
        &self,
        status: ReplyStatus,
        display_message: Option<String>,
    ) -> PluginResult<()> {
        if self.finished.swap(true, Ordering::SeqCst) {
            error!(target: LOG, reply = %self.id, "finish called on an already finished reply");
            return Err(PluginError::AlreadyFinished(self.id));
        }
        let payload = self
            .payload
            .lock()
            .map(|mut p| std::mem::take(&mut *p))
            .unwrap_or_default();
        // The receiver being gone means the dispatcher stopped; nothing to
        // route the completion to.
        let _ = self.completion_tx.send(UpstreamMessage::ReplyFinished(ReplyCompletion {
            reply_id: self.id,
            plugin_id: self.plugin_id,
            context: self.context.clone(),
            status,
            display_message,
            payload,
        }));
        self.done.cancel();
        Ok(())
    }

    /// Synthesize a completion from the host side (timeout or shutdown) and
    /// ask the plugin to stop.
    pub(crate) fn synthesize(&self, status: ReplyStatus) {
        self.cancelled.cancel();
        let _ = self.complete(status, None);
    }
}
