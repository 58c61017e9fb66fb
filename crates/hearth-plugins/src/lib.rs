//! hearth-plugins — the plugin contract and host of the hearth controller.
//!
//! Plugins abstract heterogeneous transports behind one data-driven
//! capability model: they declare their vendor, thing classes, and schemas
//! in metadata, implement the [`HearthPlugin`] callbacks they support, and
//! answer every non-trivial call asynchronously through the info object's
//! `finish`.
//!
//! The [`PluginHost`] owns the loaded plugins, the pending-reply table with
//! its watchdogs (30 s for setup/pairing/discovery, 45 s for actions), and
//! the singleton [`hardware`] resource hubs plugins multiplex onto.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod hardware;
pub mod host;
pub mod info;
pub mod message;
pub mod plugin;
pub mod reply;

pub use error::{PluginError, PluginResult};
pub use hardware::{HardwareManager, HardwareResource, ResourceFrame};
pub use host::{HostTimeouts, PluginHost};
pub use info::{
    ActionInfo, BrowseResult, BrowserActionInfo, DiscoverInfo, PairInfo, ThingInfo,
    ThingSetupInfo,
};
pub use message::UpstreamMessage;
pub use plugin::{HearthPlugin, PluginContext};
pub use reply::{
    BrowserItem, ReplyCompletion, ReplyContext, ReplyId, ReplyKind, ReplyPayload, ReplyStatus,
    ThingDescriptor,
};
