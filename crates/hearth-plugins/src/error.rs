//! Plugin host error types.

use thiserror::Error;

use hearth_types::{PluginId, ThingClassId};

use crate::reply::ReplyId;

/// Errors from plugin host operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    /// No plugin with the given id is registered.
    #[error("plugin not found: {0}")]
    NotFound(PluginId),

    /// A plugin with the given id is already registered.
    #[error("plugin already registered: {0}")]
    AlreadyRegistered(PluginId),

    /// No registered plugin serves the given thing class.
    #[error("no plugin serves thing class {0}")]
    ClassNotServed(ThingClassId),

    /// `finish` was called twice on one reply.
    #[error("reply {0} already finished")]
    AlreadyFinished(ReplyId),

    /// The host is shutting down and accepts no new work.
    #[error("plugin host is shutting down")]
    ShuttingDown,

    /// Plugin initialization failed.
    #[error("plugin {plugin_id} failed to initialize: {reason}")]
    InitFailed {
        /// The failing plugin.
        plugin_id: PluginId,
        /// What went wrong.
        reason: String,
    },
}

/// Result type for plugin host operations.
pub type PluginResult<T> = Result<T, PluginError>;
