//! Dispatcher error types.

use thiserror::Error;

use hearth_plugins::PluginError;
use hearth_rules::RuleError;
use hearth_things::ThingError;

/// Errors surfaced by the dispatcher's command interface.
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// A registry operation failed.
    #[error(transparent)]
    Thing(#[from] ThingError),

    /// A rule engine operation failed.
    #[error(transparent)]
    Rule(#[from] RuleError),

    /// A plugin host operation failed synchronously.
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// An asynchronous plugin operation finished with a failure status.
    #[error("plugin operation finished with {0:?}")]
    Reply(hearth_plugins::ReplyStatus),

    /// The dispatcher stopped before answering.
    #[error("the core dispatcher is not running")]
    CoreStopped,
}

/// Result type for dispatcher commands.
pub type DispatcherResult<T> = Result<T, DispatcherError>;
