//! hearth-runtime — the control loop of the hearth controller.
//!
//! The [`Dispatcher`] is the single owner of the thing registry and rule
//! engine. Everything reaching the core travels over two channels — the
//! plugin host's upstream messages and the [`DispatcherHandle`] command
//! queue — and each item is processed to completion before the next, which
//! is what makes the core lock-free and its orderings total:
//!
//! 1. plugins emit events and state changes,
//! 2. the rule engine turns them into action lists,
//! 3. actions are enqueued on the plugin host (never awaited inline),
//! 4. completions route back to their originators.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod command;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod snapshot;
pub mod tick;

pub use command::CoreCommand;
pub use dispatcher::Dispatcher;
pub use error::{DispatcherError, DispatcherResult};
pub use handle::DispatcherHandle;
pub use snapshot::{RuleSnapshot, ThingSnapshot};
pub use tick::spawn_tick_source;
