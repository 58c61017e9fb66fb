//! hearth-events — typed notification bus for the hearth controller core.
//!
//! The registry and rule engine publish [`Notification`]s onto a
//! [`NotificationBus`]; the RPC boundary and tests subscribe. The bus is a
//! thin broadcast channel: publishers never block, slow subscribers lag and
//! skip rather than back-pressure the core.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod bus;
mod notification;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, NotificationBus, NotificationReceiver};
pub use notification::Notification;
