//! Messages plugins and the host push toward the dispatcher.

use hearth_types::{Event, PluginId, StateTypeId, ThingId, Value};

use crate::reply::{ReplyCompletion, ThingDescriptor};

/// An item on the dispatcher's inbound channel originating from plugin-side
/// code.
///
/// The channel is the only way plugin tasks talk to the core: sends are
/// thread-safe and FIFO per producer.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamMessage {
    /// A thing emitted an event.
    ThingEvent(Event),

    /// A plugin observed a new state value for a thing.
    StateChange {
        /// The owning thing.
        thing_id: ThingId,
        /// The changed state.
        state_type_id: StateTypeId,
        /// The observed value.
        value: Value,
    },

    /// A plugin with auto things saw new instances appear.
    AutoThingsAppeared {
        /// The monitoring plugin.
        plugin_id: PluginId,
        /// The appeared candidates.
        descriptors: Vec<ThingDescriptor>,
    },

    /// An outstanding reply finished (plugin `finish`, watchdog timeout, or
    /// shutdown cancellation).
    ReplyFinished(ReplyCompletion),
}
