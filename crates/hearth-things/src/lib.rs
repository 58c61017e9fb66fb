//! hearth-things — the registry of configured things.
//!
//! The [`ThingRegistry`] exclusively owns every [`Thing`]: it validates
//! params against the catalogue, runs the add/pair/reconfigure/remove
//! lifecycle, applies change detection to state writes, publishes
//! notifications, and persists one grouped record per thing. Setup flows
//! asynchronously through the plugin host; completions are routed back in
//! by the dispatcher.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod registry;
pub mod thing;

pub use error::{ThingError, ThingResult};
pub use registry::{AddThingOutcome, ThingRegistry};
pub use thing::Thing;
