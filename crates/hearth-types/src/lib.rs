//! hearth-types — the type catalogue of the hearth controller core.
//!
//! This crate holds the immutable descriptors every other subsystem works
//! against:
//!
//! - typed 128-bit identifiers ([`ids`])
//! - the dynamic [`Value`] model with schema-directed validation ([`value`],
//!   [`param`])
//! - param/state/event/action schemas and [`ThingClass`] ([`state`],
//!   [`event`], [`action`], [`thing_class`])
//! - named capability [`interface`]s
//! - declarative plugin [`metadata`] and the [`TypeCatalogue`] built from it
//!
//! The catalogue is parsed once at plugin load time and read-only afterwards;
//! defective schemas are rejected at load so the registry, rule engine, and
//! plugin host never see them.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod action;
pub mod catalogue;
pub mod error;
pub mod event;
pub mod ids;
pub mod interface;
pub mod metadata;
pub mod param;
pub mod state;
pub mod thing_class;
pub mod value;

pub use action::{Action, ActionType, TriggeredBy};
pub use catalogue::{PluginRecord, TypeCatalogue};
pub use error::{CatalogueError, CatalogueResult, ValidationError, ValidationResult};
pub use event::{Event, EventType};
pub use ids::{
    ActionTypeId, CalendarItemId, EventTypeId, PairingTransactionId, ParamTypeId, PluginId,
    RuleId, StateEvaluatorId, StateTypeId, ThingClassId, ThingId, TimeEventItemId, VendorId,
};
pub use interface::{Interface, builtin_interfaces};
pub use metadata::PluginMetadata;
pub use param::{
    InputType, Param, ParamType, Unit, find_param_type, find_param_type_by_name, normalize_params,
    param_value, validate_params,
};
pub use state::{IoType, State, StateType, StateValueFilter};
pub use thing_class::{CreateMethod, SetupMethod, SetupStatus, ThingClass, Vendor};
pub use value::{Color, TimeOfDay, Value, ValueOperator, ValueType};
