//! hearth-time — the time engine of the hearth controller core.
//!
//! Schedule-based rules lean on two evaluators:
//!
//! - [`CalendarItem`]: a repeating or one-shot *window*; a rule in calendar
//!   mode is active while any of its windows contains the current instant.
//! - [`TimeEventItem`]: a repeating or one-shot *instant*; the rule triggers
//!   exactly when the instant crosses the interval between two observed
//!   clock ticks.
//!
//! Both carry a [`RepeatingOption`] with hourly/daily/weekly/monthly/yearly
//! modes plus day-of-week and day-of-month filters, and both are bundled
//! into a rule's [`TimeDescriptor`].
//!
//! All evaluation runs on naive wall-clock time; clock jumps are not
//! compensated beyond the `(last_tick, now]` crossing semantics.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod calendar;
pub mod descriptor;
pub mod error;
pub mod repeating;
pub mod time_event;

pub use calendar::CalendarItem;
pub use descriptor::TimeDescriptor;
pub use error::{TimeError, TimeResult};
pub use repeating::{RepeatingMode, RepeatingOption};
pub use time_event::TimeEventItem;
