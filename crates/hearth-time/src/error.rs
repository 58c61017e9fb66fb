//! Validity errors for time entities.

use thiserror::Error;

use crate::repeating::RepeatingMode;

/// Why a time entity fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    /// A week day outside `1..=7`.
    #[error("week day out of range: {0}")]
    WeekDayOutOfRange(u8),

    /// A month day outside `1..=31`.
    #[error("month day out of range: {0}")]
    MonthDayOutOfRange(u8),

    /// The week/month-day lists do not match the repeating mode's table.
    #[error("repeating mode {mode:?} does not admit the given day lists")]
    DayListMismatch {
        /// The declared mode.
        mode: RepeatingMode,
    },

    /// A calendar or time-event item sets both anchors, or neither.
    #[error("exactly one of dateTime and startTime/time must be set")]
    AmbiguousAnchor,

    /// A calendar item with zero duration.
    #[error("calendar item duration must be positive")]
    ZeroDuration,

    /// A dateTime-anchored item declares a repetition other than yearly.
    #[error("dateTime items admit only yearly repetition, got {mode:?}")]
    DateTimeRepetition {
        /// The declared mode.
        mode: RepeatingMode,
    },

    /// A startTime-anchored item declares yearly repetition.
    #[error("yearly repetition requires a dateTime anchor")]
    YearlyWithoutDateTime,

    /// A time descriptor populates both the calendar and the time-event list.
    #[error("a time descriptor may populate only one of its lists")]
    MixedDescriptor,
}

/// Result type for time-entity validation.
pub type TimeResult<T> = Result<T, TimeError>;
