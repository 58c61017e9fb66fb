//! Time descriptors: the time side of a rule.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::calendar::CalendarItem;
use crate::error::{TimeError, TimeResult};
use crate::time_event::TimeEventItem;

/// The time condition attached to a rule.
///
/// Either a set of calendar windows (the rule is *active* while any window
/// contains now) or a set of time events (the rule *triggers* when any event
/// fires). A descriptor may populate only one of its lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeDescriptor {
    /// Calendar windows.
    #[serde(default)]
    pub calendar_items: Vec<CalendarItem>,
    /// Time events.
    #[serde(default)]
    pub time_event_items: Vec<TimeEventItem>,
}

impl TimeDescriptor {
    /// A descriptor over calendar windows.
    #[must_use]
    pub fn calendar(calendar_items: Vec<CalendarItem>) -> Self {
        Self {
            calendar_items,
            time_event_items: Vec::new(),
        }
    }

    /// A descriptor over time events.
    #[must_use]
    pub fn time_events(time_event_items: Vec<TimeEventItem>) -> Self {
        Self {
            calendar_items: Vec::new(),
            time_event_items,
        }
    }

    /// Whether neither list is populated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calendar_items.is_empty() && self.time_event_items.is_empty()
    }

    /// Check structural validity of the descriptor and every item in it.
    ///
    /// # Errors
    ///
    /// [`TimeError::MixedDescriptor`] when both lists are populated,
    /// otherwise the first failing item's error.
    pub fn validate(&self) -> TimeResult<()> {
        if !self.calendar_items.is_empty() && !self.time_event_items.is_empty() {
            return Err(TimeError::MixedDescriptor);
        }
        for item in &self.calendar_items {
            item.validate()?;
        }
        for item in &self.time_event_items {
            item.validate()?;
        }
        Ok(())
    }

    /// Whether any calendar window contains `now`.
    ///
    /// False when the descriptor has no calendar items.
    #[must_use]
    pub fn evaluate(&self, now: NaiveDateTime) -> bool {
        self.calendar_items.iter().any(|item| item.evaluate(now))
    }

    /// Whether any time event fires within `(last_tick, now]`.
    ///
    /// False when the descriptor has no time events.
    #[must_use]
    pub fn evaluate_event(&self, last_tick: NaiveDateTime, now: NaiveDateTime) -> bool {
        self.time_event_items
            .iter()
            .any(|item| item.evaluate(last_tick, now))
    }
}
