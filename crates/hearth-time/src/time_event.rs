//! Time-event items: instants that fire once per occurrence.
//!
//! Unlike a [`CalendarItem`](crate::CalendarItem) window, a time event is an
//! edge trigger: it fires exactly when its configured instant crosses the
//! `(last_tick, now]` interval the engine observed between two clock ticks.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use hearth_types::TimeEventItemId;

use crate::error::{TimeError, TimeResult};
use crate::repeating::{RepeatingMode, RepeatingOption};

/// An instant that fires a rule when the clock passes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEventItem {
    /// Unique id of this item.
    pub id: TimeEventItemId,
    /// Concrete anchor for one-shot and yearly events.
    #[serde(default)]
    pub date_time: Option<NaiveDateTime>,
    /// Time-of-day anchor for recurring events.
    #[serde(default)]
    pub time: Option<NaiveTime>,
    /// Repetition and day filters.
    #[serde(default)]
    pub repeating: RepeatingOption,
}

impl TimeEventItem {
    /// A recurring event at a time of day.
    #[must_use]
    pub fn at_time(time: NaiveTime) -> Self {
        Self {
            id: TimeEventItemId::new(),
            date_time: None,
            time: Some(time),
            repeating: RepeatingOption::none(),
        }
    }

    /// An event at a concrete instant.
    #[must_use]
    pub fn at(date_time: NaiveDateTime) -> Self {
        Self {
            id: TimeEventItemId::new(),
            date_time: Some(date_time),
            time: None,
            repeating: RepeatingOption::none(),
        }
    }

    /// Set the repetition.
    #[must_use]
    pub fn repeating(mut self, repeating: RepeatingOption) -> Self {
        self.repeating = repeating;
        self
    }

    /// Check structural validity.
    ///
    /// Exactly one anchor must be set; a `date_time` anchor admits only
    /// `None`/`Yearly` repetition; yearly repetition requires a `date_time`
    /// anchor.
    ///
    /// # Errors
    ///
    /// Returns a [`TimeError`] naming the violated constraint.
    pub fn validate(&self) -> TimeResult<()> {
        if self.date_time.is_some() == self.time.is_some() {
            return Err(TimeError::AmbiguousAnchor);
        }
        self.repeating.validate()?;
        if self.date_time.is_some()
            && !self.repeating.is_empty()
            && self.repeating.mode != RepeatingMode::Yearly
        {
            return Err(TimeError::DateTimeRepetition {
                mode: self.repeating.mode,
            });
        }
        if self.time.is_some() && self.repeating.mode == RepeatingMode::Yearly {
            return Err(TimeError::YearlyWithoutDateTime);
        }
        Ok(())
    }

    /// Whether the configured instant lies within `(last_tick, now]`.
    #[must_use]
    pub fn evaluate(&self, last_tick: NaiveDateTime, now: NaiveDateTime) -> bool {
        if let Some(time) = self.time {
            return match self.repeating.mode {
                // An undeclared repetition on a time of day means daily.
                RepeatingMode::None | RepeatingMode::Daily => {
                    Self::crosses_time_of_day(last_tick, now, time)
                },
                RepeatingMode::Hourly => {
                    // Only the (minute, second) components matter.
                    let begin = (last_tick.minute(), last_tick.second());
                    let instant = (time.minute(), time.second());
                    let end = (now.minute(), now.second());
                    begin < instant && instant <= end
                },
                RepeatingMode::Weekly => {
                    self.repeating.evaluate_week_day(now)
                        && Self::crosses_time_of_day(last_tick, now, time)
                },
                RepeatingMode::Monthly => {
                    self.repeating.evaluate_month_day(now)
                        && Self::crosses_time_of_day(last_tick, now, time)
                },
                // Rejected by validate(); a yearly event needs a date.
                RepeatingMode::Yearly => false,
            };
        }

        let Some(date_time) = self.date_time else {
            return false;
        };
        if self.repeating.mode == RepeatingMode::Yearly {
            // Re-anchor the stored month/day/time to the current year. A
            // Feb 29 anchor does not resolve in non-leap years and the event
            // is skipped that year.
            let Some(date) =
                NaiveDate::from_ymd_opt(now.year(), date_time.month(), date_time.day())
            else {
                return false;
            };
            let anchor = date.and_time(date_time.time());
            return last_tick < anchor && anchor <= now;
        }
        last_tick < date_time && date_time <= now
    }

    fn crosses_time_of_day(last_tick: NaiveDateTime, now: NaiveDateTime, time: NaiveTime) -> bool {
        last_tick.time() < time && time <= now.time()
    }
}
